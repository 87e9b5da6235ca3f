//! Blink edge detection over the eye aspect ratio signal.

/// Whether the eyes are currently considered closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EyeState {
    #[default]
    Open,
    Closed,
}

/// Two-state edge detector: a blink is counted once per closed-then-reopened
/// cycle, on the reopen edge.
///
/// Frames without a detected face must simply not be fed to [`update`];
/// the state is then held unchanged across the gap.
///
/// [`update`]: BlinkDetector::update
#[derive(Debug, Clone)]
pub struct BlinkDetector {
    threshold: f32,
    state: EyeState,
    total: u64,
}

impl BlinkDetector {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            state: EyeState::Open,
            total: 0,
        }
    }

    /// Feed one averaged EAR sample. Returns `true` when this sample completes
    /// a blink (CLOSED -> OPEN).
    pub fn update(&mut self, ear: f32) -> bool {
        match self.state {
            EyeState::Open if ear < self.threshold => {
                self.state = EyeState::Closed;
                false
            }
            EyeState::Closed if ear >= self.threshold => {
                self.state = EyeState::Open;
                self.total += 1;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> EyeState {
        self.state
    }

    /// Blinks counted since construction.
    pub fn total_blinks(&self) -> u64 {
        self.total
    }
}
