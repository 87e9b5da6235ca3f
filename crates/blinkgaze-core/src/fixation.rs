//! Gaze fixation tracking.
//!
//! A fixation run counts consecutive frames whose gaze offset ratio moved by
//! less than a stability delta since the previous frame. The run length is
//! converted to seconds with a caller-supplied frame rate; nothing here
//! measures time.

use serde::{Deserialize, Serialize};

/// What the engine reports as gaze duration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GazePolicy {
    /// Consecutive frames with a stable gaze offset, divided by fps.
    #[default]
    StabilityRun,
    /// Consecutive frames with a detected face, divided by fps. Ignores
    /// where the subject is looking.
    FaceStreak,
}

#[derive(Debug, Clone)]
pub struct GazeFixation {
    delta: f32,
    previous: Option<f32>,
    run: u32,
}

impl GazeFixation {
    pub fn new(delta: f32) -> Self {
        Self {
            delta,
            previous: None,
            run: 0,
        }
    }

    /// Feed a defined gaze offset and return the updated run length.
    ///
    /// The first value after construction or [`reset`](Self::reset) only
    /// establishes a baseline.
    pub fn update(&mut self, offset: f32) -> u32 {
        if let Some(previous) = self.previous {
            if (offset - previous).abs() < self.delta {
                self.run = self.run.saturating_add(1);
            } else {
                self.run = 0;
            }
        }
        self.previous = Some(offset);
        self.run
    }

    /// Drop the run and the baseline. Used when the face disappears.
    pub fn reset(&mut self) {
        self.run = 0;
        self.previous = None;
    }

    pub fn run(&self) -> u32 {
        self.run
    }

    pub fn previous(&self) -> Option<f32> {
        self.previous
    }
}

/// Frames to seconds. `fps` must already be validated as positive.
pub fn frames_to_secs(frames: u32, fps: f64) -> f64 {
    frames as f64 / fps
}
