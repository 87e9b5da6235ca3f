use std::time::Instant;

use crate::blink::{BlinkDetector, EyeState};
use crate::config::EngineConfig;
use crate::error::{ConfigError, MetricsError};
use crate::features;
use crate::fixation::{frames_to_secs, GazeFixation, GazePolicy};
use crate::landmarks::LandmarkSet;
use crate::rate::{lifetime_rate, BlinkRateWindow, RatePolicy};
use crate::record::MetricsRecord;

/// Owns all per-subject temporal state: blink edge detector, blink event
/// window, gaze fixation run and face detection streak.
///
/// One engine tracks one subject. It performs no locking; a host that shares
/// an engine between threads must serialize calls to [`observe`].
///
/// [`observe`]: MetricsEngine::observe
#[derive(Debug)]
pub struct MetricsEngine {
    config: EngineConfig,
    blink: BlinkDetector,
    window: BlinkRateWindow,
    fixation: GazeFixation,
    face_streak: u32,
    started: Instant,
    frames: u64,
}

impl MetricsEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        Self::with_start(config, Instant::now())
    }

    /// Construct with an explicit start instant, the origin for the
    /// lifetime-average rate policy.
    pub fn with_start(config: EngineConfig, started: Instant) -> Result<Self, ConfigError> {
        config.validate()?;
        tracing::debug!(
            ear_threshold = config.ear_threshold,
            stability_delta = config.stability_delta,
            window_secs = config.trailing_window_secs,
            gaze_policy = ?config.gaze_policy,
            rate_policy = ?config.rate_policy,
            "metrics engine created"
        );
        Ok(Self {
            blink: BlinkDetector::new(config.ear_threshold),
            window: BlinkRateWindow::new(config.trailing_window()),
            fixation: GazeFixation::new(config.stability_delta),
            face_streak: 0,
            started,
            frames: 0,
            config,
        })
    }

    /// Advance the engine by one frame.
    ///
    /// `detection` is the landmark set for the frame, or `None` when no face
    /// was found. `width`/`height` are the frame's pixel dimensions and
    /// `now` must come from a monotonic clock.
    ///
    /// On error no state is modified.
    pub fn observe(
        &mut self,
        detection: Option<&LandmarkSet>,
        width: u32,
        height: u32,
        fps: f64,
        now: Instant,
    ) -> Result<MetricsRecord, MetricsError> {
        let fps = self.effective_fps(fps);

        let Some(landmarks) = detection else {
            self.frames += 1;
            self.face_streak = 0;
            self.fixation.reset();
            let blink_rate = self.blink_rate(now);
            tracing::debug!(blink_rate, "no face detected");
            return Ok(MetricsRecord {
                gaze_duration: 0.0,
                blink_rate,
                face_detected: false,
                studying: false,
            });
        };

        let features = features::extract(
            landmarks,
            width,
            height,
            &self.config.scheme,
            self.config.distance_space,
        )?;

        self.frames += 1;
        self.face_streak = self.face_streak.saturating_add(1);

        if self.blink.update(features.ear) {
            self.window.record(now);
            tracing::debug!(
                ear = features.ear,
                total = self.blink.total_blinks(),
                "blink completed"
            );
        }

        match features.gaze_offset {
            Some(offset) => {
                self.fixation.update(offset);
            }
            None => tracing::debug!("gaze offset undefined for frame"),
        }

        let blink_rate = self.blink_rate(now);
        let fixed_frames = match self.config.gaze_policy {
            GazePolicy::StabilityRun => self.fixation.run(),
            GazePolicy::FaceStreak => self.face_streak,
        };
        let gaze_duration = frames_to_secs(fixed_frames, fps);
        let studying = (blink_rate as f64) < self.config.studying_rate_cap;

        tracing::debug!(
            ear = features.ear,
            gaze_offset = ?features.gaze_offset,
            blink_rate,
            gaze_duration,
            studying,
            "frame observed"
        );

        Ok(MetricsRecord {
            gaze_duration,
            blink_rate,
            face_detected: true,
            studying,
        })
    }

    fn effective_fps(&self, fps: f64) -> f64 {
        if fps.is_finite() && fps > 0.0 {
            fps
        } else {
            tracing::warn!(
                fps,
                fallback = self.config.default_fps,
                "unusable frame rate, using fallback"
            );
            self.config.default_fps
        }
    }

    fn blink_rate(&mut self, now: Instant) -> u32 {
        // Always prune so the window stays bounded under either policy.
        let windowed = self.window.rate(now);
        match self.config.rate_policy {
            RatePolicy::TrailingWindow => windowed,
            RatePolicy::LifetimeAverage => {
                lifetime_rate(self.blink.total_blinks(), self.started, now)
            }
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn eye_state(&self) -> EyeState {
        self.blink.state()
    }

    pub fn total_blinks(&self) -> u64 {
        self.blink.total_blinks()
    }

    pub fn fixation_run(&self) -> u32 {
        self.fixation.run()
    }

    pub fn face_streak(&self) -> u32 {
        self.face_streak
    }

    /// Frames successfully observed, with or without a face.
    pub fn frames_observed(&self) -> u64 {
        self.frames
    }
}
