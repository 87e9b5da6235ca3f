//! Streaming blink-rate and gaze-fixation metrics.
//!
//! A [`FramePipeline`] takes one frame at a time, asks a [`LandmarkSource`]
//! for facial landmarks, and advances a [`MetricsEngine`] that keeps the
//! temporal state: blink edge detection, a trailing window of blink events
//! and the current gaze fixation run. Each frame yields a [`MetricsRecord`].

pub mod blink;
pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod fixation;
pub mod landmarks;
pub mod pipeline;
pub mod rate;
pub mod record;

pub use blink::{BlinkDetector, EyeState};
pub use config::EngineConfig;
pub use engine::MetricsEngine;
pub use error::{ConfigError, MetricsError};
pub use features::{DistanceSpace, FrameFeatures};
pub use fixation::{GazeFixation, GazePolicy};
pub use landmarks::{Frame, LandmarkScheme, LandmarkSet, LandmarkSource, Point};
pub use pipeline::FramePipeline;
pub use rate::{BlinkRateWindow, RatePolicy};
pub use record::MetricsRecord;
