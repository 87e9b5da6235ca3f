use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::features::DistanceSpace;
use crate::fixation::GazePolicy;
use crate::landmarks::LandmarkScheme;
use crate::rate::RatePolicy;

/// Default EAR below which the eyes count as closed.
pub const DEFAULT_EAR_THRESHOLD: f32 = 0.25;
/// Default gaze offset change tolerated within one fixation run.
pub const DEFAULT_STABILITY_DELTA: f32 = 0.05;
/// Blink rates at or above this are treated as detection noise.
pub const DEFAULT_STUDYING_RATE_CAP: f64 = 60.0;
/// Frame rate assumed when the caller supplies none or an unusable one.
pub const DEFAULT_FPS: f64 = 10.0;

/// Tunable heuristics for a [`MetricsEngine`](crate::MetricsEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Blink sensitivity.
    pub ear_threshold: f32,
    /// Gaze jitter tolerance between consecutive frames.
    pub stability_delta: f32,
    /// Maximum plausible blink rate for the studying classification.
    pub studying_rate_cap: f64,
    /// Rate aggregation horizon in seconds.
    pub trailing_window_secs: f64,
    pub default_fps: f64,
    pub gaze_policy: GazePolicy,
    pub rate_policy: RatePolicy,
    pub distance_space: DistanceSpace,
    pub scheme: LandmarkScheme,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ear_threshold: DEFAULT_EAR_THRESHOLD,
            stability_delta: DEFAULT_STABILITY_DELTA,
            studying_rate_cap: DEFAULT_STUDYING_RATE_CAP,
            trailing_window_secs: 60.0,
            default_fps: DEFAULT_FPS,
            gaze_policy: GazePolicy::default(),
            rate_policy: RatePolicy::default(),
            distance_space: DistanceSpace::default(),
            scheme: LandmarkScheme::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("ear_threshold", self.ear_threshold as f64)?;
        positive("stability_delta", self.stability_delta as f64)?;
        positive("studying_rate_cap", self.studying_rate_cap)?;
        positive("trailing_window_secs", self.trailing_window_secs)?;
        positive("default_fps", self.default_fps)?;
        if Duration::try_from_secs_f64(self.trailing_window_secs).is_err() {
            return Err(ConfigError::OutOfRange {
                field: "trailing_window_secs",
                value: self.trailing_window_secs,
            });
        }

        for eye in [&self.scheme.left_eye, &self.scheme.right_eye] {
            for (i, idx) in eye.iter().enumerate() {
                if eye[i + 1..].contains(idx) {
                    return Err(ConfigError::DuplicateIndex(*idx));
                }
            }
        }
        Ok(())
    }

    pub fn trailing_window(&self) -> Duration {
        Duration::from_secs_f64(self.trailing_window_secs)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotPositive { field, value })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.trailing_window(), Duration::from_secs(60));
    }

    #[test]
    fn test_rejects_non_positive_values() {
        let config = EngineConfig {
            ear_threshold: 0.0,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "ear_threshold",
                value: 0.0
            })
        );

        let config = EngineConfig {
            trailing_window_secs: f64::NAN,
            ..EngineConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NotPositive {
                field: "trailing_window_secs",
                ..
            })
        ));
    }

    #[test]
    fn test_rejects_window_too_long_for_duration() {
        let config = EngineConfig {
            trailing_window_secs: 1e20,
            ..EngineConfig::default()
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "trailing_window_secs",
                value: 1e20
            })
        );
        assert!(crate::MetricsEngine::new(config).is_err());
    }

    #[test]
    fn test_rejects_duplicate_eye_index() {
        let mut config = EngineConfig::default();
        config.scheme.right_eye = [1, 2, 3, 4, 5, 1];
        assert_eq!(config.validate(), Err(ConfigError::DuplicateIndex(1)));
    }

    #[test]
    fn test_partial_deserialize_keeps_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"ear_threshold": 0.29, "gaze_policy": "face_streak", "rate_policy": "lifetime_average"}"#,
        )
        .unwrap();
        assert_eq!(config.ear_threshold, 0.29);
        assert_eq!(config.gaze_policy, GazePolicy::FaceStreak);
        assert_eq!(config.rate_policy, RatePolicy::LifetimeAverage);
        assert_eq!(config.stability_delta, DEFAULT_STABILITY_DELTA);
        assert_eq!(config.scheme, LandmarkScheme::default());
    }
}
