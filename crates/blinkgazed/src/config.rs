use std::path::PathBuf;

use anyhow::{Context, Result};
use blinkgaze_core::EngineConfig;
use blinkgaze_models::Sha256Hex;
use serde::de::DeserializeOwned;

/// Sidecar configuration, loaded from environment variables.
///
/// Engine heuristics start from the TOML file named by `BLINKGAZE_CONFIG`
/// (if any) and are then overridden field by field by `BLINKGAZE_*`
/// variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Face landmark ONNX model.
    pub model_path: PathBuf,
    /// Expected SHA-256 of the model; verified at startup when set.
    pub model_sha256: Option<Sha256Hex>,
    /// Minimum face presence probability from the landmark model.
    pub face_score_threshold: f32,
    /// Frame rate the producer is sending at.
    pub fps: f64,
    /// Frames that may wait for the engine thread before reads stall.
    pub queue_depth: usize,
    /// Longest accepted input line in bytes.
    pub max_line_bytes: usize,
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration from `BLINKGAZE_*` environment variables with defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut engine = match lookup("BLINKGAZE_CONFIG") {
            Some(path) => {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("failed to read config file {path}"))?;
                toml::from_str::<EngineConfig>(&text)
                    .with_context(|| format!("invalid config file {path}"))?
            }
            None => EngineConfig::default(),
        };

        if let Some(v) = parsed(&lookup, "BLINKGAZE_EAR_THRESHOLD") {
            engine.ear_threshold = v;
        }
        if let Some(v) = parsed(&lookup, "BLINKGAZE_STABILITY_DELTA") {
            engine.stability_delta = v;
        }
        if let Some(v) = parsed(&lookup, "BLINKGAZE_STUDYING_RATE_CAP") {
            engine.studying_rate_cap = v;
        }
        if let Some(v) = parsed(&lookup, "BLINKGAZE_WINDOW_SECS") {
            engine.trailing_window_secs = v;
        }
        if let Some(v) = policy(&lookup, "BLINKGAZE_GAZE_POLICY")? {
            engine.gaze_policy = v;
        }
        if let Some(v) = policy(&lookup, "BLINKGAZE_RATE_POLICY")? {
            engine.rate_policy = v;
        }
        engine.validate().context("invalid engine configuration")?;

        let model_sha256 = lookup("BLINKGAZE_MODEL_SHA256")
            .filter(|v| !v.trim().is_empty())
            .map(|v| v.parse::<Sha256Hex>())
            .transpose()
            .context("BLINKGAZE_MODEL_SHA256")?;

        let fps = match parsed::<f64>(&lookup, "BLINKGAZE_FPS") {
            Some(v) if v.is_finite() && v > 0.0 => v,
            Some(v) => {
                tracing::warn!(
                    value = v,
                    default = engine.default_fps,
                    "BLINKGAZE_FPS must be positive, using default"
                );
                engine.default_fps
            }
            None => engine.default_fps,
        };

        let model_path = lookup("BLINKGAZE_MODEL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(blinkgaze_models::default_model_path);

        Ok(Self {
            model_path,
            model_sha256,
            face_score_threshold: parsed(&lookup, "BLINKGAZE_FACE_SCORE_THRESHOLD")
                .unwrap_or(blinkgaze_models::DEFAULT_SCORE_THRESHOLD),
            fps,
            queue_depth: parsed(&lookup, "BLINKGAZE_QUEUE_DEPTH")
                .unwrap_or(4usize)
                .max(1),
            max_line_bytes: parsed(&lookup, "BLINKGAZE_MAX_LINE_BYTES")
                .unwrap_or(crate::transport::DEFAULT_MAX_LINE_BYTES)
                .max(1),
            engine,
        })
    }
}

/// Parse a numeric variable, ignoring values that do not parse.
fn parsed<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

/// Parse a snake_case enum variable such as `face_streak`.
fn policy<T: DeserializeOwned>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    let value = serde_json::Value::String(raw.trim().to_ascii_lowercase());
    serde_json::from_value(value)
        .map(Some)
        .with_context(|| format!("{key}: unknown value {raw:?}"))
}
