//! `blinkgaze replay`: feed a recorded landmark stream through the engine.
//!
//! One JSON object per line:
//!
//! ```text
//! {"landmarks": [[0.31, 0.42], ...], "t": 12.5}
//! {"landmarks": null}
//! ```
//!
//! `landmarks: null` (or a missing field) is a frame without a face. `t` is
//! seconds since the start of the recording and defaults to `index / fps`.
//! Points may be written as `[x, y]` or `{"x": .., "y": ..}`.

use std::io::{BufRead, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use blinkgaze_core::{LandmarkSet, MetricsEngine, MetricsRecord, Point};
use serde::{Deserialize, Serialize};

/// Frame size assumed when a line does not carry one. Only pixel-space
/// distances depend on it.
const DEFAULT_WIDTH: u32 = 640;
const DEFAULT_HEIGHT: u32 = 480;

#[derive(Deserialize)]
struct ReplayLine {
    #[serde(default)]
    landmarks: Option<Vec<Point>>,
    #[serde(default)]
    t: Option<f64>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
}

#[derive(Serialize)]
struct ErrorRecord<'a> {
    error: &'a str,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplayStats {
    pub frames: u64,
    pub errors: u64,
}

/// Write one output line: the record, or `{"error": ...}`.
pub(crate) fn emit<W: Write>(writer: &mut W, result: Result<MetricsRecord, String>) -> Result<()> {
    let line = match result {
        Ok(record) => serde_json::to_string(&record)?,
        Err(message) => serde_json::to_string(&ErrorRecord { error: &message })?,
    };
    writeln!(writer, "{line}")?;
    writer.flush()?;
    Ok(())
}

/// Replay every line of `reader`, writing one record per non-blank line.
pub fn replay<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    engine: &mut MetricsEngine,
    fps: f64,
    start: Instant,
) -> Result<ReplayStats> {
    let spacing = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        engine.config().default_fps
    };
    let mut stats = ReplayStats::default();

    for (lineno, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", lineno + 1))?;
        if line.trim().is_empty() {
            continue;
        }

        let index = stats.frames;
        stats.frames += 1;
        let result = step(&line, index, engine, fps, spacing, start);
        if let Err(message) = &result {
            stats.errors += 1;
            tracing::warn!(line = lineno + 1, error = %message, "replay line rejected");
        }
        emit(&mut writer, result)?;
    }

    Ok(stats)
}

fn step(
    line: &str,
    index: u64,
    engine: &mut MetricsEngine,
    fps: f64,
    spacing: f64,
    start: Instant,
) -> Result<MetricsRecord, String> {
    let parsed: ReplayLine =
        serde_json::from_str(line).map_err(|e| format!("invalid replay line: {e}"))?;

    let secs = parsed.t.unwrap_or(index as f64 / spacing);
    let at = Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or_else(|| format!("invalid timestamp {secs}"))?;
    let landmarks = parsed.landmarks.map(LandmarkSet::new);

    engine
        .observe(
            landmarks.as_ref(),
            parsed.width.unwrap_or(DEFAULT_WIDTH),
            parsed.height.unwrap_or(DEFAULT_HEIGHT),
            fps,
            at,
        )
        .map_err(|e| e.to_string())
}
