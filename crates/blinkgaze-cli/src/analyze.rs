//! `blinkgaze analyze`: run still images through the full pipeline as if
//! they were consecutive video frames.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use blinkgaze_core::{Frame, FramePipeline, LandmarkSource, MetricsRecord};

use crate::replay::{emit, ReplayStats};

fn load_frame(path: &Path) -> Result<Frame> {
    let rgb = image::open(path)
        .with_context(|| format!("invalid image {}", path.display()))?
        .into_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::from_rgb8(width, height, rgb.into_raw())?)
}

fn analyze_one<S: LandmarkSource>(
    path: &Path,
    secs: f64,
    pipeline: &mut FramePipeline<S>,
    fps: f64,
    start: Instant,
) -> Result<MetricsRecord, String> {
    let at = Duration::try_from_secs_f64(secs)
        .ok()
        .and_then(|offset| start.checked_add(offset))
        .ok_or_else(|| format!("frame time {secs}s out of range"))?;
    let frame = load_frame(path).map_err(|e| format!("{e:#}"))?;
    pipeline.process_at(&frame, fps, at).map_err(|e| e.to_string())
}

/// Process `images` in order, spacing frames `1 / fps` apart from `start`.
pub fn analyze<S: LandmarkSource, W: Write>(
    images: &[PathBuf],
    pipeline: &mut FramePipeline<S>,
    fps: f64,
    start: Instant,
    mut writer: W,
) -> Result<ReplayStats> {
    let spacing = if fps.is_finite() && fps > 0.0 {
        fps
    } else {
        pipeline.engine().config().default_fps
    };
    let mut stats = ReplayStats::default();

    for (index, path) in images.iter().enumerate() {
        stats.frames += 1;
        let result = analyze_one(path, index as f64 / spacing, pipeline, fps, start);
        if let Err(message) = &result {
            stats.errors += 1;
            tracing::warn!(path = %path.display(), error = %message, "image rejected");
        }
        emit(&mut writer, result)?;
    }

    Ok(stats)
}
