use anyhow::{Context, Result};
use blinkgaze_core::{FramePipeline, MetricsEngine};
use blinkgaze_models::FaceMesh;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

mod config;
mod engine;
mod frame;
mod transport;

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the record stream; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("blinkgazed starting");

    let config = config::Config::from_env()?;
    tracing::info!(
        model = %config.model_path.display(),
        fps = config.fps,
        max_line_bytes = config.max_line_bytes,
        ear_threshold = config.engine.ear_threshold,
        stability_delta = config.engine.stability_delta,
        gaze_policy = ?config.engine.gaze_policy,
        rate_policy = ?config.engine.rate_policy,
        "configuration loaded"
    );

    if let Some(expected) = &config.model_sha256 {
        blinkgaze_models::verify_file(&config.model_path, expected)?;
        tracing::info!("model checksum verified");
    }

    let mesh = FaceMesh::load(&config.model_path, config.face_score_threshold)
        .context("run `blinkgaze setup` to download the face landmark model")?;
    let metrics = MetricsEngine::new(config.engine.clone())?;
    let handle = engine::spawn_engine(FramePipeline::new(mesh, metrics), config.queue_depth)?;

    tracing::info!("blinkgazed ready, reading frames from stdin");

    let stats = transport::serve(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        &handle,
        config.fps,
        config.max_line_bytes,
    )
    .await?;

    tracing::info!(
        lines = stats.lines,
        errors = stats.errors,
        "end of input, blinkgazed shutting down"
    );
    Ok(())
}
