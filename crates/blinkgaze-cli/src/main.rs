use std::fs;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use blinkgaze_core::{EngineConfig, FramePipeline, MetricsEngine};
use blinkgaze_models::{FaceMesh, Sha256Hex};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod analyze;
mod replay;
mod setup;

#[derive(Parser)]
#[command(name = "blinkgaze", version, about = "Blink rate and gaze fixation metrics")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download the face landmark model
    Setup {
        /// Where to fetch the ONNX model from
        #[arg(long)]
        url: String,
        /// Expected SHA-256 of the download
        #[arg(long)]
        sha256: Option<Sha256Hex>,
        #[arg(long)]
        model_dir: Option<PathBuf>,
    },
    /// Hash a model file and check that it loads
    CheckModel {
        #[arg(long)]
        path: Option<PathBuf>,
        #[arg(long)]
        sha256: Option<Sha256Hex>,
    },
    /// Replay a JSON-lines landmark recording (`-` for stdin)
    Replay {
        file: PathBuf,
        #[arg(long, default_value_t = blinkgaze_core::config::DEFAULT_FPS)]
        fps: f64,
        /// TOML file with engine settings
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run image files through landmark detection and the metrics engine
    Analyze {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        model: Option<PathBuf>,
        #[arg(long, default_value_t = blinkgaze_core::config::DEFAULT_FPS)]
        fps: f64,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = blinkgaze_models::DEFAULT_SCORE_THRESHOLD)]
        score_threshold: f32,
    },
}

fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    let config = match path {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file {}", path.display()))?;
            toml::from_str::<EngineConfig>(&text)
                .with_context(|| format!("invalid config file {}", path.display()))?
        }
        None => EngineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn check_model(path: Option<PathBuf>, sha256: Option<Sha256Hex>) -> Result<()> {
    let path = path.unwrap_or_else(blinkgaze_models::default_model_path);
    let digest = blinkgaze_models::sha256_file(&path)?;
    println!("{}  {}", digest, path.display());

    if let Some(expected) = sha256 {
        blinkgaze_models::verify_file(&path, &expected)?;
        println!("checksum ok");
    }

    FaceMesh::load(&path, blinkgaze_models::DEFAULT_SCORE_THRESHOLD)?;
    println!("model loads");
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Commands::Setup {
            url,
            sha256,
            model_dir,
        } => setup::run(setup::SetupArgs {
            url,
            sha256,
            model_dir,
        })?,
        Commands::CheckModel { path, sha256 } => check_model(path, sha256)?,
        Commands::Replay { file, fps, config } => {
            let start = Instant::now();
            let mut engine = MetricsEngine::with_start(load_engine_config(config.as_deref())?, start)?;
            let reader: Box<dyn BufRead> = if file.as_os_str() == "-" {
                Box::new(io::stdin().lock())
            } else {
                let f = fs::File::open(&file)
                    .with_context(|| format!("failed to open {}", file.display()))?;
                Box::new(BufReader::new(f))
            };
            let stats = replay::replay(reader, io::stdout().lock(), &mut engine, fps, start)?;
            tracing::info!(
                frames = stats.frames,
                errors = stats.errors,
                blinks = engine.total_blinks(),
                "replay finished"
            );
        }
        Commands::Analyze {
            images,
            model,
            fps,
            config,
            score_threshold,
        } => {
            let start = Instant::now();
            let engine = MetricsEngine::with_start(load_engine_config(config.as_deref())?, start)?;
            let model = model.unwrap_or_else(blinkgaze_models::default_model_path);
            let mesh = FaceMesh::load(&model, score_threshold)
                .context("run `blinkgaze setup` to download the face landmark model")?;
            let mut pipeline = FramePipeline::new(mesh, engine);
            let stats = analyze::analyze(&images, &mut pipeline, fps, start, io::stdout().lock())?;
            tracing::info!(frames = stats.frames, errors = stats.errors, "analysis finished");
        }
    }
    Ok(())
}
