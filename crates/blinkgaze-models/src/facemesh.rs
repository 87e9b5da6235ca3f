//! Face-mesh landmark source backed by ONNX Runtime.
//!
//! Expects a MediaPipe-style face landmark model: one NHWC `[1, 192, 192, 3]`
//! float input in `[0, 1]`, a 468×3 landmark output in input-pixel
//! coordinates and a single-value face presence logit. The whole frame is
//! resized to the model input; there is no separate face detection stage, so
//! the subject is expected to fill a reasonable part of the frame.

use std::path::{Path, PathBuf};

use blinkgaze_core::{Frame, LandmarkSet, LandmarkSource, MetricsError, Point};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use ort::session::Session;
use ort::value::Tensor;
use thiserror::Error;

/// Model input edge length in pixels.
pub const INPUT_SIZE: u32 = 192;
/// Points in the face-mesh topology.
pub const MESH_POINTS: usize = 468;
/// Default minimum face presence probability.
pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.5;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("failed to load model {path}: {message}")]
    Load { path: PathBuf, message: String },
    #[error("inference failed: {0}")]
    Inference(String),
    #[error("unexpected model output: {0}")]
    Output(String),
    #[error("frame buffer does not match {width}x{height} RGB8")]
    InvalidFrame { width: u32, height: u32 },
}

pub struct FaceMesh {
    session: Session,
    score_threshold: f32,
}

impl FaceMesh {
    /// Load the model from `model_path`.
    pub fn load<P: AsRef<Path>>(model_path: P, score_threshold: f32) -> Result<Self, ModelError> {
        let path = model_path.as_ref();
        let load_err = |message: String| ModelError::Load {
            path: path.to_path_buf(),
            message,
        };

        let session = Session::builder()
            .map_err(|e| load_err(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| load_err(e.to_string()))?;

        tracing::info!(path = %path.display(), score_threshold, "face mesh model loaded");
        Ok(Self {
            session,
            score_threshold,
        })
    }

    /// Run the model on one frame. `Ok(None)` means no face.
    pub fn detect_landmarks(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, ModelError> {
        let input = preprocess(frame)?;

        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| ModelError::Inference(e.to_string()))?;

        let mut mesh: Option<Vec<f32>> = None;
        let mut score_logit: Option<f32> = None;
        for (_name, value) in outputs.iter() {
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| ModelError::Output(e.to_string()))?;
            if data.len() >= MESH_POINTS * 3 && mesh.is_none() {
                mesh = Some(data.to_vec());
            } else if data.len() == 1 {
                score_logit = Some(data[0]);
            }
        }

        let mesh = mesh.ok_or_else(|| {
            ModelError::Output(format!("no output with {} values", MESH_POINTS * 3))
        })?;
        Ok(decode(&mesh, score_logit, self.score_threshold))
    }
}

impl LandmarkSource for FaceMesh {
    fn detect(&mut self, frame: &Frame) -> Result<Option<LandmarkSet>, MetricsError> {
        self.detect_landmarks(frame)
            .map_err(|e| MetricsError::Landmarks(e.to_string()))
    }
}

/// Resize the frame to the model input and build the NHWC tensor.
fn preprocess(frame: &Frame) -> Result<Tensor<f32>, ModelError> {
    let view: ImageBuffer<Rgb<u8>, &[u8]> =
        ImageBuffer::from_raw(frame.width, frame.height, frame.data.as_slice()).ok_or(
            ModelError::InvalidFrame {
                width: frame.width,
                height: frame.height,
            },
        )?;
    let resized = imageops::resize(&view, INPUT_SIZE, INPUT_SIZE, FilterType::Triangle);

    let data: Vec<f32> = resized.as_raw().iter().map(|&v| v as f32 / 255.0).collect();
    let shape = [1usize, INPUT_SIZE as usize, INPUT_SIZE as usize, 3];
    Tensor::from_array((shape, data.into_boxed_slice()))
        .map_err(|e| ModelError::Inference(e.to_string()))
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Turn raw model output into a normalized landmark set.
///
/// A missing score is treated as "face present".
fn decode(mesh: &[f32], score_logit: Option<f32>, score_threshold: f32) -> Option<LandmarkSet> {
    if let Some(logit) = score_logit {
        let score = sigmoid(logit);
        if score < score_threshold {
            tracing::debug!(score, "face presence below threshold");
            return None;
        }
    }

    let scale = INPUT_SIZE as f32;
    let points = mesh
        .chunks_exact(3)
        .take(MESH_POINTS)
        .map(|p| Point::new(p[0] / scale, p[1] / scale))
        .collect();
    Some(LandmarkSet::new(points))
}
