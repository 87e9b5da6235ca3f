//! Decoding of one transport line into an RGB frame.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use blinkgaze_core::{Frame, MetricsError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FrameError {
    #[error("empty frame")]
    Empty,
    #[error("invalid image: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid image: {0}")]
    Image(#[from] image::ImageError),
    #[error("invalid image: {0}")]
    Buffer(#[from] MetricsError),
}

/// Decode a base64-encoded image (any format the `image` crate recognizes)
/// into a packed RGB8 frame. Browser-style `data:image/...;base64,` prefixes
/// are accepted.
pub fn decode_frame(line: &str) -> Result<Frame, FrameError> {
    let payload = strip_data_url(line.trim());
    if payload.is_empty() {
        return Err(FrameError::Empty);
    }

    let bytes = STANDARD.decode(payload)?;
    let rgb = image::load_from_memory(&bytes)?.into_rgb8();
    let (width, height) = rgb.dimensions();
    Ok(Frame::from_rgb8(width, height, rgb.into_raw())?)
}

fn strip_data_url(payload: &str) -> &str {
    if payload.starts_with("data:") {
        if let Some((_, data)) = payload.split_once(',') {
            return data;
        }
    }
    payload
}
