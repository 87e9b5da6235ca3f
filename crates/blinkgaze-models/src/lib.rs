//! Landmark model support: the ONNX face-mesh [`FaceMesh`] landmark source and
//! SHA-256 integrity checks for operator-supplied model files.

use std::path::PathBuf;

pub mod facemesh;
pub mod integrity;

pub use facemesh::{FaceMesh, ModelError, DEFAULT_SCORE_THRESHOLD};
pub use integrity::{sha256_file, sha256_reader, verify_file, ModelIntegrityError, Sha256Hex};

/// File name of the face landmark model inside the model directory.
pub const FACE_LANDMARK_MODEL: &str = "face_landmark.onnx";

/// `$XDG_DATA_HOME/blinkgaze/models`, falling back to
/// `~/.local/share/blinkgaze/models`.
pub fn default_model_dir() -> PathBuf {
    let data_home = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        });
    data_home.join("blinkgaze/models")
}

/// Default location of the face landmark model.
pub fn default_model_path() -> PathBuf {
    default_model_dir().join(FACE_LANDMARK_MODEL)
}
