//! SHA-256 pinning for operator-supplied model files.

use sha2::{Digest, Sha256};
use std::fmt;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ModelIntegrityError {
    #[error("model file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("cannot read model file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("not a SHA-256 hex digest: {0:?}")]
    MalformedChecksum(String),

    #[error("model {path} does not match the pinned checksum\n  expected: {expected}\n  got:      {got}")]
    Mismatch {
        path: PathBuf,
        expected: Sha256Hex,
        got: Sha256Hex,
    },
}

/// A lowercase, 64-character SHA-256 hex digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sha256Hex(String);

impl Sha256Hex {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Sha256Hex {
    type Err = ModelIntegrityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().to_ascii_lowercase();
        if hex.len() == 64 && hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(hex))
        } else {
            Err(ModelIntegrityError::MalformedChecksum(s.to_string()))
        }
    }
}

impl fmt::Display for Sha256Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hash everything `reader` yields.
pub fn sha256_reader<R: Read>(mut reader: R) -> io::Result<Sha256Hex> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(Sha256Hex(format!("{:x}", hasher.finalize())))
}

pub fn sha256_file(path: &Path) -> Result<Sha256Hex, ModelIntegrityError> {
    let unreadable = |source| ModelIntegrityError::Unreadable {
        path: path.to_path_buf(),
        source,
    };
    let file = fs::File::open(path).map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            ModelIntegrityError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            unreadable(e)
        }
    })?;
    sha256_reader(io::BufReader::new(file)).map_err(unreadable)
}

/// Fail unless the file at `path` hashes to `expected`.
pub fn verify_file(path: &Path, expected: &Sha256Hex) -> Result<(), ModelIntegrityError> {
    let got = sha256_file(path)?;
    if &got != expected {
        return Err(ModelIntegrityError::Mismatch {
            path: path.to_path_buf(),
            expected: expected.clone(),
            got,
        });
    }
    tracing::debug!(path = %path.display(), "model checksum verified");
    Ok(())
}
