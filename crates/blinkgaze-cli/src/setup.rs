//! `blinkgaze setup`: fetch the face landmark model into the model directory.

use anyhow::{bail, Context, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use blinkgaze_models::{sha256_file, sha256_reader, Sha256Hex, FACE_LANDMARK_MODEL};

pub struct SetupArgs {
    pub url: String,
    pub sha256: Option<Sha256Hex>,
    pub model_dir: Option<PathBuf>,
}

/// Reader that mirrors everything it yields into `sink`, reporting each new
/// 10% step of `expected_len` to `progress`.
struct Tee<R, W, F> {
    inner: R,
    sink: W,
    expected_len: Option<u64>,
    copied: u64,
    reported: u64,
    progress: F,
}

impl<R: Read, W: Write, F: FnMut(u64)> Read for Tee<R, W, F> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.sink.write_all(&buf[..n])?;
        self.copied += n as u64;

        if let Some(len) = self.expected_len.filter(|&len| len > 0) {
            let step = (self.copied * 10 / len).min(10);
            if step > self.reported {
                self.reported = step;
                (self.progress)(step * 10);
            }
        }
        Ok(n)
    }
}

/// Copy `reader` into `writer` and return the byte count and digest.
fn copy_hashed<R: Read, W: Write>(
    reader: R,
    writer: W,
    expected_len: Option<u64>,
    progress: impl FnMut(u64),
) -> io::Result<(u64, Sha256Hex)> {
    let mut tee = Tee {
        inner: reader,
        sink: writer,
        expected_len,
        copied: 0,
        reported: 0,
        progress,
    };
    let digest = sha256_reader(&mut tee)?;
    tee.sink.flush()?;
    Ok((tee.copied, digest))
}

/// Partially downloaded model; removed on drop unless committed.
struct PartFile {
    path: PathBuf,
    committed: bool,
}

impl PartFile {
    fn new(dest: &Path) -> Self {
        Self {
            path: dest.with_extension("onnx.part"),
            committed: false,
        }
    }

    fn commit(mut self, dest: &Path) -> Result<()> {
        fs::rename(&self.path, dest).with_context(|| {
            format!("failed to move {} into {}", self.path.display(), dest.display())
        })?;
        self.committed = true;
        Ok(())
    }
}

impl Drop for PartFile {
    fn drop(&mut self) {
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}

fn download(url: &str, expected: Option<&Sha256Hex>, dest: &Path) -> Result<()> {
    let resp = ureq::get(url)
        .call()
        .with_context(|| format!("failed to download {url}"))?;
    let content_length = resp
        .headers()
        .get("Content-Length")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());

    let part = PartFile::new(dest);
    let file = fs::File::create(&part.path)
        .with_context(|| format!("failed to create {}", part.path.display()))?;

    let (bytes, digest) = copy_hashed(
        resp.into_body().into_reader(),
        io::BufWriter::new(file),
        content_length,
        |pct| {
            print!("  {pct}%\r");
            io::stdout().flush().ok();
        },
    )
    .with_context(|| format!("download of {url} interrupted"))?;
    println!("  received {bytes} bytes");

    match expected {
        Some(expected) if &digest != expected => {
            bail!("checksum mismatch for {url}\n  expected: {expected}\n  got:      {digest}");
        }
        Some(_) => println!("  checksum ok"),
        None => {
            tracing::warn!(sha256 = %digest, "model downloaded without a pinned checksum");
            println!("  sha256 {digest} (pass --sha256 to pin it)");
        }
    }

    part.commit(dest)
}

/// Whether an existing model file can be kept as is.
fn is_current(dest: &Path, expected: Option<&Sha256Hex>) -> bool {
    let Some(expected) = expected else {
        return false;
    };
    match sha256_file(dest) {
        Ok(digest) => &digest == expected,
        Err(e) => {
            tracing::debug!(error = %e, "existing model not usable");
            false
        }
    }
}

pub fn run(args: SetupArgs) -> Result<()> {
    let dir = args
        .model_dir
        .unwrap_or_else(blinkgaze_models::default_model_dir);
    fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory {}", dir.display()))?;

    let dest = dir.join(FACE_LANDMARK_MODEL);
    let expected = args.sha256.as_ref();
    if is_current(&dest, expected) {
        println!("{} is up to date", dest.display());
        return Ok(());
    }
    if dest.exists() {
        println!("replacing {}", dest.display());
    }

    println!("fetching {} into {}", args.url, dir.display());
    download(&args.url, expected, &dest)?;
    println!("installed {}", dest.display());
    Ok(())
}
