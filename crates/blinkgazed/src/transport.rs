//! Line-delimited stream protocol.
//!
//! Input: one base64-encoded image per line. Output: exactly one JSON object
//! per input line, written and flushed before the next line is read. A bad
//! line yields `{"error": "..."}` and the stream carries on.

use anyhow::{Context, Result};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::engine::{EngineError, EngineHandle};
use crate::frame::decode_frame;

#[derive(Serialize)]
struct ErrorRecord<'a> {
    error: &'a str,
}

/// Longest accepted input line, newline excluded.
pub const DEFAULT_MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

enum ReadLine {
    Eof,
    Line,
    TooLarge,
}

/// Read one line into `buf`, holding at most `max_line` bytes of it. The rest
/// of an oversized line is skipped up to and including its newline.
async fn read_line_capped<R>(
    reader: &mut R,
    buf: &mut Vec<u8>,
    max_line: usize,
) -> std::io::Result<ReadLine>
where
    R: AsyncBufRead + Unpin,
{
    buf.clear();
    let limit = max_line as u64 + 1;
    let n = (&mut *reader).take(limit).read_until(b'\n', buf).await?;
    if n == 0 {
        return Ok(ReadLine::Eof);
    }
    if (n as u64) < limit || buf.last() == Some(&b'\n') {
        return Ok(ReadLine::Line);
    }

    buf.clear();
    loop {
        let chunk = reader.fill_buf().await?;
        if chunk.is_empty() {
            break;
        }
        match chunk.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                reader.consume(pos + 1);
                break;
            }
            None => {
                let len = chunk.len();
                reader.consume(len);
            }
        }
    }
    Ok(ReadLine::TooLarge)
}

/// Counters for one stream, reported at shutdown.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StreamStats {
    pub lines: u64,
    pub errors: u64,
}

/// Serve frames from `reader` until end of input.
///
/// Only I/O failures on the stream itself and loss of the engine thread end
/// the loop early. Lines longer than `max_line` bytes are answered with
/// `{"error": "frame too large"}` without being buffered whole.
pub async fn serve<R, W>(
    mut reader: R,
    mut writer: W,
    engine: &EngineHandle,
    fps: f64,
    max_line: usize,
) -> Result<StreamStats>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut stats = StreamStats::default();
    let mut buf = Vec::new();

    loop {
        let read = read_line_capped(&mut reader, &mut buf, max_line)
            .await
            .context("failed to read frame line")?;
        let outcome = match read {
            ReadLine::Eof => break,
            ReadLine::TooLarge => Err(LineError::Rejected("frame too large".to_string())),
            ReadLine::Line => process_line(&String::from_utf8_lossy(&buf), engine, fps).await,
        };
        stats.lines += 1;

        let out = match outcome {
            Ok(record) => serde_json::to_string(&record)?,
            Err(LineError::Rejected(message)) => {
                stats.errors += 1;
                tracing::debug!(line = stats.lines, error = %message, "frame rejected");
                serde_json::to_string(&ErrorRecord { error: &message })?
            }
            Err(LineError::Fatal(e)) => {
                return Err(e).context("engine unavailable");
            }
        };

        writer.write_all(out.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
    }

    Ok(stats)
}

enum LineError {
    /// Reported to the client; the stream continues.
    Rejected(String),
    Fatal(EngineError),
}

async fn process_line(
    line: &str,
    engine: &EngineHandle,
    fps: f64,
) -> Result<blinkgaze_core::MetricsRecord, LineError> {
    let frame = decode_frame(line).map_err(|e| LineError::Rejected(e.to_string()))?;
    match engine.process(frame, fps).await {
        Ok(record) => Ok(record),
        Err(EngineError::Metrics(e)) => Err(LineError::Rejected(e.to_string())),
        Err(e) => Err(LineError::Fatal(e)),
    }
}
