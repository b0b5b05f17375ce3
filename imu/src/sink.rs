//! Append-only, flush-per-record log sink.

use crate::error::{RuntimeError, StartupError};
use crate::record::LogRecord;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Serializes `record` into a complete line ready for
/// [`SampleLogger::write_line`].
pub fn encode_line(record: &LogRecord) -> Result<Vec<u8>, RuntimeError> {
    let mut line = serde_json::to_vec(record).map_err(RuntimeError::Serialize)?;
    line.push(b'\n');
    Ok(line)
}

/// Writes one JSON line per record and flushes before returning, so every
/// appended record has left the process by the time the next poll starts.
pub struct SampleLogger<W: Write = File> {
    writer: Option<W>,
    records: u64,
    pending: Option<PendingLine>,
}

/// A line whose last write failed part way.
struct PendingLine {
    line: Vec<u8>,
    // Bytes handed to the writer, possibly prefixed with a fragment terminator.
    buffer: Vec<u8>,
    written: usize,
}

impl SampleLogger<File> {
    /// Opens `path` for appending, creating it if needed. Existing content
    /// is never truncated.
    pub fn open(path: &Path) -> Result<Self, StartupError> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| StartupError::SinkOpen {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("Opened log sink {}", path.display());
        Ok(SampleLogger::new(file))
    }
}

impl<W: Write> SampleLogger<W> {
    pub fn new(writer: W) -> Self {
        SampleLogger {
            writer: Some(writer),
            records: 0,
            pending: None,
        }
    }

    /// Writes an encoded line and flushes.
    ///
    /// After a failure, calling again with the same line resumes after the
    /// bytes that were already accepted, so a retried line lands exactly
    /// once. A different line instead first terminates the torn fragment
    /// with a newline, leaving only that fragment unparseable.
    pub fn write_line(&mut self, line: &[u8]) -> Result<(), RuntimeError> {
        let writer = self.writer.as_mut().ok_or(RuntimeError::SinkClosed)?;

        let (buffer, mut written) = match self.pending.take() {
            Some(pending) if pending.line == line => (pending.buffer, pending.written),
            Some(pending) if pending.written > 0 && pending.written < pending.buffer.len() => {
                warn!("Abandoning a partially written log line");
                let mut buffer = Vec::with_capacity(line.len() + 1);
                buffer.push(b'\n');
                buffer.extend_from_slice(line);
                (buffer, 0)
            }
            _ => (line.to_vec(), 0),
        };

        let failure = loop {
            if written == buffer.len() {
                break writer.flush().err();
            }
            match writer.write(&buffer[written..]) {
                Ok(0) => {
                    break Some(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "log sink accepted no bytes",
                    ))
                }
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => break Some(e),
            }
        };

        if let Some(e) = failure {
            self.pending = Some(PendingLine {
                line: line.to_vec(),
                buffer,
                written,
            });
            return Err(RuntimeError::Write(e));
        }

        self.records += 1;
        Ok(())
    }

    pub fn append(&mut self, record: &LogRecord) -> Result<(), RuntimeError> {
        let line = encode_line(record)?;
        self.write_line(&line)
    }

    /// Number of records written by this logger.
    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.writer.as_ref()
    }

    /// Flushes and closes the sink, handing back the writer.
    pub fn finish(&mut self) -> Result<Option<W>, RuntimeError> {
        match self.writer.take() {
            Some(mut writer) => {
                writer.flush().map_err(RuntimeError::Write)?;
                Ok(Some(writer))
            }
            None => Ok(None),
        }
    }
}

impl<W: Write> Drop for SampleLogger<W> {
    fn drop(&mut self) {
        if let Err(e) = self.finish() {
            warn!("Failed to flush log sink on close: {}", e);
        }
    }
}
