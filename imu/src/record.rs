//! The persisted log record and its newline-delimited JSON form.

use controller_traits::{ButtonMask, ImuSample};
use serde::{Deserialize, Serialize};
use std::io::{self, BufRead};
use std::time::{SystemTime, UNIX_EPOCH};

/// One poll iteration as it lands in the log.
///
/// ```json
/// {"timestamp":[1700000000000],"accel":[0.0,0.0,1.0],"gyro":[0.1,0.2,0.3],"buttons":256}
/// ```
///
/// The timestamp is written wrapped in a one-element array so existing log
/// consumers keep working; a bare integer is accepted when reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Milliseconds since the Unix epoch
    #[serde(with = "wrapped_millis")]
    pub timestamp: i64,
    pub accel: [f32; 3],
    pub gyro: [f32; 3],
    pub buttons: u32,
}

impl LogRecord {
    pub fn new(timestamp: i64, imu: &ImuSample, buttons: ButtonMask) -> Self {
        LogRecord {
            timestamp,
            accel: imu.accel.to_array(),
            gyro: imu.gyro.to_array(),
            buttons: buttons.bits(),
        }
    }

    /// Serializes to a single JSON object, without the trailing newline.
    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

mod wrapped_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Millis {
        Wrapped([i64; 1]),
        Bare(i64),
    }

    pub fn serialize<S: Serializer>(millis: &i64, serializer: S) -> Result<S::Ok, S::Error> {
        [*millis].serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        match Millis::deserialize(deserializer)? {
            Millis::Wrapped([millis]) | Millis::Bare(millis) => Ok(millis),
        }
    }
}

/// Wall-clock milliseconds since the Unix epoch. A clock set before the
/// epoch reads as zero.
pub fn unix_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// A line that could not be parsed while reading a log.
#[derive(Debug)]
pub struct BadLine {
    /// 1-based line number
    pub line: usize,
    pub error: serde_json::Error,
}

/// Records read back from a log, plus the lines that were skipped.
#[derive(Debug, Default)]
pub struct ReadOutcome {
    pub records: Vec<LogRecord>,
    pub bad_lines: Vec<BadLine>,
}

/// Parses a newline-delimited log. Blank lines are ignored and malformed
/// lines are collected instead of aborting the read.
pub fn read_records<R: BufRead>(reader: R) -> io::Result<ReadOutcome> {
    let mut outcome = ReadOutcome::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match LogRecord::from_line(trimmed) {
            Ok(record) => outcome.records.push(record),
            Err(error) => outcome.bad_lines.push(BadLine {
                line: index + 1,
                error,
            }),
        }
    }
    Ok(outcome)
}
