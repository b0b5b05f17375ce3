use crate::retry::RetryPolicy;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_PATH: &str = "imu_log.json";

/// What the poll loop persists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogMode {
    /// Append every sample to the log file
    #[default]
    Samples,
    /// Console output only; the log file is never opened
    #[value(name = "none")]
    Disabled,
}

/// Runtime settings. Every value defaults to the logger's fixed behaviour:
/// `imu_log.json` in the working directory, polling as fast as the
/// controller answers, forever.
#[derive(Debug, Clone, PartialEq, Eq, Parser)]
#[command(name = "imu-logger", version, about = "Log controller IMU samples as JSON lines")]
pub struct Config {
    /// File the samples are appended to
    #[arg(long, env = "IMU_LOGGER_PATH", default_value = DEFAULT_LOG_PATH)]
    pub log_path: PathBuf,

    /// Whether samples are written to the log file
    #[arg(long, value_enum, env = "IMU_LOGGER_LOG_MODE", default_value_t = LogMode::Samples)]
    pub log_mode: LogMode,

    /// Pause between polls in milliseconds; 0 polls unthrottled
    #[arg(long, env = "IMU_LOGGER_INTERVAL_MS", default_value_t = 0)]
    pub interval_ms: u64,

    /// Attempts per controller read or log write before giving up
    #[arg(long, env = "IMU_LOGGER_MAX_ATTEMPTS", default_value_t = 5)]
    pub max_attempts: u32,

    /// First retry backoff in milliseconds, doubled on every further failure
    #[arg(long, default_value_t = 5)]
    pub retry_backoff_ms: u64,

    /// Upper bound for the retry backoff in milliseconds
    #[arg(long, default_value_t = 500)]
    pub max_backoff_ms: u64,

    /// Stop after this many polls instead of running until interrupted
    #[arg(long)]
    pub samples: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            log_mode: LogMode::Samples,
            interval_ms: 0,
            max_attempts: 5,
            retry_backoff_ms: 5,
            max_backoff_ms: 500,
            samples: None,
        }
    }
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_backoff: Duration::from_millis(self.max_backoff_ms),
        }
    }
}
