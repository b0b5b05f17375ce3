use controller_traits::SessionError;
use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

/// Failures before the poll loop starts. All of them end the process with
/// status 1.
#[derive(Debug)]
pub enum StartupError {
    /// `connect` found no compatible controller
    NoDevices,
    /// Controllers connected but no handle was enumerated
    NoHandles,
    /// The session itself failed while connecting
    Session(SessionError),
    /// The log file could not be opened for appending
    SinkOpen { path: PathBuf, source: io::Error },
}

impl StartupError {
    pub fn exit_code(&self) -> u8 {
        1
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartupError::NoDevices => write!(f, "No controllers found."),
            StartupError::NoHandles => write!(f, "No device handles found."),
            StartupError::Session(e) => write!(f, "Failed to connect: {}", e),
            StartupError::SinkOpen { path, source } => {
                write!(f, "Failed to open log file {}: {}", path.display(), source)
            }
        }
    }
}

impl StdError for StartupError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            StartupError::Session(e) => Some(e),
            StartupError::SinkOpen { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<SessionError> for StartupError {
    fn from(err: SessionError) -> Self {
        StartupError::Session(err)
    }
}

/// Failures inside the poll loop, raised once the retry policy gives up.
#[derive(Debug)]
pub enum RuntimeError {
    /// Reading IMU or button state failed
    Device(SessionError),
    /// Appending to the log failed
    Write(io::Error),
    /// A record could not be encoded
    Serialize(serde_json::Error),
    /// The sink was already closed
    SinkClosed,
    /// Console output failed
    Console(io::Error),
}

impl RuntimeError {
    pub fn exit_code(&self) -> u8 {
        2
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeError::Device(e) => write!(f, "Controller read failed: {}", e),
            RuntimeError::Write(e) => write!(f, "Log write failed: {}", e),
            RuntimeError::Serialize(e) => write!(f, "Failed to encode record: {}", e),
            RuntimeError::SinkClosed => write!(f, "Log sink is closed"),
            RuntimeError::Console(e) => write!(f, "Console write failed: {}", e),
        }
    }
}

impl StdError for RuntimeError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            RuntimeError::Device(e) => Some(e),
            RuntimeError::Write(e) | RuntimeError::Console(e) => Some(e),
            RuntimeError::Serialize(e) => Some(e),
            RuntimeError::SinkClosed => None,
        }
    }
}

impl From<SessionError> for RuntimeError {
    fn from(err: SessionError) -> Self {
        RuntimeError::Device(err)
    }
}
