pub mod buttons;
pub mod config;
pub mod error;
pub mod poll;
pub mod record;
pub mod retry;
pub mod session;
pub mod sink;

pub use buttons::{detect_presses, press_line};
pub use config::{Config, LogMode};
pub use controller_traits::{ButtonMask, DeviceHandle, DeviceSession, ImuSample, SessionError, Vector3};
pub use error::{RuntimeError, StartupError};
pub use poll::{orientation_line, start, start_with_console, PollLoop, RunSummary, MAX_HANDLES};
pub use record::{read_records, unix_millis, LogRecord};
pub use retry::RetryPolicy;
pub use session::SessionGuard;
pub use sink::SampleLogger;

#[cfg(feature = "joycon")]
pub use joycon::JoyconSession;
