use bitflags::bitflags;
use std::error::Error as StdError;
use std::fmt;

// --- Basic Types ---
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Vector3 { x, y, z }
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl fmt::Display for Vector3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vector3(x={}, y={}, z={})", self.x, self.y, self.z)
    }
}

/// One inertial snapshot as reported by the driver. No calibration is applied.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuSample {
    /// Linear acceleration, driver units
    pub accel: Vector3,
    /// Angular rate, driver units
    pub gyro: Vector3,
}

impl fmt::Display for ImuSample {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ImuSample(accel={}, gyro={})", self.accel, self.gyro)
    }
}

bitflags! {
    /// Held-button state of one controller.
    ///
    /// The named flags form the fixed label table, declared in ascending bit
    /// order. Bits outside the table are kept as-is so they still reach the
    /// log, but they never have a name.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ButtonMask: u32 {
        const DOWN = 0x0001;
        const UP = 0x0002;
        const RIGHT = 0x0004;
        const LEFT = 0x0008;
        const L = 0x0010;
        const ZL = 0x0020;
        const MINUS = 0x0040;
        const CAPTURE = 0x0080;
        const A = 0x0100;
        const B = 0x0200;
        const X = 0x0400;
        const Y = 0x0800;
        const R = 0x1000;
        const ZR = 0x2000;
        const PLUS = 0x4000;
        const HOME = 0x8000;
    }
}

impl Default for ButtonMask {
    fn default() -> Self {
        ButtonMask::empty()
    }
}

impl ButtonMask {
    /// Builds a mask from a raw driver value, keeping unknown bits.
    pub fn from_raw(raw: u32) -> Self {
        ButtonMask::from_bits_retain(raw)
    }
}

/// Opaque identifier of one connected controller, as handed out by the session.
pub type DeviceHandle = i32;

// --- Standard Error Type ---
#[derive(Debug)]
pub enum SessionError {
    /// Error originating from the underlying transport (HID, USB, Bluetooth)
    DeviceError(String),
    /// Error reading a report from the device
    ReadError(String),
    /// Error writing a command to the device
    WriteError(String),
    /// The handle does not belong to this session
    InvalidHandle(DeviceHandle),
    /// An operation was attempted before `connect` or after `disconnect_all`
    NotConnected,
    /// Catch-all for other errors
    Other(String),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::DeviceError(s) => write!(f, "Device error: {}", s),
            SessionError::ReadError(s) => write!(f, "Read error: {}", s),
            SessionError::WriteError(s) => write!(f, "Write error: {}", s),
            SessionError::InvalidHandle(h) => write!(f, "Invalid device handle: {}", h),
            SessionError::NotConnected => write!(f, "Session is not connected"),
            SessionError::Other(s) => write!(f, "Other session error: {}", s),
        }
    }
}

impl StdError for SessionError {}

/// Connection to a set of motion controllers.
///
/// `read_imu` and `read_buttons` are independent calls; callers treat the
/// pair as approximately simultaneous, never atomic.
pub trait DeviceSession {
    /// Discovers and opens every compatible controller. Returns how many
    /// are connected; zero means nothing usable was found.
    fn connect(&mut self) -> Result<usize, SessionError>;

    /// Handles of the connected controllers, at most `max` of them.
    fn list_handles(&self, max: usize) -> Vec<DeviceHandle>;

    /// Latest inertial snapshot of `handle`.
    fn read_imu(&mut self, handle: DeviceHandle) -> Result<ImuSample, SessionError>;

    /// Currently held buttons of `handle`.
    fn read_buttons(&mut self, handle: DeviceHandle) -> Result<ButtonMask, SessionError>;

    /// Releases every device. Calling it twice is harmless.
    fn disconnect_all(&mut self);
}

impl<S: DeviceSession + ?Sized> DeviceSession for Box<S> {
    fn connect(&mut self) -> Result<usize, SessionError> {
        (**self).connect()
    }

    fn list_handles(&self, max: usize) -> Vec<DeviceHandle> {
        (**self).list_handles(max)
    }

    fn read_imu(&mut self, handle: DeviceHandle) -> Result<ImuSample, SessionError> {
        (**self).read_imu(handle)
    }

    fn read_buttons(&mut self, handle: DeviceHandle) -> Result<ButtonMask, SessionError> {
        (**self).read_buttons(handle)
    }

    fn disconnect_all(&mut self) {
        (**self).disconnect_all()
    }
}
