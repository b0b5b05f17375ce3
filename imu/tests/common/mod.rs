#![allow(dead_code)]

use imu_logger::{ButtonMask, Config, DeviceHandle, DeviceSession, ImuSample, SessionError, Vector3};
use std::cell::Cell;
use std::collections::VecDeque;
use std::path::Path;
use std::rc::Rc;

/// In-memory session that replays queued reads. Empty queues read as a
/// zero sample and no buttons.
#[derive(Default)]
pub struct ScriptedSession {
    pub devices: usize,
    pub handles: Vec<DeviceHandle>,
    pub imu: VecDeque<Result<ImuSample, SessionError>>,
    pub buttons: VecDeque<Result<ButtonMask, SessionError>>,
    pub reads: Vec<DeviceHandle>,
    pub disconnects: Rc<Cell<usize>>,
}

impl ScriptedSession {
    pub fn with_devices(devices: usize, handles: &[DeviceHandle]) -> Self {
        ScriptedSession {
            devices,
            handles: handles.to_vec(),
            ..Default::default()
        }
    }

    pub fn push_sample(&mut self, accel: [f32; 3], gyro: [f32; 3], buttons: u32) {
        self.imu.push_back(Ok(ImuSample {
            accel: Vector3::new(accel[0], accel[1], accel[2]),
            gyro: Vector3::new(gyro[0], gyro[1], gyro[2]),
        }));
        self.buttons.push_back(Ok(ButtonMask::from_raw(buttons)));
    }

    pub fn disconnect_counter(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.disconnects)
    }
}

impl DeviceSession for ScriptedSession {
    fn connect(&mut self) -> Result<usize, SessionError> {
        Ok(self.devices)
    }

    fn list_handles(&self, max: usize) -> Vec<DeviceHandle> {
        self.handles.iter().take(max).copied().collect()
    }

    fn read_imu(&mut self, handle: DeviceHandle) -> Result<ImuSample, SessionError> {
        self.reads.push(handle);
        self.imu.pop_front().unwrap_or(Ok(ImuSample::default()))
    }

    fn read_buttons(&mut self, handle: DeviceHandle) -> Result<ButtonMask, SessionError> {
        self.reads.push(handle);
        self.buttons.pop_front().unwrap_or(Ok(ButtonMask::empty()))
    }

    fn disconnect_all(&mut self) {
        self.disconnects.set(self.disconnects.get() + 1);
    }
}

/// Config writing to `path` with instant retries.
pub fn test_config(path: &Path, samples: Option<u64>) -> Config {
    Config {
        log_path: path.to_path_buf(),
        samples,
        retry_backoff_ms: 0,
        max_backoff_ms: 0,
        ..Config::default()
    }
}

pub fn fixed_clock() -> i64 {
    1_700_000_000_000
}
