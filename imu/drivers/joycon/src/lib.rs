mod report;

pub use controller_traits::{ButtonMask, DeviceHandle, DeviceSession, ImuSample, SessionError, Vector3};
use hidapi::{HidApi, HidDevice, HidError};
use log::{debug, info, warn};
pub use report::*;
use std::collections::HashSet;
use std::thread;
use std::time::Duration;

pub const NINTENDO_VENDOR_ID: u16 = 0x057E;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerKind {
    LeftJoycon,
    RightJoycon,
    ProController,
}

impl ControllerKind {
    pub fn from_product_id(product_id: u16) -> Option<Self> {
        match product_id {
            0x2006 => Some(ControllerKind::LeftJoycon),
            0x2007 => Some(ControllerKind::RightJoycon),
            0x2009 => Some(ControllerKind::ProController),
            _ => None,
        }
    }
}

fn hid_error(err: HidError) -> SessionError {
    SessionError::DeviceError(format!("HID error: {}", err))
}

struct Controller {
    device: HidDevice,
    kind: ControllerKind,
    packet_counter: u8,
    buttons: ButtonMask,
    // Set when a report arrived that `read_buttons` has not consumed yet.
    buttons_pending: bool,
}

impl Controller {
    fn new(device: HidDevice, kind: ControllerKind) -> Result<Self, SessionError> {
        let mut controller = Controller {
            device,
            kind,
            packet_counter: 0,
            buttons: ButtonMask::empty(),
            buttons_pending: false,
        };
        controller.initialize()?;
        Ok(controller)
    }

    fn initialize(&mut self) -> Result<(), SessionError> {
        self.send_subcommand(SUBCOMMAND_ENABLE_IMU, &[0x01])?;
        self.send_subcommand(SUBCOMMAND_SET_REPORT_MODE, &[STANDARD_FULL_REPORT])?;
        Ok(())
    }

    fn send_subcommand(&mut self, id: u8, args: &[u8]) -> Result<(), SessionError> {
        let packet = subcommand_packet(self.packet_counter, id, args);
        self.packet_counter = self.packet_counter.wrapping_add(1);
        self.device
            .write(&packet)
            .map_err(|e| SessionError::WriteError(format!("Subcommand {:#04x}: {}", id, e)))?;
        // Controller drops subcommands sent back to back.
        thread::sleep(Duration::from_millis(30));
        Ok(())
    }

    fn next_report(&mut self, timeout_ms: i32) -> Result<InputReport, SessionError> {
        let report = latest_report(&mut self.device, timeout_ms)?;
        self.buttons = report.buttons;
        self.buttons_pending = true;
        Ok(report)
    }
}

impl ReportSource for HidDevice {
    fn read_report(&mut self, buffer: &mut [u8], timeout_ms: i32) -> Result<usize, SessionError> {
        self.read_timeout(buffer, timeout_ms)
            .map_err(|e| SessionError::ReadError(format!("Failed to read report: {}", e)))
    }
}

/// HID-backed session over every Nintendo controller found at `connect`.
///
/// Each `read_imu` returns the newest queued input report, dropping older
/// ones. `read_buttons` hands out the buttons from that same report when one
/// is pending, otherwise it reads a report of its own.
pub struct JoyconSession {
    api: Option<HidApi>,
    controllers: Vec<(DeviceHandle, Controller)>,
    read_timeout_ms: i32,
}

impl JoyconSession {
    pub fn new() -> Self {
        JoyconSession {
            api: None,
            controllers: Vec::new(),
            read_timeout_ms: 100,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        self
    }

    pub fn kind(&self, handle: DeviceHandle) -> Option<ControllerKind> {
        self.controllers
            .iter()
            .find(|(h, _)| *h == handle)
            .map(|(_, c)| c.kind)
    }

    fn controller(&mut self, handle: DeviceHandle) -> Result<&mut Controller, SessionError> {
        if self.api.is_none() {
            return Err(SessionError::NotConnected);
        }
        self.controllers
            .iter_mut()
            .find(|(h, _)| *h == handle)
            .map(|(_, c)| c)
            .ok_or(SessionError::InvalidHandle(handle))
    }
}

impl Default for JoyconSession {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceSession for JoyconSession {
    fn connect(&mut self) -> Result<usize, SessionError> {
        let api = HidApi::new().map_err(hid_error)?;
        self.controllers.clear();
        let mut seen = HashSet::new();

        for info in api.device_list() {
            if info.vendor_id() != NINTENDO_VENDOR_ID {
                continue;
            }
            let Some(kind) = ControllerKind::from_product_id(info.product_id()) else {
                continue;
            };
            // Some platforms list one entry per HID collection.
            if !seen.insert(info.path().to_owned()) {
                continue;
            }

            let opened = info
                .open_device(&api)
                .map_err(hid_error)
                .and_then(|device| Controller::new(device, kind));
            match opened {
                Ok(controller) => {
                    let handle = self.controllers.len() as DeviceHandle;
                    info!("Connected {:?} as handle {}", kind, handle);
                    self.controllers.push((handle, controller));
                }
                Err(e) => warn!("Failed to open {:?}: {}", kind, e),
            }
        }

        self.api = Some(api);
        Ok(self.controllers.len())
    }

    fn list_handles(&self, max: usize) -> Vec<DeviceHandle> {
        self.controllers.iter().take(max).map(|(h, _)| *h).collect()
    }

    fn read_imu(&mut self, handle: DeviceHandle) -> Result<ImuSample, SessionError> {
        let timeout_ms = self.read_timeout_ms;
        let report = self.controller(handle)?.next_report(timeout_ms)?;
        Ok(report.imu)
    }

    fn read_buttons(&mut self, handle: DeviceHandle) -> Result<ButtonMask, SessionError> {
        let timeout_ms = self.read_timeout_ms;
        let controller = self.controller(handle)?;
        if !controller.buttons_pending {
            controller.next_report(timeout_ms)?;
        }
        controller.buttons_pending = false;
        Ok(controller.buttons)
    }

    fn disconnect_all(&mut self) {
        if self.api.is_none() {
            return;
        }
        for (handle, controller) in self.controllers.drain(..) {
            debug!("Releasing {:?} (handle {})", controller.kind, handle);
        }
        self.api = None;
        info!("Disconnected all controllers");
    }
}

impl Drop for JoyconSession {
    fn drop(&mut self) {
        self.disconnect_all();
    }
}
