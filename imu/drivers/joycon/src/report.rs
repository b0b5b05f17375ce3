use controller_traits::{ButtonMask, ImuSample, SessionError, Vector3};
use log::debug;

/// Output report carrying rumble data plus a subcommand.
pub const SUBCOMMAND_REPORT: u8 = 0x01;
/// Input report id of the standard full mode (buttons, sticks, IMU).
pub const STANDARD_FULL_REPORT: u8 = 0x30;

pub const SUBCOMMAND_SET_REPORT_MODE: u8 = 0x03;
pub const SUBCOMMAND_ENABLE_IMU: u8 = 0x40;

pub const OUTPUT_REPORT_LEN: usize = 49;
pub const FULL_REPORT_LEN: usize = 49;

const NEUTRAL_RUMBLE: [u8; 8] = [0x00, 0x01, 0x40, 0x40, 0x00, 0x01, 0x40, 0x40];

// Offsets inside a 0x30 report, report id included.
const RIGHT_BUTTONS: usize = 3;
const SHARED_BUTTONS: usize = 4;
const LEFT_BUTTONS: usize = 5;
const IMU_FRAME: usize = 13;
const IMU_FRAME_LEN: usize = 12;

/// G per count at the factory ±8G range.
pub const ACCEL_SCALE: f32 = 0.000244;
/// deg/s per count at the factory ±2000 dps range.
pub const GYRO_SCALE: f32 = 0.06103;

const RIGHT_MAP: [(u8, ButtonMask); 6] = [
    (0x01, ButtonMask::Y),
    (0x02, ButtonMask::X),
    (0x04, ButtonMask::B),
    (0x08, ButtonMask::A),
    (0x40, ButtonMask::R),
    (0x80, ButtonMask::ZR),
];

const SHARED_MAP: [(u8, ButtonMask); 4] = [
    (0x01, ButtonMask::MINUS),
    (0x02, ButtonMask::PLUS),
    (0x10, ButtonMask::HOME),
    (0x20, ButtonMask::CAPTURE),
];

const LEFT_MAP: [(u8, ButtonMask); 6] = [
    (0x01, ButtonMask::DOWN),
    (0x02, ButtonMask::UP),
    (0x04, ButtonMask::RIGHT),
    (0x08, ButtonMask::LEFT),
    (0x40, ButtonMask::L),
    (0x80, ButtonMask::ZL),
];

/// Decoded standard full input report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputReport {
    pub buttons: ButtonMask,
    pub imu: ImuSample,
}

impl InputReport {
    /// Parses a 0x30 report. Any other report id (subcommand replies,
    /// simple HID mode) yields `None`.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < FULL_REPORT_LEN || data[0] != STANDARD_FULL_REPORT {
            return None;
        }

        let buttons = decode_buttons(
            data[RIGHT_BUTTONS],
            data[SHARED_BUTTONS],
            data[LEFT_BUTTONS],
        );
        // The report carries three frames 5ms apart; the first is used.
        let imu = decode_imu_frame(&data[IMU_FRAME..IMU_FRAME + IMU_FRAME_LEN]);

        Some(InputReport { buttons, imu })
    }
}

/// Maps the three raw button bytes onto the shared button table.
/// Stick clicks and the SL/SR rail buttons have no entry and are dropped.
pub fn decode_buttons(right: u8, shared: u8, left: u8) -> ButtonMask {
    let mut mask = ButtonMask::empty();
    for (byte, map) in [(right, &RIGHT_MAP[..]), (shared, &SHARED_MAP[..]), (left, &LEFT_MAP[..])] {
        for &(bit, button) in map {
            if byte & bit != 0 {
                mask |= button;
            }
        }
    }
    mask
}

fn read_i16(frame: &[u8], offset: usize) -> i16 {
    i16::from_le_bytes([frame[offset], frame[offset + 1]])
}

fn decode_imu_frame(frame: &[u8]) -> ImuSample {
    ImuSample {
        accel: Vector3::new(
            read_i16(frame, 0) as f32 * ACCEL_SCALE,
            read_i16(frame, 2) as f32 * ACCEL_SCALE,
            read_i16(frame, 4) as f32 * ACCEL_SCALE,
        ),
        gyro: Vector3::new(
            read_i16(frame, 6) as f32 * GYRO_SCALE,
            read_i16(frame, 8) as f32 * GYRO_SCALE,
            read_i16(frame, 10) as f32 * GYRO_SCALE,
        ),
    }
}

/// Raw input report reader. A `timeout_ms` of 0 returns immediately with 0
/// bytes when nothing is queued.
pub trait ReportSource {
    fn read_report(&mut self, buffer: &mut [u8], timeout_ms: i32) -> Result<usize, SessionError>;
}

/// Reports discarded at most while catching up with the input queue.
pub const MAX_DRAINED_REPORTS: usize = 256;
/// Reports other than 0x30 (subcommand replies) skipped before a blocking read gives up.
pub const MAX_SKIPPED_REPORTS: usize = 16;

/// Newest full report. Everything already queued is drained without
/// blocking and the last 0x30 report kept; only when none was queued does
/// it wait up to `timeout_ms` for the next one.
pub fn latest_report<R: ReportSource + ?Sized>(
    source: &mut R,
    timeout_ms: i32,
) -> Result<InputReport, SessionError> {
    let mut buffer = [0u8; 64];

    let mut latest = None;
    let mut drained = 0;
    for _ in 0..MAX_DRAINED_REPORTS {
        let n = source.read_report(&mut buffer, 0)?;
        if n == 0 {
            break;
        }
        drained += 1;
        if let Some(report) = InputReport::parse(&buffer[..n]) {
            latest = Some(report);
        }
    }
    if let Some(report) = latest {
        if drained > 1 {
            debug!("Dropped {} stale report(s)", drained - 1);
        }
        return Ok(report);
    }

    for _ in 0..MAX_SKIPPED_REPORTS {
        let n = source.read_report(&mut buffer, timeout_ms)?;
        if n == 0 {
            return Err(SessionError::ReadError(format!(
                "No report within {}ms",
                timeout_ms
            )));
        }
        if let Some(report) = InputReport::parse(&buffer[..n]) {
            return Ok(report);
        }
        debug!("Skipping report {:#04x}", buffer[0]);
    }
    Err(SessionError::ReadError(
        "Controller is not sending full reports".to_string(),
    ))
}

/// Builds a subcommand output report. Only the low nibble of `counter` is sent.
pub fn subcommand_packet(counter: u8, id: u8, args: &[u8]) -> [u8; OUTPUT_REPORT_LEN] {
    let mut packet = [0u8; OUTPUT_REPORT_LEN];
    packet[0] = SUBCOMMAND_REPORT;
    packet[1] = counter & 0x0F;
    packet[2..10].copy_from_slice(&NEUTRAL_RUMBLE);
    packet[10] = id;
    let len = args.len().min(OUTPUT_REPORT_LEN - 11);
    packet[11..11 + len].copy_from_slice(&args[..len]);
    packet
}
