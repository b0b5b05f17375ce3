use joycon::{DeviceSession, JoyconSession};
use std::io;
use std::thread;
use std::time::Duration;

fn main() -> io::Result<()> {
    let mut session = JoyconSession::new();

    let connected = session
        .connect()
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
    if connected == 0 {
        return Err(io::Error::new(io::ErrorKind::NotFound, "No controllers found"));
    }

    let handle = match session.list_handles(16).first() {
        Some(&h) => h,
        None => return Err(io::Error::new(io::ErrorKind::NotFound, "No device handles found")),
    };
    println!(
        "Reading {:?} (handle {}) of {} connected controller(s)...",
        session.kind(handle),
        handle,
        connected
    );

    loop {
        match session.read_imu(handle) {
            Ok(imu) => {
                let buttons = session.read_buttons(handle).unwrap_or_default();
                println!(
                    "acc:   x: {: >10.3} y: {: >10.3} z: {: >10.3}\n\
                     gyro:  x: {: >10.3} y: {: >10.3} z: {: >10.3}\n\
                     buttons: {:#06x} {:?}\n",
                    imu.accel.x,
                    imu.accel.y,
                    imu.accel.z,
                    imu.gyro.x,
                    imu.gyro.y,
                    imu.gyro.z,
                    buttons.bits(),
                    buttons,
                );
            }
            Err(e) => eprintln!("Error reading from controller: {}", e),
        }

        thread::sleep(Duration::from_millis(100));
    }
}
