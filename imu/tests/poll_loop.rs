mod common;

use common::{fixed_clock, test_config, ScriptedSession};
use imu_logger::{
    read_records, start_with_console, LogMode, PollLoop, RuntimeError, SampleLogger, SessionError,
    SessionGuard, StartupError,
};
use std::fs;
use std::io::{self, BufReader, Write};
use std::sync::atomic::Ordering;

fn console_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8(bytes.to_vec())
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn two_polls_report_press_on_second() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let mut session = ScriptedSession::with_devices(2, &[100, 101]);
    session.push_sample([1.0, 2.0, 3.0], [0.1, 0.2, 0.3], 0x01);
    session.push_sample([1.0, 2.0, 3.0], [0.1, 0.2, 0.3], 0x101);

    let config = test_config(&path, Some(2));
    let mut poller = start_with_console(session, &config, Vec::new())
        .unwrap()
        .with_clock(fixed_clock);
    assert_eq!(poller.handle(), 100);

    let summary = poller.run().unwrap();
    assert_eq!(summary.samples, 2);
    assert_eq!(summary.presses, 2);
    assert!(poller.session().reads.iter().all(|&h| h == 100));

    let orientation = "Orientation (gyro): X=0.100 Y=0.200 Z=0.300";
    assert_eq!(
        console_lines(poller.console()),
        vec![
            orientation.to_string(),
            "*** Button pressed: DOWN ***".to_string(),
            orientation.to_string(),
            "*** Button pressed: A ***".to_string(),
        ]
    );

    poller.shutdown().unwrap();
    let outcome = read_records(BufReader::new(fs::File::open(&path).unwrap())).unwrap();
    assert!(outcome.bad_lines.is_empty());
    let buttons: Vec<u32> = outcome.records.iter().map(|r| r.buttons).collect();
    assert_eq!(buttons, vec![0x01, 0x101]);
    for record in &outcome.records {
        assert_eq!(record.timestamp, fixed_clock());
        assert_eq!(record.accel, [1.0, 2.0, 3.0]);
        assert_eq!(record.gyro, [0.1, 0.2, 0.3]);
    }
}

#[test]
fn held_button_is_announced_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let mut session = ScriptedSession::with_devices(1, &[7]);
    for _ in 0..3 {
        session.push_sample([0.0; 3], [0.0; 3], 0x01);
    }

    let config = test_config(&path, Some(3));
    let mut poller = start_with_console(session, &config, Vec::new()).unwrap();
    poller.run().unwrap();

    let lines = console_lines(poller.console());
    let presses: Vec<&String> = lines.iter().filter(|l| l.starts_with("***")).collect();
    assert_eq!(presses, vec!["*** Button pressed: DOWN ***"]);
    assert_eq!(lines.len(), 4);
}

#[test]
fn no_devices_fails_without_touching_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let session = ScriptedSession::with_devices(0, &[]);
    let disconnects = session.disconnect_counter();

    let config = test_config(&path, None);
    let err = start_with_console(session, &config, Vec::new()).err().unwrap();
    assert!(matches!(err, StartupError::NoDevices));
    assert_eq!(err.exit_code(), 1);
    assert!(!path.exists());
    assert_eq!(disconnects.get(), 1);
}

#[test]
fn no_handles_fails_without_touching_log() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let session = ScriptedSession::with_devices(1, &[]);
    let config = test_config(&path, None);
    let err = start_with_console(session, &config, Vec::new()).err().unwrap();
    assert!(matches!(err, StartupError::NoHandles));
    assert_eq!(err.exit_code(), 1);
    assert!(!path.exists());
}

#[test]
fn unopenable_sink_fails_and_releases_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing").join("imu_log.json");

    let session = ScriptedSession::with_devices(1, &[3]);
    let disconnects = session.disconnect_counter();

    let config = test_config(&path, None);
    let err = start_with_console(session, &config, Vec::new()).err().unwrap();
    assert!(matches!(err, StartupError::SinkOpen { .. }));
    assert_eq!(err.exit_code(), 1);
    assert_eq!(disconnects.get(), 1);
}

#[test]
fn existing_log_content_is_kept() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");
    let earlier = r#"{"timestamp":[1],"accel":[0.0,0.0,0.0],"gyro":[0.0,0.0,0.0],"buttons":0}"#;
    fs::write(&path, format!("{}\n", earlier)).unwrap();

    let mut session = ScriptedSession::with_devices(1, &[0]);
    session.push_sample([0.0, 0.0, 1.0], [0.0; 3], 0);

    let config = test_config(&path, Some(1));
    let mut poller = start_with_console(session, &config, Vec::new()).unwrap();
    poller.run().unwrap();
    poller.shutdown().unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], earlier);
}

#[test]
fn transient_read_failures_are_retried() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let mut session = ScriptedSession::with_devices(1, &[0]);
    session.imu.push_back(Err(SessionError::ReadError("timeout".to_string())));
    session.imu.push_back(Err(SessionError::ReadError("timeout".to_string())));
    session.push_sample([0.0; 3], [1.0, 1.0, 1.0], 0x100);

    let mut config = test_config(&path, Some(1));
    config.max_attempts = 3;
    let mut poller = start_with_console(session, &config, Vec::new()).unwrap();
    let summary = poller.run().unwrap();
    assert_eq!(summary.samples, 1);
    assert_eq!(summary.presses, 1);
}

#[test]
fn exhausted_retries_end_the_loop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let mut session = ScriptedSession::with_devices(1, &[0]);
    for _ in 0..3 {
        session.imu.push_back(Err(SessionError::DeviceError("unplugged".to_string())));
    }
    let disconnects = session.disconnect_counter();

    let mut config = test_config(&path, None);
    config.max_attempts = 3;
    let mut poller = start_with_console(session, &config, Vec::new()).unwrap();
    let err = poller.run().unwrap_err();
    assert!(matches!(err, RuntimeError::Device(SessionError::DeviceError(_))));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(poller.summary().samples, 0);

    drop(poller);
    assert_eq!(disconnects.get(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap(), "");
}

#[test]
fn raised_stop_flag_ends_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let session = ScriptedSession::with_devices(1, &[0]);
    let config = test_config(&path, None);
    let mut poller = start_with_console(session, &config, Vec::new()).unwrap();

    poller.step().unwrap();
    poller.stop_handle().store(true, Ordering::SeqCst);
    let summary = poller.run().unwrap();
    assert_eq!(summary.samples, 1);
}

#[test]
fn shutdown_releases_session_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let session = ScriptedSession::with_devices(1, &[0]);
    let disconnects = session.disconnect_counter();
    let config = test_config(&path, Some(2));
    let mut poller = start_with_console(session, &config, Vec::new()).unwrap();

    poller.run().unwrap();
    let summary = poller.shutdown().unwrap();
    assert_eq!(summary.samples, 2);
    assert_eq!(disconnects.get(), 1);
    assert_eq!(fs::read_to_string(&path).unwrap().lines().count(), 2);
}

/// Log writer that fails a scripted number of writes. With `tear` set, the
/// first failure is preceded by a write that only takes half the buffer.
struct FlakySink {
    data: Vec<u8>,
    failures_left: usize,
    tear: bool,
}

impl FlakySink {
    fn new(failures: usize, tear: bool) -> Self {
        FlakySink {
            data: Vec::new(),
            failures_left: failures,
            tear,
        }
    }
}

impl Write for FlakySink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.tear {
            self.tear = false;
            let half = buf.len() / 2;
            self.data.extend_from_slice(&buf[..half]);
            return Ok(half);
        }
        if self.failures_left > 0 {
            self.failures_left -= 1;
            return Err(io::Error::new(io::ErrorKind::Other, "device busy"));
        }
        self.data.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn flaky_loop(
    sink: FlakySink,
    samples: u64,
    max_attempts: u32,
) -> PollLoop<ScriptedSession, FlakySink, Vec<u8>> {
    let mut session = ScriptedSession::with_devices(1, &[5]);
    for i in 0..samples {
        session.push_sample([0.0, 0.0, 1.0], [i as f32, 0.0, 0.0], 0);
    }
    let mut config = test_config(std::path::Path::new("unused.json"), Some(samples));
    config.max_attempts = max_attempts;
    PollLoop::new(
        SessionGuard::new(session),
        SampleLogger::new(sink),
        Vec::new(),
        5,
        &config,
    )
    .with_clock(fixed_clock)
}

#[test]
fn failed_append_is_retried_until_it_lands() {
    let mut poller = flaky_loop(FlakySink::new(2, false), 2, 3);
    let summary = poller.run().unwrap();
    assert_eq!(summary.samples, 2);

    let logger = poller.logger().unwrap();
    assert_eq!(logger.records(), 2);
    let outcome = read_records(logger.get_ref().unwrap().data.as_slice()).unwrap();
    assert!(outcome.bad_lines.is_empty());
    let gyro_x: Vec<f32> = outcome.records.iter().map(|r| r.gyro[0]).collect();
    assert_eq!(gyro_x, vec![0.0, 1.0]);
}

#[test]
fn torn_append_resumes_without_corrupting_the_line() {
    let mut poller = flaky_loop(FlakySink::new(1, true), 1, 2);
    poller.run().unwrap();

    let data = &poller.logger().unwrap().get_ref().unwrap().data;
    let outcome = read_records(data.as_slice()).unwrap();
    assert!(outcome.bad_lines.is_empty());
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].timestamp, fixed_clock());
}

#[test]
fn persistent_append_failure_ends_the_loop() {
    let mut poller = flaky_loop(FlakySink::new(usize::MAX, false), 1, 3);
    let err = poller.run().unwrap_err();
    assert!(matches!(err, RuntimeError::Write(_)));
    assert_eq!(err.exit_code(), 2);
    assert_eq!(poller.summary().samples, 0);
    assert!(poller.console().is_empty());
    assert_eq!(poller.logger().unwrap().records(), 0);
}

#[test]
fn disabled_log_mode_never_creates_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("imu_log.json");

    let mut session = ScriptedSession::with_devices(1, &[0]);
    session.push_sample([0.0; 3], [0.5, 0.25, 0.125], 0x100);

    let mut config = test_config(&path, Some(1));
    config.log_mode = LogMode::Disabled;
    let mut poller = start_with_console(session, &config, Vec::new()).unwrap();
    assert!(poller.logger().is_none());

    let summary = poller.run().unwrap();
    assert_eq!(summary.samples, 1);
    assert_eq!(
        console_lines(poller.console()),
        vec![
            "Orientation (gyro): X=0.500 Y=0.250 Z=0.125".to_string(),
            "*** Button pressed: A ***".to_string(),
        ]
    );
    poller.shutdown().unwrap();
    assert!(!path.exists());
}
