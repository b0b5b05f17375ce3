//! Startup checks and the sampling loop.

use crate::buttons::{detect_presses, press_line};
use crate::config::{Config, LogMode};
use crate::error::{RuntimeError, StartupError};
use crate::record::{unix_millis, LogRecord};
use crate::retry::RetryPolicy;
use crate::session::SessionGuard;
use crate::sink::{encode_line, SampleLogger};
use controller_traits::{ButtonMask, DeviceHandle, DeviceSession, Vector3};
use std::fs::File;
use std::io::{self, Stdout, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Most handles requested from the session; only the first is polled.
pub const MAX_HANDLES: usize = 16;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub samples: u64,
    pub presses: u64,
}

pub fn orientation_line(gyro: &Vector3) -> String {
    format!(
        "Orientation (gyro): X={:.3} Y={:.3} Z={:.3}",
        gyro.x, gyro.y, gyro.z
    )
}

/// Connects the session and opens the sink, printing to stdout.
pub fn start<S: DeviceSession>(
    session: S,
    config: &Config,
) -> Result<PollLoop<S, File, Stdout>, StartupError> {
    start_with_console(session, config, io::stdout())
}

/// Connects the session, picks the first handle and only then opens the
/// log, so a missing controller never touches the log file. The session
/// is released on every failure after it was handed over. With
/// [`LogMode::Disabled`] the log is never opened.
pub fn start_with_console<S: DeviceSession, O: Write>(
    session: S,
    config: &Config,
    console: O,
) -> Result<PollLoop<S, File, O>, StartupError> {
    let mut session = SessionGuard::new(session);

    let connected = session.connect()?;
    if connected == 0 {
        return Err(StartupError::NoDevices);
    }
    info!("{} controller(s) connected", connected);

    let handles = session.list_handles(MAX_HANDLES);
    let handle = *handles.first().ok_or(StartupError::NoHandles)?;
    debug!("Enumerated handles {:?}, using {}", handles, handle);

    if config.log_mode == LogMode::Disabled {
        info!("Sample log disabled, console output only");
        return Ok(PollLoop::console_only(session, console, handle, config));
    }

    let logger = SampleLogger::open(&config.log_path)?;
    info!("Appending samples to {}", config.log_path.display());

    Ok(PollLoop::new(session, logger, console, handle, config))
}

pub struct PollLoop<S: DeviceSession, W: Write = File, O: Write = Stdout> {
    session: SessionGuard<S>,
    logger: Option<SampleLogger<W>>,
    console: O,
    handle: DeviceHandle,
    previous_buttons: ButtonMask,
    interval: Duration,
    retry: RetryPolicy,
    max_samples: Option<u64>,
    stop: Arc<AtomicBool>,
    clock: fn() -> i64,
    summary: RunSummary,
}

impl<S: DeviceSession, O: Write> PollLoop<S, File, O> {
    /// A loop that only prints; nothing is persisted.
    pub fn console_only(
        session: SessionGuard<S>,
        console: O,
        handle: DeviceHandle,
        config: &Config,
    ) -> Self {
        Self::build(session, None, console, handle, config)
    }
}

impl<S: DeviceSession, W: Write, O: Write> PollLoop<S, W, O> {
    pub fn new(
        session: SessionGuard<S>,
        logger: SampleLogger<W>,
        console: O,
        handle: DeviceHandle,
        config: &Config,
    ) -> Self {
        Self::build(session, Some(logger), console, handle, config)
    }

    fn build(
        session: SessionGuard<S>,
        logger: Option<SampleLogger<W>>,
        console: O,
        handle: DeviceHandle,
        config: &Config,
    ) -> Self {
        PollLoop {
            session,
            logger,
            console,
            handle,
            previous_buttons: ButtonMask::empty(),
            interval: config.interval(),
            retry: config.retry_policy(),
            max_samples: config.samples,
            stop: Arc::new(AtomicBool::new(false)),
            clock: unix_millis,
            summary: RunSummary::default(),
        }
    }

    /// Replaces the wall clock, in milliseconds since the epoch.
    pub fn with_clock(mut self, clock: fn() -> i64) -> Self {
        self.clock = clock;
        self
    }

    /// Flag that ends [`PollLoop::run`] after the current iteration once set.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn handle(&self) -> DeviceHandle {
        self.handle
    }

    pub fn previous_buttons(&self) -> ButtonMask {
        self.previous_buttons
    }

    pub fn summary(&self) -> RunSummary {
        self.summary
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn logger(&self) -> Option<&SampleLogger<W>> {
        self.logger.as_ref()
    }

    pub fn console(&self) -> &O {
        &self.console
    }

    /// One poll: read, stamp, append, print, detect presses.
    pub fn step(&mut self) -> Result<(), RuntimeError> {
        let handle = self.handle;
        let session = &mut self.session;
        let imu = self.retry.run("IMU read", || session.read_imu(handle))?;
        let buttons = self.retry.run("Button read", || session.read_buttons(handle))?;

        if let Some(logger) = self.logger.as_mut() {
            let record = LogRecord::new((self.clock)(), &imu, buttons);
            let line = encode_line(&record)?;
            self.retry.run("Log append", || logger.write_line(&line))?;
        }

        writeln!(self.console, "{}", orientation_line(&imu.gyro)).map_err(RuntimeError::Console)?;
        for name in detect_presses(self.previous_buttons, buttons) {
            writeln!(self.console, "{}", press_line(name)).map_err(RuntimeError::Console)?;
            self.summary.presses += 1;
        }

        self.previous_buttons = buttons;
        self.summary.samples += 1;
        Ok(())
    }

    /// Polls until the stop flag is raised or the sample limit is reached.
    /// A runtime failure that outlives its retries ends the loop with that
    /// error; resources are released when the loop is dropped.
    pub fn run(&mut self) -> Result<RunSummary, RuntimeError> {
        info!("Polling handle {} (interval {:?})", self.handle, self.interval);
        while !self.stop.load(Ordering::SeqCst) {
            if let Some(limit) = self.max_samples {
                if self.summary.samples >= limit {
                    info!("Sample limit of {} reached", limit);
                    break;
                }
            }

            self.step()?;

            if !self.interval.is_zero() {
                thread::sleep(self.interval);
            }
        }
        Ok(self.summary)
    }

    /// Flushes and closes the log, then disconnects the controller.
    pub fn shutdown(mut self) -> Result<RunSummary, RuntimeError> {
        let flushed = match self.logger.as_mut() {
            Some(logger) => logger.finish().map(|_| ()),
            None => Ok(()),
        };
        self.session.release();
        flushed?;
        Ok(self.summary)
    }
}
