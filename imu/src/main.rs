use clap::Parser;
use imu_logger::{start, Config, JoyconSession, LogMode};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

//* run by `cargo run --bin imu-logger -- --help` */

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();

    let mut poller = match start(JoyconSession::new(), &config) {
        Ok(p) => p,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(e.exit_code());
        }
    };

    let stop = poller.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst)) {
        warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let outcome = poller.run();
    let closed = poller.shutdown();
    if config.log_mode == LogMode::Samples {
        info!("Log saved to: {}", config.log_path.display());
    }

    match outcome.and(closed) {
        Ok(summary) => {
            info!(
                "Logging stopped after {} sample(s), {} button press(es)",
                summary.samples, summary.presses
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}
