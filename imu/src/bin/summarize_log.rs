use clap::Parser;
use imu_logger::{detect_presses, read_records, ButtonMask, LogRecord};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use std::process::ExitCode;

/// Summarizes an IMU log written by `imu-logger`.
#[derive(Debug, Parser)]
struct Args {
    /// Path to the newline-delimited JSON log
    log_file: PathBuf,
}

#[derive(Debug, Default)]
struct Summary {
    samples: usize,
    span_ms: i64,
    duplicate_timestamps: usize,
    out_of_order: usize,
    presses: BTreeMap<&'static str, usize>,
}

fn summarize(records: &[LogRecord]) -> Summary {
    let mut summary = Summary {
        samples: records.len(),
        ..Summary::default()
    };
    if let (Some(first), Some(last)) = (records.first(), records.last()) {
        summary.span_ms = last.timestamp - first.timestamp;
    }

    let mut previous = ButtonMask::empty();
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            let before = records[i - 1].timestamp;
            if record.timestamp == before {
                summary.duplicate_timestamps += 1;
            } else if record.timestamp < before {
                summary.out_of_order += 1;
            }
        }
        let current = ButtonMask::from_raw(record.buttons);
        for name in detect_presses(previous, current) {
            *summary.presses.entry(name).or_default() += 1;
        }
        previous = current;
    }
    summary
}

fn main() -> io::Result<ExitCode> {
    let args = Args::parse();
    let outcome = read_records(BufReader::new(File::open(&args.log_file)?))?;

    for bad in &outcome.bad_lines {
        eprintln!("Warning: skipping line {} due to error: {}", bad.line, bad.error);
    }
    if outcome.records.is_empty() {
        println!("No samples found in {}", args.log_file.display());
        return Ok(ExitCode::FAILURE);
    }

    let summary = summarize(&outcome.records);
    let seconds = summary.span_ms as f64 / 1000.0;
    println!("file:        {}", args.log_file.display());
    println!("samples:     {}", summary.samples);
    println!("span:        {:.3} s", seconds);
    if seconds > 0.0 {
        println!("mean rate:   {:.1} Hz", (summary.samples - 1) as f64 / seconds);
    }
    println!("duplicate timestamps: {}", summary.duplicate_timestamps);
    if summary.out_of_order > 0 {
        println!("out of order:         {}", summary.out_of_order);
    }
    for (name, count) in &summary.presses {
        println!("pressed {: <8} {}", name, count);
    }

    Ok(ExitCode::SUCCESS)
}
