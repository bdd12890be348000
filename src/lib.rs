//! Controllable background capture workers.
//!
//! `capstan` implements the "pausable, terminable worker" pattern behind a
//! video-capture pipeline: a capture thread pulling frames from a device
//! collaborator and a profiler thread sampling its statistics, both driven by
//! a controller through a shared, condition-variable-guarded control block.
//!
//! The GUI, the actual V4L2 capture mechanics, and configuration parsing are
//! external collaborators; this crate owns only the coordination core.

use clap::Parser;
use std::process::ExitCode;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub mod control;
pub mod device;
pub mod error;
pub mod signal;
pub mod sink;
pub mod stats;
pub mod worker;

pub use control::{Directive, WorkerControlBlock};
pub use device::{CaptureDevice, Frame, ReadOutcome, TestPatternDevice};
pub use error::{DeviceError, WorkerError};
pub use signal::ConditionSignal;
pub use sink::{FrameSink, StatSink};
pub use stats::{CaptureStats, StatSample, StatSnapshot};
pub use worker::{CaptureConfig, CaptureWorker, ProfilerWorker, WorkerState};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Demo driver for the capstan capture worker core"
)]
pub struct Args {
    /// Synthetic source frame rate
    #[arg(long, default_value_t = 30)]
    pub fps: u32,

    /// How long to run the session, in seconds
    #[arg(long, value_name = "SECONDS", default_value_t = 5)]
    pub duration: u64,

    /// Profiler sampling period, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 1000)]
    pub profile_interval: u64,

    /// Pause and resume the capture worker partway through the run
    #[arg(long)]
    pub exercise_pause: bool,
}

pub fn run_cli() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    match run_session(&args) {
        Ok(report) => {
            println!(
                "captured {} frames ({} empty reads, {} device errors), {} pauses, {} profiler samples",
                report.totals.frames_captured,
                report.totals.frames_empty,
                report.totals.device_errors,
                report.totals.pause_count,
                report.samples,
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

struct SessionReport {
    totals: StatSnapshot,
    samples: usize,
}

/// Wire a synthetic device to a counting sink, attach a profiler, optionally
/// exercise a pause window, then terminate-then-join everything.
fn run_session(args: &Args) -> Result<SessionReport, WorkerError> {
    let profile_interval = Duration::from_millis(args.profile_interval.max(1));

    let capture_control = Arc::new(WorkerControlBlock::new(profile_interval));
    let profiler_control = Arc::new(WorkerControlBlock::new(profile_interval));

    let (frame_tx, frame_rx) = mpsc::channel::<Frame>();
    let device = TestPatternDevice::new(args.fps, 4096);
    let capture = CaptureWorker::spawn(
        device,
        frame_tx,
        CaptureConfig::default(),
        capture_control.clone(),
    )?;

    let (stat_tx, stat_rx) = mpsc::channel::<StatSample>();
    let profiler = ProfilerWorker::spawn(
        capture.stats().clone(),
        Some(Box::new(stat_tx)),
        profiler_control,
    )?;

    // Drain frames on a consumer thread; it exits when the capture worker
    // drops its sender.
    let consumer = thread::spawn(move || {
        let mut received = 0u64;
        while frame_rx.recv().is_ok() {
            received += 1;
        }
        received
    });

    let run_for = Duration::from_secs(args.duration);
    if args.exercise_pause {
        thread::sleep(run_for / 3);
        tracing::info!("pausing capture");
        capture_control.request_pause(true);
        thread::sleep(run_for / 3);
        tracing::info!("resuming capture");
        capture_control.request_pause(false);
        thread::sleep(run_for / 3);
    } else {
        thread::sleep(run_for);
    }

    let stats = capture.stats().clone();
    capture.shutdown()?;
    profiler.shutdown()?;

    let received = consumer
        .join()
        .map_err(|_| WorkerError::Panicked("consumer"))?;
    tracing::info!("consumer drained {received} frames");

    Ok(SessionReport {
        totals: stats.snapshot(),
        samples: stat_rx.try_iter().count(),
    })
}
