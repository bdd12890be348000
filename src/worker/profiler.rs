//! Periodic statistics sampler sharing the capture worker's control pattern.
//!
//! Instead of reading frames, each iteration sleeps for the control block's
//! `sleep_interval` and then turns the difference between two
//! [`CaptureStats`] snapshots into a [`StatSample`]. The sleep is the
//! interruptible kind: shutdown latency is bounded by the signaling
//! primitive, not the sampling period.

use super::{StateCell, WorkerCore, WorkerState};
use crate::control::{Directive, WorkerControlBlock};
use crate::error::WorkerError;
use crate::sink::StatSink;
use crate::stats::{CaptureStats, StatSample};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// How often a paused profiler re-checks its control block.
const PAUSE_RECHECK: Duration = Duration::from_millis(500);

/// Handle to a running profiler thread.
pub struct ProfilerWorker {
    core: WorkerCore,
}

impl ProfilerWorker {
    /// Launch the profiler thread over the capture worker's stats. The sink
    /// is optional; without one, samples only go to `tracing`.
    pub fn spawn(
        stats: Arc<CaptureStats>,
        sink: Option<Box<dyn StatSink>>,
        control: Arc<WorkerControlBlock>,
    ) -> Result<Self, WorkerError> {
        let state = Arc::new(StateCell::new());

        let thread_control = control.clone();
        let thread_state = state.clone();
        let handle = thread::Builder::new()
            .name("profiler".into())
            .spawn(move || run(stats, sink, thread_control, thread_state))
            .map_err(|e| WorkerError::Spawn("profiler", e))?;

        Ok(Self {
            core: WorkerCore::new(control, state, handle, "profiler"),
        })
    }

    pub fn control(&self) -> &Arc<WorkerControlBlock> {
        &self.core.control
    }

    pub fn state(&self) -> WorkerState {
        self.core.state.get()
    }

    /// Terminate-then-join. Consumes the worker.
    pub fn shutdown(mut self) -> Result<(), WorkerError> {
        self.core.shutdown_inner()
    }
}

fn run(
    stats: Arc<CaptureStats>,
    sink: Option<Box<dyn StatSink>>,
    control: Arc<WorkerControlBlock>,
    state: Arc<StateCell>,
) {
    state.set(WorkerState::Running);
    tracing::debug!("profiler worker running");

    let mut last_snapshot = stats.snapshot();
    let mut last_at = Instant::now();

    loop {
        if control.interruptible_sleep(control.sleep_interval()) == Directive::Stop {
            break;
        }
        match control.consult() {
            Directive::Stop => break,
            Directive::Pause => {
                state.set(WorkerState::Paused);
                tracing::debug!("profiler paused");
                if control.await_resume(PAUSE_RECHECK) == Directive::Stop {
                    break;
                }
                state.set(WorkerState::Running);
                tracing::debug!("profiler resumed");
                // Restart the interval so the pause is not counted as
                // capture inactivity.
                last_snapshot = stats.snapshot();
                last_at = Instant::now();
                continue;
            }
            Directive::Proceed => {}
        }

        let now = Instant::now();
        let snapshot = stats.snapshot();
        let sample = StatSample::between(last_snapshot, snapshot, now - last_at);
        tracing::debug!(
            frames = sample.frames,
            fps = sample.fps,
            errors = sample.errors,
            "capture statistics"
        );
        if let Some(sink) = &sink {
            sink.record_stat(sample);
        }
        last_snapshot = snapshot;
        last_at = now;
    }

    state.set(WorkerState::Stopping);
    state.set(WorkerState::Stopped);
    tracing::debug!("profiler worker exited");
}
