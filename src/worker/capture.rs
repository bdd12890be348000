//! The frame-producing worker thread.
//!
//! State machine: `Starting → Running ⇄ Paused → Stopping → Stopped`. The
//! loop reads one frame with a bounded timeout, hands it to the sink, then
//! consults the control block. Terminate always beats pause: once observed,
//! the worker exits and never re-enters the paused wait. A device failure is
//! logged, counted, and drives the worker straight to `Stopping`; retry
//! policy, if any, belongs to the device collaborator.

use super::{StateCell, WorkerCore, WorkerState};
use crate::control::{Directive, WorkerControlBlock};
use crate::device::{CaptureDevice, ReadOutcome};
use crate::error::WorkerError;
use crate::sink::FrameSink;
use crate::stats::CaptureStats;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Upper bound on a single device read; caps termination latency while a
    /// frame is awaited.
    pub read_timeout: Duration,
    /// How often a paused worker re-checks its control block even without a
    /// notification.
    pub recheck_interval: Duration,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            read_timeout: Duration::from_millis(100),
            recheck_interval: Duration::from_millis(500),
        }
    }
}

/// Handle to a running capture thread. The handle is the only owner of the
/// thread; dropping it terminates and joins.
pub struct CaptureWorker {
    core: WorkerCore,
    stats: Arc<CaptureStats>,
}

impl CaptureWorker {
    /// Launch the capture thread. The device and sink move into the thread;
    /// the worker alone opens, reads, and closes the device.
    pub fn spawn<D, S>(
        device: D,
        sink: S,
        config: CaptureConfig,
        control: Arc<WorkerControlBlock>,
    ) -> Result<Self, WorkerError>
    where
        D: CaptureDevice + 'static,
        S: FrameSink + 'static,
    {
        let state = Arc::new(StateCell::new());
        let stats = Arc::new(CaptureStats::new());

        let thread_control = control.clone();
        let thread_state = state.clone();
        let thread_stats = stats.clone();
        let handle = thread::Builder::new()
            .name("capture".into())
            .spawn(move || run(device, sink, config, thread_control, thread_state, thread_stats))
            .map_err(|e| WorkerError::Spawn("capture", e))?;

        Ok(Self {
            core: WorkerCore::new(control, state, handle, "capture"),
            stats,
        })
    }

    pub fn control(&self) -> &Arc<WorkerControlBlock> {
        &self.core.control
    }

    pub fn state(&self) -> WorkerState {
        self.core.state.get()
    }

    pub fn stats(&self) -> &Arc<CaptureStats> {
        &self.stats
    }

    /// Terminate-then-join. Consumes the worker; a new capture session needs
    /// a new worker.
    pub fn shutdown(mut self) -> Result<(), WorkerError> {
        self.core.shutdown_inner()
    }
}

fn run<D: CaptureDevice, S: FrameSink>(
    mut device: D,
    sink: S,
    config: CaptureConfig,
    control: Arc<WorkerControlBlock>,
    state: Arc<StateCell>,
    stats: Arc<CaptureStats>,
) {
    if let Err(e) = device.open() {
        tracing::error!("capture device open failed: {e}");
        stats.record_device_error();
        state.set(WorkerState::Stopping);
        state.set(WorkerState::Stopped);
        return;
    }
    state.set(WorkerState::Running);
    tracing::debug!("capture worker running");

    loop {
        match control.consult() {
            Directive::Stop => break,
            Directive::Pause => {
                state.set(WorkerState::Paused);
                tracing::debug!("capture paused");
                let paused_at = Instant::now();
                let directive = control.await_resume(config.recheck_interval);
                stats.record_pause(paused_at.elapsed());
                if directive == Directive::Stop {
                    break;
                }
                state.set(WorkerState::Running);
                tracing::debug!("capture resumed");
                continue;
            }
            Directive::Proceed => {}
        }

        match device.read_frame(config.read_timeout) {
            Ok(ReadOutcome::Frame(frame)) => {
                stats.record_frame();
                sink.accept(frame);
            }
            Ok(ReadOutcome::Empty) => {
                stats.record_empty_read();
            }
            Err(e) => {
                tracing::error!("capture read failed, stopping: {e}");
                stats.record_device_error();
                break;
            }
        }
    }

    state.set(WorkerState::Stopping);
    device.close();
    state.set(WorkerState::Stopped);
    tracing::debug!("capture worker exited");
}
