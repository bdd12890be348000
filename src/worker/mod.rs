//! Worker thread lifecycle shared by the capture and profiler loops.
//!
//! Each worker owns exactly one OS thread. The controller holds the only
//! handle; shutdown is always terminate-then-join, never detach. A worker is
//! not restartable after termination; a new session constructs a new worker.

mod capture;
mod profiler;

pub use capture::{CaptureConfig, CaptureWorker};
pub use profiler::ProfilerWorker;

use crate::control::WorkerControlBlock;
use crate::error::WorkerError;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// Thread launched, collaborators being initialized
    Starting,
    /// Work loop iterating
    Running,
    /// Parked at the pause point, waiting for resume or terminate
    Paused,
    /// Terminate observed, releasing collaborators
    Stopping,
    /// Loop returned; the thread is finished. Terminal.
    Stopped,
}

/// State cell shared between a worker thread and its handle.
#[derive(Debug)]
pub(crate) struct StateCell {
    state: AtomicU8,
}

impl StateCell {
    pub(crate) fn new() -> Self {
        Self {
            state: AtomicU8::new(WorkerState::Starting as u8),
        }
    }

    pub(crate) fn get(&self) -> WorkerState {
        match self.state.load(Ordering::Acquire) {
            0 => WorkerState::Starting,
            1 => WorkerState::Running,
            2 => WorkerState::Paused,
            3 => WorkerState::Stopping,
            _ => WorkerState::Stopped,
        }
    }

    pub(crate) fn set(&self, state: WorkerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Thread handle, control block, and state cell common to both workers.
pub(crate) struct WorkerCore {
    pub(crate) control: Arc<WorkerControlBlock>,
    pub(crate) state: Arc<StateCell>,
    handle: Option<JoinHandle<()>>,
    name: &'static str,
}

impl WorkerCore {
    pub(crate) fn new(
        control: Arc<WorkerControlBlock>,
        state: Arc<StateCell>,
        handle: JoinHandle<()>,
        name: &'static str,
    ) -> Self {
        Self {
            control,
            state,
            handle: Some(handle),
            name,
        }
    }

    /// Terminate-then-join. Idempotent on the handle: the second call (or the
    /// Drop after an explicit shutdown) finds no thread left to join.
    pub(crate) fn shutdown_inner(&mut self) -> Result<(), WorkerError> {
        self.control.request_terminate();
        if let Some(handle) = self.handle.take() {
            handle
                .join()
                .map_err(|_| WorkerError::Panicked(self.name))?;
        }
        Ok(())
    }
}

impl Drop for WorkerCore {
    fn drop(&mut self) {
        if self.shutdown_inner().is_err() {
            tracing::error!("{} worker panicked before join", self.name);
        }
    }
}
