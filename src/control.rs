//! Shared control block through which a controller drives a worker.
//!
//! A controller holds an `Arc<WorkerControlBlock>` and issues pause, resume,
//! and terminate requests; the worker consults the same block between frames
//! or samples. All state lives behind one [`ConditionSignal`], so a flag
//! write and the notification that announces it form a single critical
//! section and a waiting worker cannot miss them.

use crate::signal::ConditionSignal;
use std::time::Duration;

/// What a worker should do after consulting its control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    /// Keep working.
    Proceed,
    /// Park at the pause point until resumed or terminated.
    Pause,
    /// Exit the work loop. Terminal.
    Stop,
}

#[derive(Debug, Clone)]
struct ControlState {
    paused: bool,
    terminated: bool,
    sleep_interval: Duration,
}

/// Per-worker control state: pause/terminate flags plus the profiler sampling
/// period, all guarded by the worker's [`ConditionSignal`].
///
/// Constructed before the worker thread starts and kept alive (via `Arc`)
/// until the thread has been joined. `terminated` transitions false→true
/// exactly once and never back.
#[derive(Debug)]
pub struct WorkerControlBlock {
    signal: ConditionSignal<ControlState>,
}

impl WorkerControlBlock {
    pub fn new(sleep_interval: Duration) -> Self {
        Self {
            signal: ConditionSignal::new(ControlState {
                paused: false,
                terminated: false,
                sleep_interval,
            }),
        }
    }

    /// Request that the worker idle (or resume, with `false`). Idempotent;
    /// repeating the same value is a harmless duplicate notify.
    pub fn request_pause(&self, paused: bool) {
        self.signal.update(|s| s.paused = paused);
    }

    /// Request that the worker exit its loop. Terminal and idempotent; wakes a
    /// worker currently parked at its pause point, overriding the pause.
    pub fn request_terminate(&self) {
        self.signal.update(|s| s.terminated = true);
    }

    pub fn is_paused(&self) -> bool {
        self.signal.read(|s| s.paused)
    }

    pub fn is_terminated(&self) -> bool {
        self.signal.read(|s| s.terminated)
    }

    pub fn sleep_interval(&self) -> Duration {
        self.signal.read(|s| s.sleep_interval)
    }

    /// Retune the profiler sampling period. Takes effect from the next sleep.
    pub fn set_sleep_interval(&self, interval: Duration) {
        self.signal.update(|s| s.sleep_interval = interval);
    }

    /// Worker-side flag check. Terminate takes priority over pause: with both
    /// flags set this returns [`Directive::Stop`], never `Pause`.
    pub fn consult(&self) -> Directive {
        self.signal.read(|s| {
            if s.terminated {
                Directive::Stop
            } else if s.paused {
                Directive::Pause
            } else {
                Directive::Proceed
            }
        })
    }

    /// Block until the pause is lifted or a terminate arrives. Waits in
    /// `recheck`-sized slices so a worker never sleeps unboundedly on a single
    /// wait; a late or duplicate notify only causes a re-check. Never returns
    /// [`Directive::Pause`].
    pub fn await_resume(&self, recheck: Duration) -> Directive {
        loop {
            let (state, _) = self
                .signal
                .wait_while_timeout(recheck, |s| s.paused && !s.terminated);
            if state.terminated {
                return Directive::Stop;
            }
            if !state.paused {
                return Directive::Proceed;
            }
            // Recheck slice expired with the pause still in force; wait again.
        }
    }

    /// Sleep for `duration`, waking early if a terminate or pause request
    /// arrives. Returns [`Directive::Stop`] once terminated; a pause cutting
    /// the sleep short returns `Proceed` and is handled at the next
    /// [`consult`](Self::consult).
    pub fn interruptible_sleep(&self, duration: Duration) -> Directive {
        let (state, _) = self
            .signal
            .wait_while_timeout(duration, |s| !s.terminated && !s.paused);
        if state.terminated {
            Directive::Stop
        } else {
            Directive::Proceed
        }
    }
}
