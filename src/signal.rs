//! Condition-variable signaling primitive shared by all workers.
//!
//! A [`ConditionSignal`] bundles a mutex, a condition variable, and the guarded
//! payload they protect. Every write bumps a version counter and wakes all
//! waiters, and every wait re-checks the guarded state under the lock before
//! deciding to block, so a notification issued before a wait begins is never
//! missed and spurious wakeups are absorbed.

use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Slot<T> {
    value: T,
    /// Incremented on every write; lets change-waits distinguish a real
    /// notification from a spurious wakeup.
    version: u64,
}

/// A single-slot, thread-safe signal: guarded payload plus condition variable.
///
/// The payload is only ever read or written while the mutex is held, and the
/// condition variable is only waited on under that same mutex.
#[derive(Debug)]
pub struct ConditionSignal<T> {
    slot: Mutex<Slot<T>>,
    condvar: Condvar,
}

impl<T: Clone> ConditionSignal<T> {
    pub fn new(initial: T) -> Self {
        Self {
            slot: Mutex::new(Slot {
                value: initial,
                version: 0,
            }),
            condvar: Condvar::new(),
        }
    }

    /// Store a new value and wake every waiter.
    pub fn notify(&self, value: T) {
        let mut slot = self.slot.lock();
        slot.value = value;
        slot.version += 1;
        self.condvar.notify_all();
    }

    /// Mutate the value in place, then wake every waiter. The mutation and the
    /// notification happen in one critical section.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut slot = self.slot.lock();
        f(&mut slot.value);
        slot.version += 1;
        self.condvar.notify_all();
    }

    /// Guarded read of the current value.
    pub fn get(&self) -> T {
        self.slot.lock().value.clone()
    }

    /// Guarded read without cloning the whole payload.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.slot.lock().value)
    }

    /// Block until the slot is written again after this call has taken the
    /// lock. Returns the value stored by the write that woke us.
    pub fn wait_for_change(&self) -> T {
        let mut slot = self.slot.lock();
        let entered_at = slot.version;
        while slot.version == entered_at {
            self.condvar.wait(&mut slot);
        }
        slot.value.clone()
    }

    /// Bounded [`wait_for_change`](Self::wait_for_change); `None` if the
    /// deadline passes without a write.
    pub fn wait_for_change_timeout(&self, timeout: Duration) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        let entered_at = slot.version;
        while slot.version == entered_at {
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let timed_out = self.condvar.wait_for(&mut slot, deadline - now).timed_out();
            if timed_out && slot.version == entered_at {
                return None;
            }
        }
        Some(slot.value.clone())
    }

    /// Block while `pred` holds. The predicate is tested under the lock before
    /// the first wait, so a write that already happened is observed, not missed.
    pub fn wait_while(&self, mut pred: impl FnMut(&T) -> bool) -> T {
        let mut slot = self.slot.lock();
        while pred(&slot.value) {
            self.condvar.wait(&mut slot);
        }
        slot.value.clone()
    }

    /// Bounded [`wait_while`](Self::wait_while). Returns the value seen last
    /// and whether the predicate cleared; `false` means the deadline passed
    /// while the predicate still held.
    pub fn wait_while_timeout(
        &self,
        timeout: Duration,
        mut pred: impl FnMut(&T) -> bool,
    ) -> (T, bool) {
        let deadline = Instant::now() + timeout;
        let mut slot = self.slot.lock();
        while pred(&slot.value) {
            let now = Instant::now();
            if now >= deadline {
                return (slot.value.clone(), false);
            }
            let timed_out = self.condvar.wait_for(&mut slot, deadline - now).timed_out();
            if timed_out && pred(&slot.value) {
                return (slot.value.clone(), false);
            }
        }
        (slot.value.clone(), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn notify_before_wait_is_observed() {
        let signal = ConditionSignal::new(0);
        signal.notify(1);
        // The predicate already fails under the lock; no blocking happens.
        let value = signal.wait_while(|v| *v == 0);
        assert_eq!(value, 1);
    }

    #[test]
    fn wait_for_change_wakes_on_notify() {
        let signal = Arc::new(ConditionSignal::new(0));
        let notifier = {
            let signal = signal.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                signal.notify(7);
            })
        };
        assert_eq!(signal.wait_for_change(), 7);
        notifier.join().unwrap();
    }

    #[test]
    fn wait_for_change_timeout_expires() {
        let signal = ConditionSignal::new(0);
        assert_eq!(
            signal.wait_for_change_timeout(Duration::from_millis(50)),
            None
        );
    }

    #[test]
    fn wait_while_timeout_reports_expiry() {
        let signal = ConditionSignal::new(0);
        let (value, cleared) =
            signal.wait_while_timeout(Duration::from_millis(50), |v| *v == 0);
        assert_eq!(value, 0);
        assert!(!cleared);
    }

    #[test]
    fn update_mutates_and_wakes() {
        let signal = Arc::new(ConditionSignal::new(vec![1u8]));
        let waiter = {
            let signal = signal.clone();
            thread::spawn(move || signal.wait_while(|v| v.len() < 2))
        };
        thread::sleep(Duration::from_millis(20));
        signal.update(|v| v.push(2));
        assert_eq!(waiter.join().unwrap(), vec![1, 2]);
    }
}
