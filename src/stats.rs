//! Capture statistics shared between the capture worker and the profiler.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Counters maintained by the capture worker, sampled by the profiler.
#[derive(Debug, Default)]
pub struct CaptureStats {
    /// Frames read from the device and handed to the sink
    frames_captured: AtomicU64,
    /// Device reads that timed out with no frame available
    frames_empty: AtomicU64,
    /// Device open/read failures
    device_errors: AtomicU64,
    /// Number of pause intervals the worker sat through
    pause_count: AtomicU64,
    /// Total time spent paused (in microseconds)
    paused_total_us: AtomicU64,
}

impl CaptureStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_frame(&self) {
        self.frames_captured.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_empty_read(&self) {
        self.frames_empty.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_device_error(&self) {
        self.device_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pause(&self, duration: Duration) {
        self.pause_count.fetch_add(1, Ordering::Relaxed);
        self.paused_total_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    /// Consistent-enough point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatSnapshot {
        StatSnapshot {
            frames_captured: self.frames_captured.load(Ordering::Relaxed),
            frames_empty: self.frames_empty.load(Ordering::Relaxed),
            device_errors: self.device_errors.load(Ordering::Relaxed),
            pause_count: self.pause_count.load(Ordering::Relaxed),
            paused_total_us: self.paused_total_us.load(Ordering::Relaxed),
        }
    }
}

/// Plain-value copy of [`CaptureStats`] at one instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatSnapshot {
    pub frames_captured: u64,
    pub frames_empty: u64,
    pub device_errors: u64,
    pub pause_count: u64,
    pub paused_total_us: u64,
}

/// One profiler emission: activity between two snapshots.
#[derive(Debug, Clone, Copy)]
pub struct StatSample {
    /// Frames captured during the interval
    pub frames: u64,
    /// Device errors during the interval
    pub errors: u64,
    /// Wall-clock length of the interval
    pub interval: Duration,
    /// Capture rate over the interval
    pub fps: f64,
    /// Cumulative counters at the end of the interval
    pub totals: StatSnapshot,
}

impl StatSample {
    pub fn between(prev: StatSnapshot, current: StatSnapshot, interval: Duration) -> Self {
        let frames = current.frames_captured.saturating_sub(prev.frames_captured);
        let errors = current.device_errors.saturating_sub(prev.device_errors);
        let secs = interval.as_secs_f64();
        let fps = if secs > 0.0 { frames as f64 / secs } else { 0.0 };
        Self {
            frames,
            errors,
            interval,
            fps,
            totals: current,
        }
    }
}
