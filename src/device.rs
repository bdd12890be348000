//! Device collaborator seam.
//!
//! The capture worker talks to its frame source only through
//! [`CaptureDevice`]; the actual capture mechanics (V4L2 ioctls, camera
//! pipelines) live behind this trait and are out of scope here.
//! [`TestPatternDevice`] is a synthetic source for the demo binary and for
//! development without hardware.

use crate::error::DeviceError;
use std::time::{Duration, Instant};

/// A single captured frame. Owned exclusively by the worker until it is
/// handed off to the sink by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Monotonically increasing per-device frame number
    pub sequence: u64,
    /// Raw frame payload
    pub data: Vec<u8>,
}

/// Result of a bounded device read that did not fail.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    Frame(Frame),
    /// The timeout elapsed with no frame available; not an error.
    Empty,
}

/// Frame-producing collaborator driven by the capture worker. The worker
/// opens the device when starting, reads with a bounded timeout while
/// running, and closes it on the way out.
pub trait CaptureDevice: Send {
    fn open(&mut self) -> Result<(), DeviceError>;

    /// Block up to `timeout` for the next frame.
    fn read_frame(&mut self, timeout: Duration) -> Result<ReadOutcome, DeviceError>;

    fn close(&mut self);
}

/// Synthetic frame source emitting numbered frames at a fixed rate.
pub struct TestPatternDevice {
    frame_interval: Duration,
    frame_size: usize,
    next_sequence: u64,
    next_due: Option<Instant>,
    fail_after: Option<u64>,
    open: bool,
}

impl TestPatternDevice {
    pub fn new(fps: u32, frame_size: usize) -> Self {
        let fps = fps.max(1);
        Self {
            frame_interval: Duration::from_secs(1) / fps,
            frame_size,
            next_sequence: 0,
            next_due: None,
            fail_after: None,
            open: false,
        }
    }

    /// Report a disconnect after `count` frames; for exercising the error path.
    pub fn fail_after(mut self, count: u64) -> Self {
        self.fail_after = Some(count);
        self
    }
}

impl CaptureDevice for TestPatternDevice {
    fn open(&mut self) -> Result<(), DeviceError> {
        self.open = true;
        self.next_due = Some(Instant::now() + self.frame_interval);
        Ok(())
    }

    fn read_frame(&mut self, timeout: Duration) -> Result<ReadOutcome, DeviceError> {
        if !self.open {
            return Err(DeviceError::Read("device not open".into()));
        }
        if let Some(limit) = self.fail_after {
            if self.next_sequence >= limit {
                return Err(DeviceError::Disconnected);
            }
        }

        let due = self.next_due.unwrap_or_else(Instant::now);
        let now = Instant::now();
        if due > now {
            let remaining = due - now;
            if remaining > timeout {
                std::thread::sleep(timeout);
                return Ok(ReadOutcome::Empty);
            }
            std::thread::sleep(remaining);
        }

        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.next_due = Some(due + self.frame_interval);
        Ok(ReadOutcome::Frame(Frame {
            sequence,
            data: vec![(sequence & 0xff) as u8; self.frame_size],
        }))
    }

    fn close(&mut self) {
        self.open = false;
        self.next_due = None;
    }
}
