//! Sink collaborators: where frames and statistics go.
//!
//! Sinks are supplied by the embedding application (display queue, encoder,
//! log pipeline). Absence of a stat sink is a valid configuration; the
//! profiler then only emits through `tracing`.

use crate::device::Frame;
use crate::stats::StatSample;

/// Receives captured frames from the capture worker. `accept` must be
/// non-blocking or boundedly blocking; the worker calls it between device
/// reads.
pub trait FrameSink: Send {
    fn accept(&self, frame: Frame);
}

/// Channels are sinks: frames queue up for whoever holds the receiver. A
/// hung-up receiver means nobody wants frames anymore, so the send result is
/// deliberately ignored.
impl FrameSink for std::sync::mpsc::Sender<Frame> {
    fn accept(&self, frame: Frame) {
        let _ = self.send(frame);
    }
}

/// Receives periodic statistics samples from the profiler worker.
pub trait StatSink: Send {
    fn record_stat(&self, sample: StatSample);
}

impl StatSink for std::sync::mpsc::Sender<StatSample> {
    fn record_stat(&self, sample: StatSample) {
        let _ = self.send(sample);
    }
}
