//! Single-capacity hand-off between one worker and the aggregator.
//!
//! Delivery never blocks: a sample the aggregator has not taken yet is
//! overwritten by the next one, so only the most recent completed cycle per
//! interval is observable. Taking never blocks either, which keeps the
//! reporting cadence independent of worker speed.

use std::time::Duration;
use tokio::sync::watch;

/// Write end, owned by exactly one worker.
#[derive(Debug)]
pub struct SampleSink {
    tx: watch::Sender<Duration>,
}

impl SampleSink {
    #[inline]
    pub fn deliver(&self, elapsed: Duration) {
        self.tx.send_replace(elapsed);
    }
}

/// Read end, owned by the aggregator.
#[derive(Debug)]
pub struct SampleSource {
    rx: watch::Receiver<Duration>,
}

impl SampleSource {
    /// Consumes the pending sample if there is one.
    pub fn try_take(&mut self) -> Option<Duration> {
        match self.rx.has_changed() {
            Ok(true) => Some(*self.rx.borrow_and_update()),
            // Ok(false): nothing new since the last take. Err: the worker is gone.
            _ => None,
        }
    }
}

pub fn channel() -> (SampleSink, SampleSource) {
    let (tx, rx) = watch::channel(Duration::ZERO);
    (SampleSink { tx }, SampleSource { rx })
}

/// Ordered wiring for `n` workers; index `i` of both vectors is the same slot.
pub fn slots(n: usize) -> (Vec<SampleSink>, Vec<SampleSource>) {
    (0..n).map(|_| channel()).unzip()
}
