use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::task::JoinHandle;
use crate::stats::Snapshot;
use crate::worker::CycleErrorKind;

/// Queue depth of the diagnostic channel built by [`diagnostics`].
pub const DIAGNOSTIC_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub enum Event {
    CycleFailed { worker: usize, kind: CycleErrorKind, message: String },
    IntervalReported { snapshot: Snapshot },
}

/// Bounded, never blocking. Whatever does not fit is counted and dropped.
pub struct EventSink<E> {
    tx: Option<Sender<E>>,
    dropped: Arc<AtomicU64>,
}

impl<E> Clone for EventSink<E> {
    fn clone(&self) -> Self {
        Self { tx: self.tx.clone(), dropped: self.dropped.clone() }
    }
}

impl<E> EventSink<E> {
    /// No-op sink
    pub fn noop() -> Self {
        Self { tx: None, dropped: Arc::default() }
    }

    /// Real sink
    pub fn new(tx: Sender<E>) -> Self {
        Self { tx: Some(tx), dropped: Arc::default() }
    }

    /// Sink plus its receiving end, holding at most `capacity` events.
    pub fn channel(capacity: usize) -> (Self, Receiver<E>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    /// Best-effort send
    #[inline]
    pub fn send(&self, ev: E) {
        if let Some(tx) = &self.tx {
            match tx.try_reserve() {
                Ok(permit) => permit.send(ev),
                Err(TrySendError::Full(())) => self.count_drop(),
                Err(TrySendError::Closed(())) => {}
            }
        }
    }

    /// Low priority send for high volume events. The event is only built
    /// when it will be queued, and the last eighth of the queue stays
    /// reserved for [`send`](Self::send).
    #[inline]
    pub fn offer(&self, make: impl FnOnce() -> E) {
        let Some(tx) = &self.tx else { return };
        if tx.is_closed() {
            return;
        }
        if tx.capacity() <= tx.max_capacity() / 8 {
            self.count_drop();
            return;
        }
        self.send(make());
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.tx.is_some()
    }

    /// Events dropped so far because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn count_drop(&self) {
        self.dropped.fetch_add(1, Ordering::Relaxed);
    }
}

/// Failed cycles seen since the last report, by kind.
#[derive(Debug, Default)]
pub struct FailureTally {
    by_kind: BTreeMap<CycleErrorKind, u64>,
    dropped: u64,
}

impl FailureTally {
    pub fn record(&mut self, kind: CycleErrorKind) {
        *self.by_kind.entry(kind).or_insert(0) += 1;
    }

    /// Failures that never reached the log because the queue was full.
    pub fn record_dropped(&mut self, count: u64) {
        self.dropped += count;
    }

    pub fn total(&self) -> u64 {
        self.by_kind.values().sum::<u64>() + self.dropped
    }

    /// Returns a one-line summary and clears the tally, `None` if nothing failed.
    pub fn drain_summary(&mut self) -> Option<String> {
        if self.total() == 0 {
            return None;
        }
        let mut parts: Vec<String> = self
            .by_kind
            .iter()
            .map(|(kind, count)| format!("{kind}={count}"))
            .collect();
        if self.dropped > 0 {
            parts.push(format!("unlogged={}", self.dropped));
        }
        let summary = format!("{} failed cycles ({})", self.total(), parts.join(", "));
        self.by_kind.clear();
        self.dropped = 0;
        Some(summary)
    }
}

/// Diagnostic sink plus the task that drains it into the log.
pub fn diagnostics() -> (EventSink<Event>, JoinHandle<()>) {
    let (sink, rx) = EventSink::channel(DIAGNOSTIC_CAPACITY);
    let dropped = sink.dropped.clone();
    (sink, tokio::spawn(drain(rx, dropped)))
}

async fn drain(mut rx: Receiver<Event>, dropped: Arc<AtomicU64>) {
    let mut tally = FailureTally::default();
    let mut seen_dropped = 0;
    while let Some(event) = rx.recv().await {
        match event {
            Event::CycleFailed { worker, kind, message } => {
                log::debug!("worker {worker}: {kind} failure: {message}");
                tally.record(kind);
            }
            Event::IntervalReported { snapshot } => {
                log::trace!("{snapshot:?}");
                let total_dropped = dropped.load(Ordering::Relaxed);
                tally.record_dropped(total_dropped - seen_dropped);
                seen_dropped = total_dropped;
                if let Some(summary) = tally.drain_summary() {
                    log::warn!("interval {}: {}", snapshot.interval, summary);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_drops_everything() {
        let sink = EventSink::<Event>::noop();
        assert!(!sink.is_enabled());
        sink.send(Event::CycleFailed {
            worker: 0,
            kind: CycleErrorKind::Connect,
            message: "refused".to_string(),
        });
    }

    #[test]
    fn sink_survives_a_closed_receiver() {
        let (sink, rx) = EventSink::<u32>::channel(4);
        drop(rx);
        sink.send(1);
        sink.offer(|| 2);
        assert!(sink.is_enabled());
        assert_eq!(sink.dropped(), 0);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let (sink, mut rx) = EventSink::<u32>::channel(8);
        let mut built = 0;
        for i in 0..10 {
            sink.offer(|| {
                built += 1;
                i
            });
        }
        // one slot stays free for regular sends
        assert_eq!(built, 7);
        assert_eq!(sink.dropped(), 3);

        sink.send(100);
        sink.send(101);
        assert_eq!(sink.dropped(), 4);

        let mut queued = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            queued.push(ev);
        }
        assert_eq!(queued, vec![0, 1, 2, 3, 4, 5, 6, 100]);
    }

    #[test]
    fn clones_share_the_drop_count() {
        let (sink, _rx) = EventSink::<u32>::channel(1);
        let other = sink.clone();
        sink.send(1);
        other.send(2);
        assert_eq!(sink.dropped(), 1);
    }

    #[test]
    fn tally_summarizes_and_resets() {
        let mut tally = FailureTally::default();
        assert_eq!(tally.drain_summary(), None);

        tally.record(CycleErrorKind::Read);
        tally.record(CycleErrorKind::Connect);
        tally.record(CycleErrorKind::Connect);

        assert_eq!(tally.total(), 3);
        assert_eq!(
            tally.drain_summary().as_deref(),
            Some("3 failed cycles (connect=2, read=1)")
        );
        assert_eq!(tally.total(), 0);
    }

    #[test]
    fn tally_reports_dropped_failures() {
        let mut tally = FailureTally::default();
        tally.record_dropped(0);
        assert_eq!(tally.drain_summary(), None);

        tally.record(CycleErrorKind::Connect);
        tally.record_dropped(40);

        assert_eq!(
            tally.drain_summary().as_deref(),
            Some("41 failed cycles (connect=1, unlogged=40)")
        );
    }
}
