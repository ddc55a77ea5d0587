use std::convert::Infallible;
use std::io;
use std::time::Duration;
use crate::events::{Event, EventSink};
use crate::report::Renderer;
use crate::slot::SampleSource;
use crate::stats::{IntervalStats, Snapshot};

/// Polls every slot once per interval and renders what it found.
///
/// A poll is a best-effort snapshot, not a barrier: workers keep running
/// while it walks the slots, and a sample landing just after its slot was
/// checked is counted on the next interval.
pub struct Aggregator {
    slots: Vec<SampleSource>,
    interval: u64,
    events: EventSink<Event>,
}

impl Aggregator {
    pub fn new(slots: Vec<SampleSource>, events: EventSink<Event>) -> Self {
        Self { slots, interval: 0, events }
    }

    pub fn concurrency(&self) -> usize {
        self.slots.len()
    }

    /// One non-blocking pass over all slots.
    pub fn poll(&mut self) -> Snapshot {
        let mut stats = IntervalStats::new();
        for slot in self.slots.iter_mut() {
            match slot.try_take() {
                Some(sample) => stats.fold(sample),
                None => stats.skip(),
            }
        }
        let snapshot = stats.snapshot(self.interval);
        self.interval += 1;
        snapshot
    }

    async fn tick<R: Renderer + ?Sized>(&mut self, every: Duration, renderer: &mut R) -> io::Result<()> {
        tokio::time::sleep(every).await;
        let snapshot = self.poll();
        renderer.render(&snapshot)?;
        self.events.send(Event::IntervalReported { snapshot });
        Ok(())
    }

    /// Reports forever, one snapshot at the end of every interval. Only
    /// returns if the renderer fails.
    pub async fn report_loop<R: Renderer + ?Sized>(
        mut self,
        every: Duration,
        renderer: &mut R,
    ) -> io::Result<Infallible> {
        loop {
            self.tick(every, renderer).await?;
        }
    }

    /// Reports `count` intervals, then stops.
    pub async fn report_for<R: Renderer + ?Sized>(
        &mut self,
        every: Duration,
        count: u64,
        renderer: &mut R,
    ) -> io::Result<()> {
        for _ in 0..count {
            self.tick(every, renderer).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slot;

    struct Collect(Vec<Snapshot>);

    impl Renderer for Collect {
        fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
            self.0.push(snapshot.clone());
            Ok(())
        }
    }

    #[test]
    fn poll_splits_slots_into_finished_and_processing() {
        let (sinks, sources) = slot::slots(5);
        sinks[1].deliver(Duration::from_millis(12));
        sinks[3].deliver(Duration::from_millis(4));
        let mut aggregator = Aggregator::new(sources, EventSink::noop());

        let snapshot = aggregator.poll();
        assert_eq!(snapshot.concurrency, 5);
        assert_eq!(snapshot.finished, 2);
        assert_eq!(snapshot.processing, 3);
        assert_eq!(snapshot.min_ms, 4);
        assert_eq!(snapshot.max_ms, 12);
        assert_eq!(snapshot.average_ms, 8.0);
    }

    #[test]
    fn samples_do_not_carry_over() {
        let (sinks, sources) = slot::slots(2);
        sinks[0].deliver(Duration::from_millis(3));
        sinks[1].deliver(Duration::from_millis(50));
        let mut aggregator = Aggregator::new(sources, EventSink::noop());
        aggregator.poll();

        sinks[1].deliver(Duration::from_millis(70));
        let snapshot = aggregator.poll();

        assert_eq!(snapshot.interval, 1);
        assert_eq!(snapshot.finished, 1);
        assert_eq!(snapshot.processing, 1);
        assert_eq!(snapshot.min_ms, 70);
        assert_eq!(snapshot.max_ms, 70);
    }

    #[test]
    fn poll_does_not_wait_for_idle_slots() {
        let (_sinks, sources) = slot::slots(10_000);
        let mut aggregator = Aggregator::new(sources, EventSink::noop());

        let started = std::time::Instant::now();
        let snapshot = aggregator.poll();

        assert_eq!(snapshot.processing, 10_000);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn report_for_renders_each_interval_and_announces_it() {
        let (sinks, sources) = slot::slots(3);
        let (events, mut rx) = EventSink::channel(16);
        let mut aggregator = Aggregator::new(sources, events);
        let mut renderer = Collect(Vec::new());

        sinks[2].deliver(Duration::from_millis(9));
        aggregator
            .report_for(Duration::from_secs(1), 3, &mut renderer)
            .await
            .unwrap();

        let finished: Vec<usize> = renderer.0.iter().map(|s| s.finished).collect();
        assert_eq!(finished, vec![1, 0, 0]);
        let intervals: Vec<u64> = renderer.0.iter().map(|s| s.interval).collect();
        assert_eq!(intervals, vec![0, 1, 2]);

        let mut reported = 0;
        while let Ok(Event::IntervalReported { .. }) = rx.try_recv() {
            reported += 1;
        }
        assert_eq!(reported, 3);
    }
}
