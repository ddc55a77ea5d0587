use serde::Serialize;
use std::time::Duration;

/// Accumulators for one reporting interval. Built fresh for every poll.
#[derive(Debug, Default)]
pub struct IntervalStats {
    pub finished: usize,
    pub processing: usize,
    pub latency_sum_ms: u64,
    pub latency_max_ms: u64,
    /// `None` until the first sample of this interval is folded in
    pub latency_min_ms: Option<u64>,
}

impl IntervalStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot had a sample ready.
    pub fn fold(&mut self, sample: Duration) {
        let ms = sample.as_millis() as u64;
        self.finished += 1;
        self.latency_sum_ms += ms;
        if ms > self.latency_max_ms {
            self.latency_max_ms = ms;
        }
        self.latency_min_ms = Some(match self.latency_min_ms {
            Some(min) => min.min(ms),
            None => ms,
        });
    }

    /// A slot had nothing pending.
    pub fn skip(&mut self) {
        self.processing += 1;
    }

    pub fn average_ms(&self) -> f64 {
        if self.finished == 0 {
            return 0.0;
        }
        self.latency_sum_ms as f64 / self.finished as f64
    }

    pub fn snapshot(&self, interval: u64) -> Snapshot {
        Snapshot {
            interval,
            concurrency: self.finished + self.processing,
            finished: self.finished,
            processing: self.processing,
            average_ms: self.average_ms(),
            max_ms: self.latency_max_ms,
            min_ms: self.latency_min_ms.unwrap_or(0),
        }
    }
}

/// What one interval's report shows.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Snapshot {
    pub interval: u64,
    pub concurrency: usize,
    pub finished: usize,
    /// Slots with no sample pending at poll time, not a count of open connections
    pub processing: usize,
    pub average_ms: f64,
    pub max_ms: u64,
    pub min_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn empty_interval_has_zero_average() {
        let mut stats = IntervalStats::new();
        for _ in 0..4 {
            stats.skip();
        }
        let snapshot = stats.snapshot(0);

        assert_eq!(snapshot.finished, 0);
        assert_eq!(snapshot.processing, 4);
        assert_eq!(snapshot.average_ms, 0.0);
        assert_eq!(snapshot.min_ms, 0);
        assert_eq!(snapshot.max_ms, 0);
    }

    #[test]
    fn min_is_the_true_minimum_when_first_slot_is_idle() {
        let mut stats = IntervalStats::new();
        stats.skip();
        stats.fold(ms(40));
        stats.fold(ms(25));
        stats.fold(ms(90));

        let snapshot = stats.snapshot(3);
        assert_eq!(snapshot.min_ms, 25);
        assert_eq!(snapshot.max_ms, 90);
        assert_eq!(snapshot.finished, 3);
        assert_eq!(snapshot.processing, 1);
        assert_eq!(snapshot.concurrency, 4);
    }

    #[test]
    fn average_sits_between_min_and_max() {
        let samples = [3u64, 17, 17, 250, 1, 64];
        let mut stats = IntervalStats::new();
        for s in samples {
            stats.fold(ms(s));
        }
        let snapshot = stats.snapshot(0);

        assert_eq!(snapshot.average_ms, 352.0 / 6.0);
        assert!(snapshot.min_ms as f64 <= snapshot.average_ms);
        assert!(snapshot.average_ms <= snapshot.max_ms as f64);
    }

    #[test]
    fn sub_millisecond_samples_count_as_zero() {
        let mut stats = IntervalStats::new();
        stats.fold(Duration::from_micros(400));
        let snapshot = stats.snapshot(0);

        assert_eq!(snapshot.finished, 1);
        assert_eq!(snapshot.min_ms, 0);
        assert_eq!(snapshot.max_ms, 0);
        assert_eq!(snapshot.average_ms, 0.0);
    }
}
