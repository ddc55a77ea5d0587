use std::time::Duration;
use libconfig::RetryConfig;
use rand::Rng;

/// What a worker waits before the next cycle after a failed one.
#[derive(Debug, Clone)]
pub enum RetryPolicy {
    Immediate,
    Backoff {
        base: Duration,
        max: Duration,
        jitter: bool,
        failures: u32,
    },
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        match *config {
            RetryConfig::Immediate => RetryPolicy::Immediate,
            RetryConfig::Backoff { base_ms, max_ms, jitter } => RetryPolicy::Backoff {
                base: Duration::from_millis(base_ms),
                max: Duration::from_millis(max_ms),
                jitter,
                failures: 0,
            },
        }
    }
}

impl RetryPolicy {
    /// Registers a failed cycle and returns the delay before the next one.
    pub fn on_failure(&mut self) -> Option<Duration> {
        match self {
            RetryPolicy::Immediate => None,
            RetryPolicy::Backoff { base, max, jitter, failures } => {
                let factor = 1u32.checked_shl(*failures).unwrap_or(u32::MAX);
                let delay = base.saturating_mul(factor).min(*max);
                *failures = failures.saturating_add(1);

                if *jitter {
                    let ms = delay.as_millis() as u64;
                    Some(Duration::from_millis(rand::thread_rng().gen_range(0..=ms)))
                } else {
                    Some(delay)
                }
            }
        }
    }

    pub fn on_success(&mut self) {
        if let RetryPolicy::Backoff { failures, .. } = self {
            *failures = 0;
        }
    }
}
