//! Concurrent TCP load generation.
//!
//! N workers each loop over connect, send, receive and hand their latest
//! round-trip time to a dedicated single-capacity slot. One aggregator polls
//! every slot once per interval without blocking and renders a snapshot.

pub mod aggregator;
pub mod events;
pub mod pool;
pub mod report;
pub mod retry;
pub mod slot;
pub mod stats;
pub mod worker;

use std::io;
use libconfig::LoadConfig;
use crate::aggregator::Aggregator;
use crate::events::{Event, EventSink};
use crate::pool::WorkerPool;
use crate::report::Renderer;

pub use crate::stats::Snapshot;

/// Starts the workers and reports with `renderer`. With `intervals` set the
/// run stops after that many reports, otherwise it only ends if rendering
/// fails.
pub async fn run<R: Renderer + ?Sized>(
    config: &LoadConfig,
    intervals: Option<u64>,
    renderer: &mut R,
    events: EventSink<Event>,
) -> io::Result<()> {
    let (pool, slots) = WorkerPool::spawn(config, events.clone());
    let mut aggregator = Aggregator::new(slots, events);
    log::info!(
        "reporting on {} slots every {:?}",
        aggregator.concurrency(),
        config.interval()
    );

    let result = match intervals {
        Some(count) => aggregator.report_for(config.interval(), count, renderer).await,
        None => aggregator
            .report_loop(config.interval(), renderer)
            .await
            .map(|never| match never {}),
    };

    if pool.crashed() > 0 {
        log::error!("{} of {} workers crashed", pool.crashed(), pool.len());
    }
    result
}
