use std::sync::Arc;
use libconfig::LoadConfig;
use tokio::task::JoinHandle;
use crate::events::{Event, EventSink};
use crate::retry::RetryPolicy;
use crate::slot::{self, SampleSource};
use crate::worker::{CycleSpec, Worker};

/// The running workers. Dropping the pool aborts them.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `config.concurrency` workers on the current tokio runtime and
    /// returns the read ends of their slots, in worker order.
    pub fn spawn(config: &LoadConfig, events: EventSink<Event>) -> (Self, Vec<SampleSource>) {
        let spec = Arc::new(CycleSpec::from(config));
        let retry = RetryPolicy::from(&config.retry);
        let (sinks, sources) = slot::slots(config.concurrency);

        let handles = sinks
            .into_iter()
            .enumerate()
            .map(|(id, sink)| {
                let worker = Worker::new(id, spec.clone(), retry.clone(), sink, events.clone());
                tokio::spawn(async move {
                    match worker.run().await {}
                })
            })
            .collect();

        log::info!(
            "started {} workers against {}",
            config.concurrency,
            spec.address
        );
        (WorkerPool { handles }, sources)
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Workers never return on their own, so a finished handle means a panic.
    pub fn crashed(&self) -> usize {
        self.handles.iter().filter(|h| h.is_finished()).count()
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        for h in &self.handles {
            h.abort();
        }
    }
}
