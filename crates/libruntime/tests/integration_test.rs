use std::io;
use std::sync::Arc;
use std::time::Duration;
use libconfig::{LoadConfig, Payload, Target};
use libruntime::aggregator::Aggregator;
use libruntime::events::{Event, EventSink};
use libruntime::pool::WorkerPool;
use libruntime::report::Renderer;
use libruntime::retry::RetryPolicy;
use libruntime::slot;
use libruntime::worker::{CycleSpec, Worker};
use libruntime::Snapshot;
use test_support::test_server::{refused_address, spawn_test_server, Mode};

#[derive(Default)]
struct Collect(Vec<Snapshot>);

impl Renderer for Collect {
    fn render(&mut self, snapshot: &Snapshot) -> io::Result<()> {
        self.0.push(snapshot.clone());
        Ok(())
    }
}

fn config(target: Target, concurrency: usize, interval_ms: u64) -> LoadConfig {
    LoadConfig {
        concurrency,
        target,
        interval_ms,
        timeout_ms: Some(2000),
        payload: Payload::Repeat { byte: b'x', len: 2048 },
        ..LoadConfig::default()
    }
}

fn local(port: u16) -> Target {
    Target { host: "127.0.0.1".to_string(), port }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn it_reports_round_trips_from_a_live_target() {
    let server = spawn_test_server(Mode::Reply { delay: Duration::from_millis(10) }).await;
    let config = config(local(server.port()), 10, 200);
    let mut renderer = Collect::default();

    libruntime::run(&config, Some(3), &mut renderer, EventSink::noop())
        .await
        .unwrap();

    assert_eq!(renderer.0.len(), 3);
    for snapshot in &renderer.0 {
        assert_eq!(snapshot.concurrency, 10);
        assert_eq!(snapshot.finished + snapshot.processing, 10);
        assert!(snapshot.finished > 0, "{snapshot:?}");
        assert!(snapshot.max_ms >= snapshot.min_ms);
        assert!(snapshot.min_ms as f64 <= snapshot.average_ms);
        assert!(snapshot.average_ms <= snapshot.max_ms as f64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn it_reports_nothing_finished_when_the_target_refuses() {
    let addr = refused_address();
    let config = config(local(addr.port()), 4, 100);
    let mut renderer = Collect::default();

    libruntime::run(&config, Some(3), &mut renderer, EventSink::noop())
        .await
        .unwrap();

    assert_eq!(renderer.0.len(), 3);
    for snapshot in &renderer.0 {
        assert_eq!(snapshot.finished, 0);
        assert_eq!(snapshot.processing, 4);
        assert_eq!(snapshot.average_ms, 0.0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn it_keeps_workers_running_while_slots_are_not_drained() {
    let server = spawn_test_server(Mode::Reply { delay: Duration::from_millis(1) }).await;
    let spec = Arc::new(CycleSpec {
        address: server.address(),
        payload: b"ping".to_vec(),
        timeout: Some(Duration::from_secs(2)),
        read_buffer: 64,
    });
    let (sinks, sources) = slot::slots(2);
    let handles: Vec<_> = sinks
        .into_iter()
        .enumerate()
        .map(|(id, sink)| {
            let worker = Worker::new(id, spec.clone(), RetryPolicy::Immediate, sink, EventSink::noop());
            tokio::spawn(worker.run())
        })
        .collect();

    // nobody polls for a while
    tokio::time::sleep(Duration::from_millis(300)).await;
    let accepted_before = server.accepted();
    tokio::time::sleep(Duration::from_millis(100)).await;

    // a full slot neither stalls its worker nor the other one
    assert!(accepted_before > 4, "only {accepted_before} connections");
    assert!(server.accepted() > accepted_before);

    let mut aggregator = Aggregator::new(sources, EventSink::noop());
    let snapshot = aggregator.poll();
    assert_eq!(snapshot.finished, 2);
    assert_eq!(snapshot.processing, 0);

    for h in handles {
        h.abort();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn it_spawns_one_worker_per_slot() {
    let addr = refused_address();
    let config = config(local(addr.port()), 25, 100);

    let (pool, slots) = WorkerPool::spawn(&config, EventSink::noop());

    assert_eq!(pool.len(), 25);
    assert_eq!(slots.len(), 25);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(pool.crashed(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn it_keeps_the_diagnostic_queue_bounded_under_a_failure_flood() {
    let addr = refused_address();
    let config = config(local(addr.port()), 200, 100);
    let (events, mut rx) = EventSink::channel(64);

    let (pool, _slots) = WorkerPool::spawn(&config, events.clone());
    // nobody drains the queue
    tokio::time::sleep(Duration::from_millis(500)).await;
    drop(pool);

    let mut queued = 0;
    while let Ok(event) = rx.try_recv() {
        assert!(matches!(event, Event::CycleFailed { .. }));
        queued += 1;
    }
    assert!(queued <= 64, "{queued} events queued");
    assert!(events.dropped() > 0);
}
