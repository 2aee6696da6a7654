//! Integration tests for the connection-state tracker lifecycle.
//!
//! Exercises the public API end to end: concurrent event handling from many
//! simulated connections, the background reporter, and the Prometheus sink.

mod common;

use common::RecordingSink;
use connstate::{Config, ConnId, ConnState, ConnStateConfig, ConnTracker, PrometheusSink};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_connections_with_live_reporter() {
    const CONNECTIONS: u64 = 64;

    let sink = Arc::new(RecordingSink::default());
    let config = ConnStateConfig {
        report_interval_ms: 1,
        ..ConnStateConfig::default()
    };
    let tracker = ConnTracker::new(config, sink.clone());
    let reporter = tracker.spawn_reporter();

    // Each simulated connection walks the full lifecycle on its own task
    // while the reporter scans concurrently.
    let mut workers = Vec::new();
    for id in 0..CONNECTIONS {
        let tracker = Arc::clone(&tracker);
        workers.push(tokio::spawn(async move {
            tracker.handle_event(ConnId(id), ConnState::New);
            tokio::time::sleep(Duration::from_millis(1)).await;
            tracker.handle_event(ConnId(id), ConnState::Active);
            tracker.handle_event(ConnId(id), ConnState::Idle);
            tokio::time::sleep(Duration::from_millis(1)).await;
            tracker.handle_event(ConnId(id), ConnState::Closed);
        }));
    }
    for worker in workers {
        worker.await.expect("connection task panicked");
    }

    tracker.stop();
    reporter.await.expect("reporter task panicked");

    // All connections closed: registry drained, every event counted.
    assert!(tracker.is_empty());
    let total = CONNECTIONS as f64;
    assert_eq!(sink.count_total("http.server.connstate.new"), total);
    assert_eq!(sink.count_total("http.server.connstate.active"), total);
    assert_eq!(sink.count_total("http.server.connstate.idle"), total);
    assert_eq!(sink.count_total("http.server.connstate.closed"), total);
    assert_eq!(sink.count_total("http.server.connstate.hijacked"), 0.0);

    // Gauges are best-effort snapshots but can never exceed the population.
    for value in sink.gauge_values("http.server.connstate.active.gauge") {
        assert!((0.0..=total).contains(&value));
    }
}

#[tokio::test]
async fn reporter_emits_then_stays_quiet_after_stop() {
    let sink = Arc::new(RecordingSink::default());
    let config = ConnStateConfig {
        report_interval_ms: 1,
        ..ConnStateConfig::default()
    };
    let tracker = ConnTracker::new(config, sink.clone());
    tracker.handle_event(ConnId(1), ConnState::New);
    tracker.handle_event(ConnId(2), ConnState::Idle);

    let reporter = tracker.spawn_reporter();
    tokio::time::sleep(Duration::from_millis(25)).await;
    tracker.stop();
    reporter.await.expect("reporter task panicked");

    let new_values = sink.gauge_values("http.server.connstate.new.gauge");
    assert!(!new_values.is_empty(), "expected at least one report");
    assert!(new_values.iter().all(|v| *v == 1.0));
    assert!(
        sink.gauge_values("http.server.connstate.idle.gauge")
            .iter()
            .all(|v| *v == 1.0)
    );

    let calls = sink.gauge_calls();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(sink.gauge_calls(), calls, "gauges emitted after stop");
}

#[tokio::test]
async fn hijacked_connections_leave_the_registry() {
    let sink = Arc::new(RecordingSink::default());
    let tracker = ConnTracker::new(ConnStateConfig::default(), sink.clone());

    tracker.handle_event(ConnId(1), ConnState::New);
    tracker.handle_event(ConnId(1), ConnState::Active);
    tracker.handle_event(ConnId(1), ConnState::Hijacked);

    assert!(tracker.is_empty());
    assert_eq!(sink.count_total("http.server.connstate.hijacked"), 1.0);
}

#[tokio::test]
async fn custom_config_flows_through_to_prometheus() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    writeln!(
        file,
        "[connstate]\n\
         new_gauge = \"myapp.conns.new.gauge\"\n\
         active_gauge = \"myapp.conns.active.gauge\"\n\
         idle_gauge = \"myapp.conns.idle.gauge\"\n\
         new_counter = \"myapp.conns.new\"\n\
         report_interval_ms = 50"
    )
    .expect("write config");

    let config = Config::load(file.path()).expect("config should load");
    let sink = Arc::new(PrometheusSink::new());
    let tracker = ConnTracker::new(config.connstate, sink.clone());

    tracker.handle_event(ConnId(1), ConnState::New);
    tracker.handle_event(ConnId(2), ConnState::New);
    tracker.report();
    tracker.stop();

    let output = sink.gather();
    assert!(output.contains("myapp_conns_new 2"));
    assert!(output.contains("myapp_conns_new_gauge 2"));
    assert!(output.contains("myapp_conns_active_gauge 0"));
    assert!(output.contains("myapp_conns_idle_gauge 0"));
}
