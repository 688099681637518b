//! Pipeline Integration Tests
//!
//! End-to-end cycles against a fake REST endpoint and file sinks.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::sync::watch;

use gridpost::{
    config::ObjectConfig,
    export::{CsvSink, LineProtocolSink, RestSink, Sink},
    pipeline::{Collector, Scheduler},
    telemetry::{Battery, Kind, MemorySource, Status},
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Captured POSTs plus the status code the endpoint answers with.
#[derive(Debug, Default)]
struct Endpoint {
    status: AtomicU16,
    received: Mutex<Vec<(String, Value)>>,
}

impl Endpoint {
    fn answer_with(&self, status: u16) {
        self.status.store(status, Ordering::SeqCst);
    }

    fn received(&self) -> Vec<(String, Value)> {
        self.received.lock().unwrap().clone()
    }
}

async fn capture(
    State(endpoint): State<Arc<Endpoint>>,
    uri: Uri,
    Json(body): Json<Value>,
) -> StatusCode {
    endpoint
        .received
        .lock()
        .unwrap()
        .push((uri.path().to_string(), body));
    StatusCode::from_u16(endpoint.status.load(Ordering::SeqCst)).unwrap_or(StatusCode::OK)
}

/// Start a fake REST endpoint and return its base URL.
async fn start_endpoint() -> (String, Arc<Endpoint>) {
    let endpoint = Arc::new(Endpoint::default());
    endpoint.answer_with(201);

    let router = Router::new()
        .route("/api/{*kind}", post(capture))
        .with_state(Arc::clone(&endpoint));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give the server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    (format!("http://{}", addr), endpoint)
}

/// A source with one battery and one status object, plus the matching table.
fn seeded_source() -> (Arc<MemorySource>, Vec<ObjectConfig>) {
    let source = Arc::new(MemorySource::new());
    source.register(
        "ess.battery.1",
        Battery {
            soc: 55.5,
            voltage: 790.0,
            current: -12.0,
            power: -9500.0,
        },
    );
    source.register(
        "inverter.status.1",
        Status {
            state: "running".to_string(),
            code: 0,
            fault: false,
        },
    );

    let objects = vec![
        ObjectConfig {
            reference: "ess.battery.1".to_string(),
            kind: Kind::Battery,
            source: 2,
            name: "main-battery".to_string(),
        },
        ObjectConfig {
            reference: "inverter.status.1".to_string(),
            kind: Kind::Status,
            source: 4,
            name: "inverter-1".to_string(),
        },
    ];
    (source, objects)
}

fn scheduler_with(sink: Sink) -> Scheduler<MemorySource> {
    let (source, objects) = seeded_source();
    let collector = Collector::new(source, 3, objects);
    collector.validate().expect("refs must resolve");
    Scheduler::new(collector, sink, Duration::from_millis(20), 100)
}

// =============================================================================
// REST Sink
// =============================================================================

#[tokio::test]
async fn test_rest_success_clears_batches() {
    let (base_url, endpoint) = start_endpoint().await;
    let sink = Sink::Rest(RestSink::new(base_url, Duration::from_secs(2)).unwrap());
    let mut scheduler = scheduler_with(sink);

    scheduler.run_cycle().await;

    assert_eq!(scheduler.batches().total_len(), 0);

    let received = endpoint.received();
    assert_eq!(received.len(), 2);

    let (path, body) = &received[0];
    assert_eq!(path, "/api/essMeasures");
    let objects = body["objects"].as_array().unwrap();
    assert_eq!(objects.len(), 1);
    // Provenance comes from the configuration, not the record.
    assert_eq!(objects[0]["site"], 3);
    assert_eq!(objects[0]["source"], 2);
    assert_eq!(objects[0]["name"], "main-battery");
    assert_eq!(objects[0]["soc"], 55.5);

    let (path, body) = &received[1];
    assert_eq!(path, "/api/statuses");
    assert_eq!(body["objects"][0]["state"], "running");
}

#[tokio::test]
async fn test_rest_failure_retains_batches() {
    let (base_url, endpoint) = start_endpoint().await;
    endpoint.answer_with(500);

    let sink = Sink::Rest(RestSink::new(base_url, Duration::from_secs(2)).unwrap());
    let mut scheduler = scheduler_with(sink);

    scheduler.run_cycle().await;

    // Both kinds were rejected and kept for the next cycle.
    assert_eq!(scheduler.batches().battery.len(), 1);
    assert_eq!(scheduler.batches().status.len(), 1);

    // Same handles are re-fetched next cycle; dedup keeps the batch stable.
    scheduler.run_cycle().await;
    assert_eq!(scheduler.batches().battery.len(), 1);
    assert_eq!(scheduler.batches().status.len(), 1);

    // Once the endpoint recovers, the retained records drain.
    endpoint.answer_with(201);
    scheduler.run_cycle().await;
    assert_eq!(scheduler.batches().total_len(), 0);

    // Two rejected attempts plus the final delivery.
    let received = endpoint.received();
    let battery_posts = received
        .iter()
        .filter(|(path, _)| path.as_str() == "/api/essMeasures")
        .count();
    assert_eq!(battery_posts, 3);
}

// =============================================================================
// File Sinks
// =============================================================================

#[tokio::test]
async fn test_csv_cycles_append_rows_after_single_header() {
    let dir = tempfile::tempdir().unwrap();
    let mut scheduler = scheduler_with(Sink::AnnotatedCsv(CsvSink::new(dir.path())));

    scheduler.run_cycle().await;
    scheduler.run_cycle().await;

    for file in ["battery.csv", "status.csv"] {
        let content = std::fs::read_to_string(dir.path().join(file)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        // 4 header lines plus one row per cycle.
        assert_eq!(lines.len(), 6, "{file}");
        assert!(lines[0].starts_with("#datatype,dateTime:RFC3339"));
        assert_eq!(lines.iter().filter(|l| l.starts_with('#')).count(), 3);
    }
}

#[tokio::test]
async fn test_line_protocol_cycle_output() {
    let dir = tempfile::tempdir().unwrap();
    let mut scheduler = scheduler_with(Sink::LineProtocol(LineProtocolSink::new(dir.path())));

    scheduler.run_cycle().await;

    let content = std::fs::read_to_string(dir.path().join("battery.lp")).unwrap();
    let line = content.lines().next().unwrap();
    assert!(line.starts_with("battery,site=3,source=2,name=main-battery "));
    assert!(line.contains("soc=55.5"));

    let content = std::fs::read_to_string(dir.path().join("status.lp")).unwrap();
    let line = content.lines().next().unwrap();
    assert!(line.contains("code=0i,fault=false,state=\"running\""));
}

// =============================================================================
// Scheduler Lifecycle
// =============================================================================

#[tokio::test]
async fn test_scheduler_runs_until_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let scheduler = scheduler_with(Sink::AnnotatedCsv(CsvSink::new(dir.path())));

    let (tx, rx) = watch::channel(false);
    let handle = tokio::spawn(scheduler.run(rx));

    // Let a few cycles pass, then request shutdown.
    tokio::time::sleep(Duration::from_millis(100)).await;
    tx.send(true).unwrap();

    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("scheduler did not stop after cancellation")
        .unwrap();

    let content = std::fs::read_to_string(dir.path().join("battery.csv")).unwrap();
    assert!(content.lines().count() > 4);
}
