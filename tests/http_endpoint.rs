//! Scrape endpoint over a real socket.

mod common;

use std::sync::Arc;
use std::time::Duration;

use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::net::TcpListener;

use nats_check_exporter::http::{AppState, HttpServer};
use nats_check_exporter::lifecycle::Shutdown;

use common::{collector, FakeMonitor};

const CHECKS: &str = r#"
checks:
  - name: orders
    kind: stream
    properties:
      stream: ORDERS
  - name: broken
    kind: consumer
    properties:
      stream: ORDERS
  - name: mystery
    kind: bogus
"#;

async fn serve(state: AppState) -> (String, Shutdown, tokio::task::JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());
    let shutdown = Shutdown::new();
    let rx = shutdown.subscribe();

    let server = HttpServer::new(state);
    let task = tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (base, shutdown, task)
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let dir = tempfile::tempdir().unwrap();
    let (collector, _, _) = collector(CHECKS, Arc::new(FakeMonitor::new()), dir.path());
    let (base, shutdown, task) = serve(AppState {
        collector: Arc::new(collector),
        handle: None,
        scrape_timeout: Duration::from_secs(5),
    })
    .await;

    let response = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; version=0.0.4; charset=utf-8"
    );

    let body = response.text().await.unwrap();
    assert!(body.contains("# TYPE natscli_stream_status_code gauge"));
    assert!(body.contains(r#"natscli_stream_status_code{item="orders"} 0"#));
    assert!(body.contains(r#"natscli_consumer_status_code{item="broken"} 2"#));
    assert!(!body.contains("mystery"));

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_self_metrics_follow_check_series() {
    let dir = tempfile::tempdir().unwrap();
    let (collector, _, _) = collector(CHECKS, Arc::new(FakeMonitor::new()), dir.path());
    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();

    // The handle renders whatever its recorder holds; seed it directly.
    metrics::with_local_recorder(&recorder, || {
        metrics::counter!("natscli_exporter_scrapes_total").increment(3);
    });

    let (base, shutdown, _task) = serve(AppState {
        collector: Arc::new(collector),
        handle: Some(handle),
        scrape_timeout: Duration::from_secs(5),
    })
    .await;

    let body = reqwest::get(format!("{}/metrics", base)).await.unwrap().text().await.unwrap();
    let checks_at = body.find("natscli_stream_status_code").unwrap();
    let self_at = body.find("natscli_exporter_scrapes_total 3").unwrap();
    assert!(checks_at < self_at);

    shutdown.trigger();
}

#[tokio::test]
async fn test_healthz() {
    let dir = tempfile::tempdir().unwrap();
    let (collector, _, _) = collector("checks: []", Arc::new(FakeMonitor::new()), dir.path());
    let (base, shutdown, _task) = serve(AppState {
        collector: Arc::new(collector),
        handle: None,
        scrape_timeout: Duration::from_secs(5),
    })
    .await;

    let response = reqwest::get(format!("{}/healthz", base)).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "ok");

    shutdown.trigger();
}

#[tokio::test]
async fn test_scrape_timeout_still_answers() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = "checks:\n  - name: a\n    kind: meta\n  - name: b\n    kind: meta\n";
    let monitor = Arc::new(FakeMonitor::new().with_delay(Duration::from_secs(30)));
    let (collector, _, _) = collector(yaml, monitor, dir.path());
    let (base, shutdown, _task) = serve(AppState {
        collector: Arc::new(collector),
        handle: None,
        scrape_timeout: Duration::from_millis(300),
    })
    .await;

    let body = reqwest::get(format!("{}/metrics", base)).await.unwrap().text().await.unwrap();
    assert!(body.contains(r#"natscli_meta_status_code{item="a"} 2"#));
    assert!(!body.contains(r#"item="b""#));

    shutdown.trigger();
}
