//! The built-in monitor against a scripted server.

mod common;

use std::collections::HashMap;
use std::time::Duration;

use nats_check_exporter::context::ConnectionOptions;
use nats_check_exporter::monitor::client::NatsClient;
use nats_check_exporter::monitor::*;
use nats_check_exporter::result::{CheckResult, Severity};

use std::sync::Arc;

use nats_check_exporter::collector::SampleBuffer;

use common::{collector, start_lying_nats, start_mock_nats, write_context};

fn result(kind: &str) -> CheckResult {
    CheckResult::new("target", kind, "natscli")
}

fn monitor() -> NatsMonitor {
    NatsMonitor::new(Duration::from_secs(1))
}

#[tokio::test]
async fn test_connection_check_reports_timings() {
    let addr = start_mock_nats(HashMap::new()).await;
    let servers = format!("nats://{}", addr);
    let mut r = result("connection");

    monitor()
        .check_connection(
            &servers,
            &ConnectionOptions::default(),
            Duration::from_secs(2),
            &mut r,
            &ConnectionCheckOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(r.severity(), Severity::Ok);
    let snap = r.snapshot();
    let names: Vec<&str> = snap.perf_data.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["connect_time", "rtt", "request_time"]);
}

#[tokio::test]
async fn test_falls_back_to_next_server() {
    let down = common::unreachable_addr().await;
    let up = start_mock_nats(HashMap::new()).await;

    let client = NatsClient::connect(&format!("nats://{},nats://{}", down, up), &ConnectionOptions::default())
        .await
        .unwrap();
    assert_eq!(client.info().server_name, "mock-1");
    assert_eq!(client.server(), up.to_string());
    client.close().await;
}

#[tokio::test]
async fn test_stream_check_uses_stream_info() {
    let body = serde_json::json!({
        "config": {"name": "ORDERS", "subjects": ["orders.>"], "num_replicas": 1},
        "state": {"messages": 250, "bytes": 4096, "consumer_count": 2},
    });
    let addr = start_mock_nats(HashMap::from([(
        "$JS.API.STREAM.INFO.ORDERS".to_string(),
        body.to_string(),
    )]))
    .await;

    let check: StreamCheckOptions = serde_yaml::from_str("stream: ORDERS\nmsgs_warning: 100\nmsgs_critical: 1000").unwrap();
    let mut r = result("stream");
    monitor()
        .check_stream(&format!("nats://{}", addr), &ConnectionOptions::default(), &mut r, &check)
        .await
        .unwrap();

    assert_eq!(r.severity(), Severity::Warning);
    assert!(r.render().contains("messages=250;100;1000"));
}

#[tokio::test]
async fn test_missing_kv_bucket_is_critical() {
    let body = r#"{"error":{"code":404,"err_code":10059,"description":"stream not found"}}"#;
    let addr = start_mock_nats(HashMap::from([(
        "$JS.API.STREAM.INFO.KV_CONFIG".to_string(),
        body.to_string(),
    )]))
    .await;

    let check: KvCheckOptions = serde_yaml::from_str("bucket: CONFIG").unwrap();
    let mut r = result("kv");
    monitor()
        .check_kv(&format!("nats://{}", addr), &ConnectionOptions::default(), &mut r, &check)
        .await
        .unwrap();

    assert_eq!(r.severity(), Severity::Critical);
    assert!(r.render().contains("bucket CONFIG not found"));
}

#[tokio::test]
async fn test_jetstream_disabled_account_is_an_error() {
    // No responder for $JS.API.INFO.
    let addr = start_mock_nats(HashMap::new()).await;
    let mut r = result("jetstream");

    let err = monitor()
        .check_jetstream_account(
            &format!("nats://{}", addr),
            &ConnectionOptions::default(),
            &mut r,
            &JetStreamAccountOptions::default(),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MonitorError::NoResponders(ref s) if s == "$JS.API.INFO"));
}

#[tokio::test]
async fn test_custom_domain_prefix() {
    let body = serde_json::json!({"memory": 10, "storage": 20, "streams": 1, "consumers": 1, "limits": {}});
    let addr = start_mock_nats(HashMap::from([("$JS.hub.API.INFO".to_string(), body.to_string())])).await;

    let opts = ConnectionOptions {
        jetstream_prefix: "$JS.hub.API".to_string(),
        ..Default::default()
    };
    let mut r = result("jetstream");
    monitor()
        .check_jetstream_account(&format!("nats://{}", addr), &opts, &mut r, &JetStreamAccountOptions::default())
        .await
        .unwrap();

    assert_eq!(r.severity(), Severity::Ok);
}

#[tokio::test]
async fn test_tls_profiles_are_unsupported() {
    let addr = start_mock_nats(HashMap::new()).await;
    let opts = ConnectionOptions {
        tls_first: true,
        ..Default::default()
    };

    let err = NatsClient::connect(&format!("nats://{}", addr), &opts).await.err().unwrap();
    assert_eq!(err.to_string(), "TLS connections are not supported");
}

async fn jetstream_against_lying_server(size: &str) -> Vec<String> {
    let addr = start_lying_nats(size).await;
    let dir = tempfile::tempdir().unwrap();
    write_context(dir.path(), "liar", &format!("nats://{}", addr));

    let yaml = "context: liar\nchecks:\n  - name: acct\n    kind: jetstream\n  - name: after\n    kind: credential\n";
    let (collector, _, _) = collector(yaml, Arc::new(monitor()), dir.path());
    let mut sink = SampleBuffer::new();

    let summary = collector.collect(&mut sink, None).await;

    assert_eq!(summary.emitted, 2);
    assert_eq!(summary.results[0].status, Severity::Critical);
    assert_eq!(sink.for_item("acct").next().unwrap().value, 2.0);
    assert_eq!(sink.for_item("after").count(), 1);
    summary.results[0].criticals.clone()
}

#[tokio::test]
async fn test_overflowing_message_size_is_critical() {
    let criticals = jetstream_against_lying_server("18446744073709551615").await;
    assert!(criticals[0].starts_with("check failed: protocol error: message of 18446744073709551615 bytes exceeds max payload"));
}

#[tokio::test]
async fn test_oversized_message_is_rejected_before_reading() {
    let criticals = jetstream_against_lying_server("1099511627776").await;
    assert_eq!(
        criticals,
        vec!["check failed: protocol error: message of 1099511627776 bytes exceeds max payload 1048576".to_string()]
    );
}
