//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use nats_check_exporter::checks::Registry;
use nats_check_exporter::collector::Collector;
use nats_check_exporter::config::{parse_config, ExporterConfig};
use nats_check_exporter::context::{ConnectionOptions, ContextResolver};
use nats_check_exporter::monitor::api::{StreamInfo, StreamState};
use nats_check_exporter::monitor::evaluate::evaluate_kv_bucket;
use nats_check_exporter::monitor::*;
use nats_check_exporter::observability::MemoryResultLog;
use nats_check_exporter::result::CheckResult;

/// Start a scripted NATS server on an ephemeral port.
///
/// Requests to a subject in `responses` get that body as reply; any other
/// request gets a 503 no-responders status. Publishes to a subscribed
/// subject are echoed back to the subscriber.
pub async fn start_mock_nats(responses: HashMap<String, String>) -> SocketAddr {
    spawn_mock(responses, None).await
}

/// Start a server that answers every request with a `MSG` header
/// announcing `size` bytes and then sends nothing more.
pub async fn start_lying_nats(size: &str) -> SocketAddr {
    spawn_mock(HashMap::new(), Some(size.to_string())).await
}

async fn spawn_mock(responses: HashMap<String, String>, claimed_size: Option<String>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let responses = Arc::new(responses);

    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let responses = responses.clone();
            let claimed_size = claimed_size.clone();
            tokio::spawn(async move {
                let _ = serve_client(socket, &responses, claimed_size.as_deref()).await;
            });
        }
    });

    addr
}

async fn serve_client(
    socket: TcpStream,
    responses: &HashMap<String, String>,
    claimed_size: Option<&str>,
) -> std::io::Result<()> {
    let (read, mut write) = socket.into_split();
    let mut reader = BufReader::new(read);
    write
        .write_all(
            b"INFO {\"server_id\":\"NMOCK\",\"server_name\":\"mock-1\",\"version\":\"2.10.0\",\"headers\":true,\"max_payload\":1048576}\r\n",
        )
        .await?;

    let mut subs: HashMap<String, String> = HashMap::new();
    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).await? == 0 {
            return Ok(());
        }
        let parts: Vec<String> = line.split_whitespace().map(str::to_string).collect();

        match parts.first().map(String::as_str) {
            Some("PING") => write.write_all(b"PONG\r\n").await?,
            Some("SUB") if parts.len() == 3 => {
                subs.insert(parts[1].clone(), parts[2].clone());
            }
            Some("PUB") => {
                let (subject, reply, size) = match parts.len() {
                    3 => (parts[1].clone(), None, parts[2].clone()),
                    4 => (parts[1].clone(), Some(parts[2].clone()), parts[3].clone()),
                    _ => continue,
                };
                let size: usize = size.parse().unwrap_or(0);
                let mut payload = vec![0u8; size + 2];
                reader.read_exact(&mut payload).await?;
                payload.truncate(size);

                if let Some(sid) = subs.get(&subject) {
                    write.write_all(format!("MSG {} {} {}\r\n", subject, sid, size).as_bytes()).await?;
                    write.write_all(&payload).await?;
                    write.write_all(b"\r\n").await?;
                    continue;
                }

                let Some(reply) = reply else { continue };
                let Some(sid) = subs.get(&reply) else { continue };
                if let Some(size) = claimed_size {
                    write.write_all(format!("MSG {} {} {}\r\n", reply, sid, size).as_bytes()).await?;
                    write.flush().await?;
                    continue;
                }
                match responses.get(&subject) {
                    Some(body) => {
                        write
                            .write_all(format!("MSG {} {} {}\r\n{}\r\n", reply, sid, body.len(), body).as_bytes())
                            .await?;
                    }
                    None => {
                        let headers = "NATS/1.0 503\r\n\r\n";
                        write
                            .write_all(
                                format!("HMSG {} {} {} {}\r\n{}\r\n", reply, sid, headers.len(), headers.len(), headers)
                                    .as_bytes(),
                            )
                            .await?;
                    }
                }
            }
            _ => {}
        }
        write.flush().await?;
    }
}

/// Address nothing listens on.
pub async fn unreachable_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Write `<dir>/<name>.json` with the given server URL.
pub fn write_context(dir: &Path, name: &str, url: &str) {
    let body = serde_json::json!({ "description": format!("{} context", name), "url": url });
    std::fs::write(dir.join(format!("{}.json", name)), body.to_string()).unwrap();
}

/// A [`Monitor`] that answers every check with OK and remembers the calls.
#[derive(Default)]
pub struct FakeMonitor {
    calls: Mutex<Vec<(String, String)>>,
    failing: HashSet<String>,
    missing_buckets: HashSet<String>,
    kv_values: u64,
    delay: Option<Duration>,
}

impl FakeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every check of `kind` fail with a protocol error.
    pub fn failing(mut self, kind: &str) -> Self {
        self.failing.insert(kind.to_string());
        self
    }

    pub fn without_bucket(mut self, bucket: &str) -> Self {
        self.missing_buckets.insert(bucket.to_string());
        self
    }

    pub fn with_kv_values(mut self, values: u64) -> Self {
        self.kv_values = values;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `(kind, servers)` of every call so far.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    async fn answer(&self, kind: &str, servers: &str, result: &mut CheckResult) -> Result<(), MonitorError> {
        self.calls.lock().unwrap().push((kind.to_string(), servers.to_string()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.contains(kind) {
            return Err(MonitorError::Protocol(format!("{} unavailable", kind)));
        }
        result.ok(format!("{} healthy", kind));
        Ok(())
    }
}

#[async_trait]
impl Monitor for FakeMonitor {
    async fn check_connection(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        _timeout: Duration,
        result: &mut CheckResult,
        _check: &ConnectionCheckOptions,
    ) -> Result<(), MonitorError> {
        self.answer("connection", servers, result).await
    }

    async fn check_stream(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        result: &mut CheckResult,
        _check: &StreamCheckOptions,
    ) -> Result<(), MonitorError> {
        self.answer("stream", servers, result).await
    }

    async fn check_consumer(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        result: &mut CheckResult,
        _check: &ConsumerCheckOptions,
    ) -> Result<(), MonitorError> {
        self.answer("consumer", servers, result).await
    }

    async fn check_message(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        result: &mut CheckResult,
        _check: &MessageCheckOptions,
    ) -> Result<(), MonitorError> {
        self.answer("message", servers, result).await
    }

    async fn check_meta(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        result: &mut CheckResult,
        _check: &MetaCheckOptions,
    ) -> Result<(), MonitorError> {
        self.answer("meta", servers, result).await
    }

    async fn check_jetstream_account(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        result: &mut CheckResult,
        _check: &JetStreamAccountOptions,
    ) -> Result<(), MonitorError> {
        self.answer("jetstream", servers, result).await
    }

    async fn check_server(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        _timeout: Duration,
        result: &mut CheckResult,
        _check: &ServerCheckOptions,
    ) -> Result<(), MonitorError> {
        self.answer("server", servers, result).await
    }

    async fn check_kv(
        &self,
        servers: &str,
        _opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &KvCheckOptions,
    ) -> Result<(), MonitorError> {
        self.calls.lock().unwrap().push(("kv".to_string(), servers.to_string()));
        if self.missing_buckets.contains(&check.bucket) {
            result.critical(format!("bucket {} not found", check.bucket));
            return Ok(());
        }
        let info = StreamInfo {
            state: StreamState {
                messages: self.kv_values,
                ..Default::default()
            },
            ..Default::default()
        };
        evaluate_kv_bucket(result, check, &info);
        Ok(())
    }

    async fn check_credential(&self, result: &mut CheckResult, _check: &CredentialCheckOptions) -> Result<(), MonitorError> {
        self.answer("credential", "", result).await
    }
}

/// Build a collector over `yaml` with the standard registry.
pub fn collector(
    yaml: &str,
    monitor: Arc<dyn Monitor>,
    context_dir: &Path,
) -> (Collector, Arc<ArcSwap<ExporterConfig>>, Arc<MemoryResultLog>) {
    let config = Arc::new(ArcSwap::from_pointee(parse_config(yaml).unwrap()));
    let log = Arc::new(MemoryResultLog::new());
    let collector = Collector::new(
        "natscli",
        config.clone(),
        ContextResolver::new(context_dir),
        Registry::standard(),
        monitor,
        log.clone(),
    );
    (collector, config, log)
}
