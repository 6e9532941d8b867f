//! Minimal client for the plain-text NATS protocol.
//!
//! # Responsibilities
//! - Connect, authenticate (user/password, token) and verify with PING/PONG
//! - Issue request/reply round trips on a private inbox
//! - Surface server `-ERR` lines and no-responder statuses as errors
//!
//! TLS upgrades and nonce signing are not implemented; servers that
//! require them are reported as unsupported.

use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::{Host, Url};

use crate::context::{parse_servers, Auth, ConnectionOptions};
use crate::monitor::MonitorError;

/// Largest inbound payload accepted when the server advertises no limit.
pub const DEFAULT_MAX_PAYLOAD: u64 = 64 * 1024 * 1024;

/// Fields of the server `INFO` greeting that checks care about.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    pub server_id: String,
    pub server_name: String,
    pub version: String,
    pub cluster: Option<String>,
    pub jetstream: bool,
    pub headers: bool,
    pub auth_required: bool,
    pub tls_required: bool,
    pub max_payload: u64,
    pub nonce: Option<String>,
    pub connect_urls: Vec<String>,
}

/// An established protocol session.
pub struct NatsClient {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    info: ServerInfo,
    server: String,
    inbox_prefix: String,
    next_sid: u64,
    connect_time: Duration,
}

impl NatsClient {
    /// Connect to the first reachable server of `servers`.
    pub async fn connect(servers: &str, opts: &ConnectionOptions) -> Result<Self, MonitorError> {
        let urls = parse_servers(servers).map_err(|e| MonitorError::Protocol(e.to_string()))?;

        let mut last_err = None;
        for url in &urls {
            match Self::connect_one(url, opts).await {
                Ok(client) => return Ok(client),
                Err(e) => {
                    tracing::debug!(server = %url, error = %e, "Server unreachable, trying next");
                    last_err = Some(e);
                }
            }
        }

        Err(last_err.unwrap_or_else(|| MonitorError::Protocol("no servers".to_string())))
    }

    async fn connect_one(url: &Url, opts: &ConnectionOptions) -> Result<Self, MonitorError> {
        if matches!(url.scheme(), "ws" | "wss") {
            return Err(MonitorError::Unsupported("websocket connections".to_string()));
        }
        if url.scheme() == "tls" || opts.tls.is_some() || opts.tls_first {
            return Err(MonitorError::Unsupported("TLS connections".to_string()));
        }

        let (host, port) = host_port(url);
        let server = match url.host() {
            Some(Host::Ipv6(_)) => format!("[{}]:{}", host, port),
            _ => format!("{}:{}", host, port),
        };
        let started = Instant::now();

        let stream = timeout(opts.connect_timeout, TcpStream::connect((host.as_str(), port)))
            .await
            .map_err(|_| MonitorError::Timeout(format!("connecting to {}", server)))?
            .map_err(|source| MonitorError::Connect {
                server: server.clone(),
                source,
            })?;
        let _ = stream.set_nodelay(true);

        let (read, write) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(read),
            writer: write,
            info: ServerInfo::default(),
            server,
            inbox_prefix: opts.inbox_prefix.clone(),
            next_sid: 1,
            connect_time: Duration::ZERO,
        };

        timeout(opts.connect_timeout, client.handshake(url, opts))
            .await
            .map_err(|_| MonitorError::Timeout(format!("handshake with {}", client.server)))??;

        client.connect_time = started.elapsed();
        Ok(client)
    }

    async fn handshake(&mut self, url: &Url, opts: &ConnectionOptions) -> Result<(), MonitorError> {
        let line = self.read_line().await?;
        let json = line
            .strip_prefix("INFO ")
            .ok_or_else(|| MonitorError::Protocol(format!("expected INFO, got {:?}", line)))?;
        self.info = serde_json::from_str(json)?;

        if self.info.tls_required {
            return Err(MonitorError::Unsupported("TLS connections".to_string()));
        }

        let mut connect = serde_json::json!({
            "verbose": false,
            "pedantic": false,
            "tls_required": false,
            "name": opts.name,
            "lang": "rust",
            "version": env!("CARGO_PKG_VERSION"),
            "protocol": 1,
            "headers": true,
            "no_responders": true,
        });

        match &opts.auth {
            Auth::None => {
                // Credentials embedded in the URL.
                if !url.username().is_empty() {
                    connect["user"] = url.username().into();
                    connect["pass"] = url.password().unwrap_or("").into();
                }
            }
            Auth::UserPassword { user, password } => {
                connect["user"] = user.as_str().into();
                connect["pass"] = password.as_str().into();
            }
            Auth::Token(token) => {
                connect["auth_token"] = token.as_str().into();
            }
            Auth::Credentials(_) | Auth::NKey(_) | Auth::UserJwt(_) => {
                return Err(MonitorError::Unsupported("nkey signed authentication".to_string()));
            }
        }

        self.write(format!("CONNECT {}\r\nPING\r\n", connect).as_bytes()).await?;

        loop {
            let line = self.read_line().await?;
            match line.as_str() {
                "PONG" => return Ok(()),
                "+OK" => continue,
                "PING" => self.write(b"PONG\r\n").await?,
                l if l.starts_with("INFO ") => continue,
                l if l.starts_with("-ERR") => return Err(server_error(l)),
                other => return Err(MonitorError::Protocol(format!("unexpected {:?} during connect", other))),
            }
        }
    }

    pub fn info(&self) -> &ServerInfo {
        &self.info
    }

    /// `host:port` of the connected server.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Time from TCP connect to the first PONG.
    pub fn connect_time(&self) -> Duration {
        self.connect_time
    }

    /// Round trip of a PING/PONG exchange.
    pub async fn rtt(&mut self, limit: Duration) -> Result<Duration, MonitorError> {
        let started = Instant::now();
        self.write(b"PING\r\n").await?;

        timeout(limit, self.wait_pong())
            .await
            .map_err(|_| MonitorError::Timeout("ping".to_string()))??;

        Ok(started.elapsed())
    }

    async fn wait_pong(&mut self) -> Result<(), MonitorError> {
        loop {
            let line = self.read_line().await?;
            match line.as_str() {
                "PONG" => return Ok(()),
                "PING" => self.write(b"PONG\r\n").await?,
                l if l.starts_with("-ERR") => return Err(server_error(l)),
                _ => continue,
            }
        }
    }

    /// Publish to a private subject this client is subscribed to and wait
    /// for the message to come back through the server.
    pub async fn echo(&mut self, limit: Duration) -> Result<Duration, MonitorError> {
        let subject = self.new_inbox();
        let started = Instant::now();
        self.exchange(&subject, None, b"", limit).await?;
        Ok(started.elapsed())
    }

    /// Send `payload` to `subject` and wait for the first reply.
    pub async fn request(&mut self, subject: &str, payload: &[u8], limit: Duration) -> Result<Vec<u8>, MonitorError> {
        let inbox = self.new_inbox();
        self.exchange(&inbox, Some(subject), payload, limit).await
    }

    /// Request and decode a JSON reply, mapping API error bodies to errors.
    pub async fn request_json<T: DeserializeOwned>(
        &mut self,
        subject: &str,
        payload: &[u8],
        limit: Duration,
    ) -> Result<T, MonitorError> {
        let body = self.request(subject, payload, limit).await?;
        decode_api_response(&body)
    }

    /// Subscribe to `inbox`, publish to `subject` (or to the inbox itself)
    /// and return the first message delivered to the subscription.
    async fn exchange(
        &mut self,
        inbox: &str,
        subject: Option<&str>,
        payload: &[u8],
        limit: Duration,
    ) -> Result<Vec<u8>, MonitorError> {
        let sid = self.next_sid;
        self.next_sid += 1;

        let mut frame = format!("SUB {} {}\r\nUNSUB {} 1\r\n", inbox, sid, sid).into_bytes();
        match subject {
            Some(subject) => frame.extend(format!("PUB {} {} {}\r\n", subject, inbox, payload.len()).as_bytes()),
            None => frame.extend(format!("PUB {} {}\r\n", inbox, payload.len()).as_bytes()),
        }
        frame.extend_from_slice(payload);
        frame.extend_from_slice(b"\r\n");
        self.write(&frame).await?;

        let target = subject.unwrap_or(inbox).to_string();
        timeout(limit, self.wait_for(sid, &target))
            .await
            .map_err(|_| MonitorError::Timeout(format!("request to {}", target)))?
    }

    async fn wait_for(&mut self, sid: u64, subject: &str) -> Result<Vec<u8>, MonitorError> {
        loop {
            let line = self.read_line().await?;
            let mut parts = line.split_whitespace();
            match parts.next() {
                Some("MSG") => {
                    let args: Vec<&str> = parts.collect();
                    let (msg_sid, size) = match args.as_slice() {
                        [_, sid, size] | [_, sid, _, size] => (parse_num(sid)?, parse_num(size)?),
                        _ => return Err(MonitorError::Protocol(format!("malformed {:?}", line))),
                    };
                    let body = self.read_payload(size).await?;
                    if msg_sid == sid {
                        return Ok(body);
                    }
                }
                Some("HMSG") => {
                    let args: Vec<&str> = parts.collect();
                    let (msg_sid, hdr_len, total) = match args.as_slice() {
                        [_, sid, hdr, total] | [_, sid, _, hdr, total] => {
                            (parse_num(sid)?, parse_num(hdr)?, parse_num(total)?)
                        }
                        _ => return Err(MonitorError::Protocol(format!("malformed {:?}", line))),
                    };
                    let mut body = self.read_payload(total).await?;
                    if msg_sid != sid {
                        continue;
                    }
                    let hdr_len = match usize::try_from(hdr_len) {
                        Ok(len) if len <= body.len() => len,
                        _ => return Err(MonitorError::Protocol("header length exceeds message".to_string())),
                    };
                    let headers = String::from_utf8_lossy(&body[..hdr_len]).to_string();
                    if header_status(&headers) == Some(503) {
                        return Err(MonitorError::NoResponders(subject.to_string()));
                    }
                    return Ok(body.split_off(hdr_len));
                }
                Some("PING") => self.write(b"PONG\r\n").await?,
                Some("-ERR") => return Err(server_error(&line)),
                _ => continue,
            }
        }
    }

    /// Close the write half; the server drops the session.
    pub async fn close(mut self) {
        let _ = self.writer.shutdown().await;
    }

    fn new_inbox(&self) -> String {
        format!("{}.{}", self.inbox_prefix, uuid::Uuid::new_v4().simple())
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<(), MonitorError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn read_line(&mut self) -> Result<String, MonitorError> {
        let mut line = String::new();
        let n = self.reader.read_line(&mut line).await?;
        if n == 0 {
            return Err(MonitorError::Protocol("connection closed by server".to_string()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Read a message body and its trailing CRLF. `size` comes off the
    /// wire and is bounded by the server's advertised max payload.
    async fn read_payload(&mut self, size: u64) -> Result<Vec<u8>, MonitorError> {
        let limit = payload_limit(&self.info);
        if size > limit {
            return Err(MonitorError::Protocol(format!(
                "message of {} bytes exceeds max payload {}",
                size, limit
            )));
        }
        let len = usize::try_from(size)
            .ok()
            .and_then(|n| n.checked_add(2))
            .ok_or_else(|| MonitorError::Protocol(format!("message of {} bytes is too large", size)))?;

        let mut buf = vec![0u8; len];
        self.reader.read_exact(&mut buf).await?;
        buf.truncate(len - 2);
        Ok(buf)
    }
}

/// Decode a JSON API reply, turning `{"error": {...}}` into [`MonitorError::Api`].
pub fn decode_api_response<T: DeserializeOwned>(body: &[u8]) -> Result<T, MonitorError> {
    let value: serde_json::Value = serde_json::from_slice(body)?;
    if let Some(err) = value.get("error").filter(|e| !e.is_null()) {
        return Err(MonitorError::Api {
            code: err.get("code").and_then(|c| c.as_u64()).unwrap_or(0),
            description: err
                .get("description")
                .and_then(|d| d.as_str())
                .unwrap_or("unknown error")
                .to_string(),
        });
    }
    Ok(serde_json::from_value(value)?)
}

/// Status code from a `NATS/1.0 <code> [description]` header block.
pub fn header_status(headers: &str) -> Option<u16> {
    let first = headers.lines().next()?;
    let rest = first.strip_prefix("NATS/1.0")?.trim();
    rest.split_whitespace().next()?.parse().ok()
}

fn payload_limit(info: &ServerInfo) -> u64 {
    if info.max_payload == 0 {
        DEFAULT_MAX_PAYLOAD
    } else {
        info.max_payload
    }
}

/// Dialable host and port of a server URL; IPv6 literals lose their brackets.
fn host_port(url: &Url) -> (String, u16) {
    let host = match url.host() {
        Some(Host::Domain(d)) => d.to_string(),
        Some(Host::Ipv4(addr)) => addr.to_string(),
        Some(Host::Ipv6(addr)) => addr.to_string(),
        None => "127.0.0.1".to_string(),
    };
    (host, url.port().unwrap_or(4222))
}

fn server_error(line: &str) -> MonitorError {
    let msg = line.trim_start_matches("-ERR").trim().trim_matches('\'').to_string();
    MonitorError::Server(msg)
}

fn parse_num(raw: &str) -> Result<u64, MonitorError> {
    raw.parse()
        .map_err(|_| MonitorError::Protocol(format!("invalid number {:?}", raw)))
}
