//! Health check implementations.
//!
//! # Data Flow
//! ```text
//! handler (checks/) decodes properties into options.rs types
//!     → Monitor::check_* (server list, ConnectionOptions, CheckResult, options)
//!         → nats.rs   opens a client.rs session, queries the cluster
//!         → credential.rs inspects a local creds file
//!     → outcomes written into the CheckResult
//!     → Err(MonitorError) for failures the check could not evaluate
//! ```
//!
//! # Design Decisions
//! - The collector only knows the `Monitor` trait; tests plug in fakes
//! - A check records soft failures itself and returns `Ok`
//! - Every network wait is bounded by a timeout

pub mod api;
pub mod client;
pub mod credential;
pub mod evaluate;
pub mod nats;
pub mod options;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::ConnectionOptions;
use crate::result::CheckResult;

pub use nats::NatsMonitor;
pub use options::*;

/// Errors raised while a check talks to the cluster or reads its inputs.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("could not connect to {server}: {source}")]
    Connect {
        server: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout {0}")]
    Timeout(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server error: {0}")]
    Server(String),

    #[error("no responders available for request to {0}")]
    NoResponders(String),

    #[error("api error {code}: {description}")]
    Api { code: u64, description: String },

    #[error("{0} are not supported")]
    Unsupported(String),

    #[error("invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("credential error: {0}")]
    Credential(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// True for JetStream "not found" API errors.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MonitorError::Api { code: 404, .. })
    }
}

/// The check algorithms, one method per check kind.
#[async_trait]
pub trait Monitor: Send + Sync {
    async fn check_connection(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        timeout: Duration,
        result: &mut CheckResult,
        check: &ConnectionCheckOptions,
    ) -> Result<(), MonitorError>;

    async fn check_stream(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &StreamCheckOptions,
    ) -> Result<(), MonitorError>;

    async fn check_consumer(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &ConsumerCheckOptions,
    ) -> Result<(), MonitorError>;

    async fn check_message(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &MessageCheckOptions,
    ) -> Result<(), MonitorError>;

    async fn check_meta(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &MetaCheckOptions,
    ) -> Result<(), MonitorError>;

    async fn check_jetstream_account(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &JetStreamAccountOptions,
    ) -> Result<(), MonitorError>;

    async fn check_server(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        timeout: Duration,
        result: &mut CheckResult,
        check: &ServerCheckOptions,
    ) -> Result<(), MonitorError>;

    async fn check_kv(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &KvCheckOptions,
    ) -> Result<(), MonitorError>;

    async fn check_credential(
        &self,
        result: &mut CheckResult,
        check: &CredentialCheckOptions,
    ) -> Result<(), MonitorError>;
}
