//! One handler per check kind.
//!
//! A handler decodes the check's `properties` into its options type and
//! invokes the matching [`Monitor`] method. Neither step returns an error
//! to the caller: failures become CRITICAL entries on the result.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::config::CheckConfig;
use crate::context::ConnectionOptions;
use crate::monitor::*;
use crate::result::CheckResult;

/// Connection timeout handed to the connection check.
pub const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);
/// Response timeout handed to the server check.
pub const SERVER_TIMEOUT: Duration = Duration::from_secs(1);

/// Where a check should connect, as derived from its context.
#[derive(Debug, Clone)]
pub struct Target {
    pub servers: String,
    pub options: ConnectionOptions,
}

#[async_trait]
pub trait CheckHandler: Send + Sync {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult);
}

#[derive(Debug, Error)]
#[error("{0}")]
pub struct PropertiesError(#[from] serde_yaml::Error);

/// Decode `properties`, treating an absent block as an empty mapping.
pub fn decode_properties<T: DeserializeOwned>(properties: &serde_yaml::Value) -> Result<T, PropertiesError> {
    let decoded = match properties {
        serde_yaml::Value::Null => serde_yaml::from_value(serde_yaml::Value::Mapping(Default::default()))?,
        other => serde_yaml::from_value(other.clone())?,
    };
    Ok(decoded)
}

fn properties<T: DeserializeOwned>(check: &CheckConfig, result: &mut CheckResult) -> Option<T> {
    let decoded = decode_properties(&check.properties);
    if result.critical_if_err(&decoded, "invalid properties") {
        return None;
    }
    decoded.ok()
}

fn record(result: &mut CheckResult, outcome: Result<(), MonitorError>) {
    result.critical_if_err(&outcome, "check failed");
}

pub struct ConnectionHandler;

#[async_trait]
impl CheckHandler for ConnectionHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<ConnectionCheckOptions>(check, result) else { return };
        let outcome = monitor
            .check_connection(&target.servers, &target.options, CONNECTION_TIMEOUT, result, &opts)
            .await;
        record(result, outcome);
    }
}

pub struct StreamHandler;

#[async_trait]
impl CheckHandler for StreamHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<StreamCheckOptions>(check, result) else { return };
        let outcome = monitor.check_stream(&target.servers, &target.options, result, &opts).await;
        record(result, outcome);
    }
}

pub struct ConsumerHandler;

#[async_trait]
impl CheckHandler for ConsumerHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<ConsumerCheckOptions>(check, result) else { return };
        let outcome = monitor.check_consumer(&target.servers, &target.options, result, &opts).await;
        record(result, outcome);
    }
}

pub struct MessageHandler;

#[async_trait]
impl CheckHandler for MessageHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<MessageCheckOptions>(check, result) else { return };
        let outcome = monitor.check_message(&target.servers, &target.options, result, &opts).await;
        record(result, outcome);
    }
}

pub struct MetaHandler;

#[async_trait]
impl CheckHandler for MetaHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<MetaCheckOptions>(check, result) else { return };
        let outcome = monitor.check_meta(&target.servers, &target.options, result, &opts).await;
        record(result, outcome);
    }
}

pub struct JetStreamHandler;

#[async_trait]
impl CheckHandler for JetStreamHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<JetStreamAccountOptions>(check, result) else { return };
        let outcome = monitor
            .check_jetstream_account(&target.servers, &target.options, result, &opts)
            .await;
        record(result, outcome);
    }
}

pub struct ServerHandler;

#[async_trait]
impl CheckHandler for ServerHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<ServerCheckOptions>(check, result) else { return };
        let outcome = monitor
            .check_server(&target.servers, &target.options, SERVER_TIMEOUT, result, &opts)
            .await;
        record(result, outcome);
    }
}

pub struct KvHandler;

#[async_trait]
impl CheckHandler for KvHandler {
    async fn run(&self, monitor: &dyn Monitor, target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<KvCheckOptions>(check, result) else { return };
        let outcome = monitor.check_kv(&target.servers, &target.options, result, &opts).await;
        record(result, outcome);
    }
}

pub struct CredentialHandler;

#[async_trait]
impl CheckHandler for CredentialHandler {
    async fn run(&self, monitor: &dyn Monitor, _target: &Target, check: &CheckConfig, result: &mut CheckResult) {
        let Some(opts) = properties::<CredentialCheckOptions>(check, result) else { return };
        let outcome = monitor.check_credential(result, &opts).await;
        record(result, outcome);
    }
}
