//! Network backed [`Monitor`].
//!
//! Every check opens its own session, issues the API requests it needs and
//! closes the session again. Request waits are bounded by `request_timeout`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::context::ConnectionOptions;
use crate::monitor::api::{
    AccountInfo, ConsumerInfo, JszData, MsgGetResponse, ServerApiResponse, StreamInfo, VarzData,
};
use crate::monitor::client::NatsClient;
use crate::monitor::credential::check_credential_at;
use crate::monitor::evaluate::*;
use crate::monitor::*;
use crate::result::CheckResult;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct NatsMonitor {
    request_timeout: Duration,
}

impl Default for NatsMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_TIMEOUT)
    }
}

impl NatsMonitor {
    pub fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }

    async fn session(&self, servers: &str, opts: &ConnectionOptions) -> Result<NatsClient, MonitorError> {
        let client = NatsClient::connect(servers, opts).await?;
        tracing::debug!(
            server = %client.server(),
            server_name = %client.info().server_name,
            "Check session established"
        );
        Ok(client)
    }

    async fn stream_info(
        &self,
        client: &mut NatsClient,
        opts: &ConnectionOptions,
        stream: &str,
    ) -> Result<StreamInfo, MonitorError> {
        let subject = format!("{}.STREAM.INFO.{}", opts.jetstream_prefix, stream);
        client.request_json(&subject, b"", self.request_timeout).await
    }

    async fn last_message(
        &self,
        client: &mut NatsClient,
        opts: &ConnectionOptions,
        stream: &str,
        subject: &str,
    ) -> Result<MsgGetResponse, MonitorError> {
        let api = format!("{}.STREAM.MSG.GET.{}", opts.jetstream_prefix, stream);
        let body = serde_json::json!({ "last_by_subj": subject }).to_string();
        client.request_json(&api, body.as_bytes(), self.request_timeout).await
    }
}

#[async_trait]
impl Monitor for NatsMonitor {
    async fn check_connection(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        timeout: Duration,
        result: &mut CheckResult,
        check: &ConnectionCheckOptions,
    ) -> Result<(), MonitorError> {
        let opts = opts.clone().with_connect_timeout(timeout);
        let mut client = self.session(servers, &opts).await?;

        apply_duration(
            result,
            "connect_time",
            client.connect_time(),
            check.connect_time_warning,
            check.connect_time_critical,
        );

        let outcome = async {
            let rtt = client.rtt(timeout).await?;
            apply_duration(result, "rtt", rtt, check.rtt_warning, check.rtt_critical);

            let request = client.echo(timeout).await?;
            apply_duration(result, "request_time", request, check.request_warning, check.request_critical);
            Ok::<_, MonitorError>(())
        }
        .await;

        let server = client.server().to_string();
        client.close().await;
        outcome?;

        result.ok(format!("connected to {}", server));
        Ok(())
    }

    async fn check_stream(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &StreamCheckOptions,
    ) -> Result<(), MonitorError> {
        let mut client = self.session(servers, opts).await?;
        let info = self.stream_info(&mut client, opts, &check.stream).await;
        client.close().await;

        evaluate_stream(result, check, &info?);
        Ok(())
    }

    async fn check_consumer(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &ConsumerCheckOptions,
    ) -> Result<(), MonitorError> {
        let mut client = self.session(servers, opts).await?;
        let subject = format!("{}.CONSUMER.INFO.{}.{}", opts.jetstream_prefix, check.stream, check.consumer);
        let info = client
            .request_json::<ConsumerInfo>(&subject, b"", self.request_timeout)
            .await;
        client.close().await;

        evaluate_consumer(result, check, &info?, Utc::now());
        Ok(())
    }

    async fn check_message(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &MessageCheckOptions,
    ) -> Result<(), MonitorError> {
        let mut client = self.session(servers, opts).await?;
        let reply = self.last_message(&mut client, opts, &check.stream, &check.subject).await;
        client.close().await;

        match reply {
            Ok(reply) => evaluate_message(result, check, &reply.message, Utc::now()),
            Err(e) if e.is_not_found() => {
                result.critical(format!("no message found on {}", check.subject));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn check_meta(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &MetaCheckOptions,
    ) -> Result<(), MonitorError> {
        let mut client = self.session(servers, opts).await?;
        let body = serde_json::json!({ "leader_only": true }).to_string();
        let reply = client
            .request_json::<ServerApiResponse<JszData>>("$SYS.REQ.SERVER.PING.JSZ", body.as_bytes(), self.request_timeout)
            .await;
        client.close().await;

        let reply = reply?;
        evaluate_meta(result, check, reply.data.meta_cluster.as_ref());
        Ok(())
    }

    async fn check_jetstream_account(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &JetStreamAccountOptions,
    ) -> Result<(), MonitorError> {
        let mut client = self.session(servers, opts).await?;
        let subject = format!("{}.INFO", opts.jetstream_prefix);
        let info = client
            .request_json::<AccountInfo>(&subject, b"", self.request_timeout)
            .await;
        client.close().await;

        evaluate_jetstream_account(result, check, &info?);
        Ok(())
    }

    async fn check_server(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        timeout: Duration,
        result: &mut CheckResult,
        check: &ServerCheckOptions,
    ) -> Result<(), MonitorError> {
        let mut client = self.session(servers, opts).await?;
        let body = serde_json::json!({ "server_name": check.name }).to_string();
        let reply = client
            .request_json::<ServerApiResponse<VarzData>>("$SYS.REQ.SERVER.PING.VARZ", body.as_bytes(), timeout)
            .await;
        client.close().await;

        let reply = match reply {
            Ok(reply) => reply,
            Err(MonitorError::Timeout(_)) | Err(MonitorError::NoResponders(_)) => {
                result.critical(format!("no response from {}", check.name));
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if !check.name.is_empty() && reply.server.name != check.name {
            result.critical(format!("response from {} instead of {}", reply.server.name, check.name));
            return Ok(());
        }

        evaluate_server(result, check, &reply.data);
        Ok(())
    }

    async fn check_kv(
        &self,
        servers: &str,
        opts: &ConnectionOptions,
        result: &mut CheckResult,
        check: &KvCheckOptions,
    ) -> Result<(), MonitorError> {
        let mut client = self.session(servers, opts).await?;
        let stream = format!("KV_{}", check.bucket);

        let outcome = async {
            let info = match self.stream_info(&mut client, opts, &stream).await {
                Ok(info) => info,
                Err(e) if e.is_not_found() => {
                    result.critical(format!("bucket {} not found", check.bucket));
                    return Ok(());
                }
                Err(e) => return Err(e),
            };
            evaluate_kv_bucket(result, check, &info);

            if let Some(key) = &check.key {
                let subject = format!("$KV.{}.{}", check.bucket, key);
                let latest = self
                    .last_message(&mut client, opts, &stream, &subject)
                    .await
                    .map(|reply| reply.message);
                evaluate_kv_key(result, key, latest)?;
            }
            Ok::<(), MonitorError>(())
        }
        .await;

        client.close().await;
        outcome
    }

    async fn check_credential(
        &self,
        result: &mut CheckResult,
        check: &CredentialCheckOptions,
    ) -> Result<(), MonitorError> {
        check_credential_at(result, check, Utc::now())
    }
}
