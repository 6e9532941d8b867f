//! Per-kind check properties.
//!
//! Each struct is the schema of the `properties` block for one check kind.
//! Threshold fields left unset disable that comparison; the `jetstream`
//! and `kv` kinds use `-1` for "disabled".

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Threshold sentinel meaning "do not compare".
pub const DISABLED: i64 = -1;

fn disabled() -> i64 {
    DISABLED
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConnectionCheckOptions {
    #[serde(with = "humantime_serde")]
    pub connect_time_warning: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub connect_time_critical: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub rtt_warning: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub rtt_critical: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub request_warning: Option<Duration>,
    #[serde(with = "humantime_serde")]
    pub request_critical: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StreamCheckOptions {
    pub stream: String,
    #[serde(default)]
    pub peer_expect: Option<usize>,
    #[serde(default)]
    pub peer_lag_critical: Option<u64>,
    #[serde(default, with = "humantime_serde")]
    pub peer_seen_critical: Option<Duration>,
    #[serde(default = "disabled")]
    pub msgs_warning: i64,
    #[serde(default = "disabled")]
    pub msgs_critical: i64,
    #[serde(default)]
    pub min_sources: Option<usize>,
    #[serde(default)]
    pub max_sources: Option<usize>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConsumerCheckOptions {
    pub stream: String,
    pub consumer: String,
    #[serde(default)]
    pub ack_outstanding_critical: Option<u64>,
    #[serde(default)]
    pub waiting_critical: Option<u64>,
    #[serde(default)]
    pub unprocessed_critical: Option<u64>,
    #[serde(default)]
    pub redelivery_critical: Option<u64>,
    #[serde(default, with = "humantime_serde")]
    pub last_delivery_critical: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub last_ack_critical: Option<Duration>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MessageCheckOptions {
    pub stream: String,
    pub subject: String,
    #[serde(default, with = "humantime_serde")]
    pub age_warning: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub age_critical: Option<Duration>,
    /// Substring the message body must contain.
    #[serde(default)]
    pub content: Option<String>,
    /// Read the message age from a unix timestamp in the body.
    #[serde(default)]
    pub body_as_timestamp: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct MetaCheckOptions {
    pub expect_peers: Option<usize>,
    pub lag_critical: Option<u64>,
    #[serde(with = "humantime_serde")]
    pub seen_critical: Option<Duration>,
}

/// Usage thresholds in percent of the account limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct JetStreamAccountOptions {
    pub memory_warning: i64,
    pub memory_critical: i64,
    pub file_warning: i64,
    pub file_critical: i64,
    pub streams_warning: i64,
    pub streams_critical: i64,
    pub consumers_warning: i64,
    pub consumers_critical: i64,
}

impl Default for JetStreamAccountOptions {
    fn default() -> Self {
        Self {
            memory_warning: DISABLED,
            memory_critical: DISABLED,
            file_warning: DISABLED,
            file_critical: DISABLED,
            streams_warning: DISABLED,
            streams_critical: DISABLED,
            consumers_warning: DISABLED,
            consumers_critical: DISABLED,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ServerCheckOptions {
    pub name: String,
    #[serde(default)]
    pub cpu_warning: Option<f64>,
    #[serde(default)]
    pub cpu_critical: Option<f64>,
    #[serde(default)]
    pub memory_warning: Option<u64>,
    #[serde(default)]
    pub memory_critical: Option<u64>,
    #[serde(default)]
    pub connections_warning: Option<u64>,
    #[serde(default)]
    pub connections_critical: Option<u64>,
    #[serde(default)]
    pub subscriptions_warning: Option<u64>,
    #[serde(default)]
    pub subscriptions_critical: Option<u64>,
    #[serde(default)]
    pub jetstream_required: bool,
    #[serde(default)]
    pub tls_required: bool,
    #[serde(default)]
    pub auth_required: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct KvCheckOptions {
    pub bucket: String,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default = "disabled")]
    pub values_warning: i64,
    #[serde(default = "disabled")]
    pub values_critical: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct CredentialCheckOptions {
    pub file: String,
    #[serde(default, with = "humantime_serde")]
    pub validity_warning: Option<Duration>,
    #[serde(default, with = "humantime_serde")]
    pub validity_critical: Option<Duration>,
    #[serde(default)]
    pub require_expiry: bool,
}
