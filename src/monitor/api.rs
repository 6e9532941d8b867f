//! Response bodies of the JetStream and system APIs used by the checks.

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamInfo {
    pub config: StreamConfig,
    pub state: StreamState,
    pub cluster: Option<ClusterInfo>,
    pub sources: Vec<SourceInfo>,
    pub mirror: Option<SourceInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub name: String,
    pub subjects: Vec<String>,
    pub num_replicas: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StreamState {
    pub messages: u64,
    pub bytes: u64,
    pub consumer_count: u64,
    pub num_subjects: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClusterInfo {
    pub name: Option<String>,
    pub leader: Option<String>,
    pub replicas: Vec<PeerInfo>,
}

/// A non-leader replica as reported by the leader.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PeerInfo {
    pub name: String,
    pub current: bool,
    pub offline: bool,
    /// Nanoseconds since the peer was last seen.
    pub active: i64,
    pub lag: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceInfo {
    pub name: String,
    pub lag: u64,
    pub active: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ConsumerInfo {
    pub stream_name: String,
    pub name: String,
    pub num_ack_pending: u64,
    pub num_redelivered: u64,
    pub num_waiting: u64,
    pub num_pending: u64,
    pub delivered: SequenceInfo,
    pub ack_floor: SequenceInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SequenceInfo {
    pub consumer_seq: u64,
    pub stream_seq: u64,
    pub last_active: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MsgGetResponse {
    pub message: StoredMessage,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StoredMessage {
    pub subject: String,
    pub seq: u64,
    /// Base64 encoded body.
    #[serde(default)]
    pub data: Option<String>,
    /// Base64 encoded header block.
    #[serde(default)]
    pub hdrs: Option<String>,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AccountInfo {
    pub memory: u64,
    pub storage: u64,
    pub streams: u64,
    pub consumers: u64,
    pub limits: AccountLimits,
}

/// Account limits; `-1` means unlimited.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountLimits {
    pub max_memory: i64,
    pub max_storage: i64,
    pub max_streams: i64,
    pub max_consumers: i64,
}

impl Default for AccountLimits {
    fn default() -> Self {
        Self {
            max_memory: -1,
            max_storage: -1,
            max_streams: -1,
            max_consumers: -1,
        }
    }
}

/// Envelope of `$SYS.REQ.SERVER.PING.*` replies.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerApiResponse<T> {
    #[serde(default)]
    pub server: ServerIdent,
    pub data: T,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServerIdent {
    pub name: String,
    pub id: String,
    pub cluster: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JszData {
    pub meta_cluster: Option<MetaClusterInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MetaClusterInfo {
    pub name: String,
    pub leader: String,
    pub cluster_size: usize,
    pub replicas: Vec<PeerInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VarzData {
    pub server_name: String,
    pub version: String,
    pub cpu: f64,
    pub mem: u64,
    pub connections: u64,
    pub subscriptions: u64,
    pub tls_required: bool,
    pub auth_required: bool,
    pub jetstream: serde_json::Value,
}

impl VarzData {
    /// VARZ carries a `jetstream.config` block only when JetStream runs.
    pub fn jetstream_enabled(&self) -> bool {
        self.jetstream.get("config").is_some_and(|c| !c.is_null())
    }
}
