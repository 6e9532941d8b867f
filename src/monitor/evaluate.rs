//! Turning API responses into check outcomes.
//!
//! Everything here is free of I/O so the pass/fail rules can be tested
//! with canned responses.

use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

use crate::monitor::api::{
    AccountInfo, ConsumerInfo, MetaClusterInfo, PeerInfo, StoredMessage, StreamInfo, VarzData,
};
use crate::monitor::options::*;
use crate::monitor::MonitorError;
use crate::result::{CheckResult, PerfData, Severity};

/// Compare `value` against sentinel thresholds (`< 0` disables).
///
/// When both are enabled and `crit < warn` the check alerts on values at
/// or below the thresholds instead of at or above them.
pub fn apply_thresholds(result: &mut CheckResult, label: &str, value: f64, warn: i64, crit: i64) {
    let (warn, crit) = (warn as f64, crit as f64);
    let inverted = warn >= 0.0 && crit >= 0.0 && crit < warn;

    let (is_crit, is_warn) = if inverted {
        (value <= crit, value <= warn)
    } else {
        (crit >= 0.0 && value >= crit, warn >= 0.0 && value >= warn)
    };

    if !result.raise(Severity::Critical, is_crit, format!("{} {}", value, label)) {
        result.raise(Severity::Warning, is_warn, format!("{} {}", value, label));
    }
}

/// Upper-bound comparison for optional thresholds.
pub fn apply_upper(result: &mut CheckResult, label: &str, value: f64, warn: Option<f64>, crit: Option<f64>) {
    let is_crit = crit.is_some_and(|c| value >= c);
    if !result.raise(Severity::Critical, is_crit, format!("{} {}", label, value)) {
        let is_warn = warn.is_some_and(|w| value >= w);
        result.raise(Severity::Warning, is_warn, format!("{} {}", label, value));
    }
}

/// Attach a duration in seconds and compare it against optional bounds.
pub fn apply_duration(
    result: &mut CheckResult,
    name: &str,
    value: Duration,
    warn: Option<Duration>,
    crit: Option<Duration>,
) {
    result.attach_metric(
        PerfData::new(name, value.as_secs_f64())
            .with_unit("s")
            .with_thresholds(
                warn.map(|w| w.as_secs_f64()).unwrap_or(-1.0),
                crit.map(|c| c.as_secs_f64()).unwrap_or(-1.0),
            ),
    );

    let is_crit = crit.is_some_and(|c| value >= c);
    if !result.raise(Severity::Critical, is_crit, format!("{} {:.3}s", name, value.as_secs_f64())) {
        let is_warn = warn.is_some_and(|w| value >= w);
        result.raise(Severity::Warning, is_warn, format!("{} {:.3}s", name, value.as_secs_f64()));
    }
}

fn nanos(active: i64) -> Duration {
    Duration::from_nanos(active.max(0) as u64)
}

/// Replica health shared by the stream and meta checks.
pub fn evaluate_peers(
    result: &mut CheckResult,
    replicas: &[PeerInfo],
    lag_critical: Option<u64>,
    seen_critical: Option<Duration>,
) {
    let (mut offline, mut not_current, mut lagged, mut inactive) = (0, 0, 0, 0);

    for peer in replicas {
        if peer.offline {
            offline += 1;
            result.critical(format!("{} offline", peer.name));
            continue;
        }
        if !peer.current {
            not_current += 1;
            result.critical(format!("{} not current", peer.name));
        }
        if lag_critical.is_some_and(|max| peer.lag >= max) {
            lagged += 1;
            result.critical(format!("{} {} operations behind", peer.name, peer.lag));
        }
        let seen = nanos(peer.active);
        if seen_critical.is_some_and(|max| seen >= max) {
            inactive += 1;
            result.critical(format!("{} not seen for {:.0}s", peer.name, seen.as_secs_f64()));
        }
    }

    result.attach("peer_offline", offline as f64, "");
    result.attach("peer_not_current", not_current as f64, "");
    result.attach("peer_lagged", lagged as f64, "");
    result.attach("peer_inactive", inactive as f64, "");
}

pub fn evaluate_stream(result: &mut CheckResult, check: &StreamCheckOptions, info: &StreamInfo) {
    let msgs = info.state.messages as f64;
    result.attach_metric(
        PerfData::new("messages", msgs)
            .with_thresholds(check.msgs_warning as f64, check.msgs_critical as f64)
            .with_help("Messages stored in the stream"),
    );
    result.attach("bytes", info.state.bytes as f64, "B");
    result.attach("consumers", info.state.consumer_count as f64, "");
    apply_thresholds(result, "messages", msgs, check.msgs_warning, check.msgs_critical);

    let replicas = info.cluster.as_ref().map(|c| c.replicas.clone()).unwrap_or_default();
    if let Some(cluster) = &info.cluster {
        let leaderless = cluster.leader.as_deref().map_or(true, str::is_empty);
        result.raise(Severity::Critical, leaderless && !replicas.is_empty(), "no cluster leader");
    }

    let peers = replicas.len() + 1;
    result.attach("peers", peers as f64, "");
    if let Some(expect) = check.peer_expect {
        result.raise(
            Severity::Critical,
            peers != expect,
            format!("expected {} peers, got {}", expect, peers),
        );
    }
    evaluate_peers(result, &replicas, check.peer_lag_critical, check.peer_seen_critical);

    let sources = info.sources.len();
    result.attach("sources", sources as f64, "");
    if let Some(min) = check.min_sources {
        result.raise(Severity::Critical, sources < min, format!("{} sources, expected at least {}", sources, min));
    }
    if let Some(max) = check.max_sources {
        result.raise(Severity::Critical, sources > max, format!("{} sources, expected at most {}", sources, max));
    }

    result.ok(format!("{} messages", info.state.messages));
}

pub fn evaluate_consumer(
    result: &mut CheckResult,
    check: &ConsumerCheckOptions,
    info: &ConsumerInfo,
    now: DateTime<Utc>,
) {
    let counters = [
        ("ack_pending", info.num_ack_pending, check.ack_outstanding_critical),
        ("waiting", info.num_waiting, check.waiting_critical),
        ("pending", info.num_pending, check.unprocessed_critical),
        ("redelivered", info.num_redelivered, check.redelivery_critical),
    ];
    for (name, value, crit) in counters {
        result.attach(name, value as f64, "");
        result.raise(
            Severity::Critical,
            crit.is_some_and(|c| value >= c),
            format!("{} {}", name, value),
        );
    }

    let activity = [
        ("last_delivery", info.delivered.last_active, check.last_delivery_critical),
        ("last_ack", info.ack_floor.last_active, check.last_ack_critical),
    ];
    for (name, last_active, crit) in activity {
        let Some(crit) = crit else { continue };
        match last_active {
            Some(at) => {
                let age = (now - at).to_std().unwrap_or(Duration::ZERO);
                apply_duration(result, name, age, None, Some(crit));
            }
            None => result.critical(format!("no {} recorded", name.replace('_', " "))),
        }
    }

    result.ok(format!("{} pending", info.num_pending));
}

pub fn evaluate_message(
    result: &mut CheckResult,
    check: &MessageCheckOptions,
    msg: &StoredMessage,
    now: DateTime<Utc>,
) -> Result<(), MonitorError> {
    let body = match &msg.data {
        Some(data) => STANDARD
            .decode(data)
            .map_err(|e| MonitorError::Protocol(format!("invalid message body encoding: {}", e)))?,
        None => Vec::new(),
    };
    let text = String::from_utf8_lossy(&body);

    let age = if check.body_as_timestamp {
        let stamp: f64 = text
            .trim()
            .parse()
            .map_err(|_| MonitorError::Protocol(format!("body {:?} is not a unix timestamp", text.trim())))?;
        let now_secs = now.timestamp_millis() as f64 / 1000.0;
        Duration::from_secs_f64((now_secs - stamp).max(0.0))
    } else {
        (now - msg.time).to_std().unwrap_or(Duration::ZERO)
    };
    apply_duration(result, "age", age, check.age_warning, check.age_critical);
    result.attach("size", body.len() as f64, "B");

    if let Some(content) = &check.content {
        result.raise(Severity::Critical, !text.contains(content.as_str()), "content did not match");
    }

    result.ok(format!("seq {} on {}", msg.seq, msg.subject));
    Ok(())
}

pub fn evaluate_meta(result: &mut CheckResult, check: &MetaCheckOptions, meta: Option<&MetaClusterInfo>) {
    let Some(meta) = meta else {
        result.critical("no meta cluster information received");
        return;
    };

    result.raise(Severity::Critical, meta.leader.is_empty(), "no meta leader");

    let peers = meta.replicas.len() + 1;
    result.attach("peers", peers as f64, "");
    if let Some(expect) = check.expect_peers {
        result.raise(
            Severity::Critical,
            peers != expect,
            format!("expected {} peers, got {}", expect, peers),
        );
    }
    evaluate_peers(result, &meta.replicas, check.lag_critical, check.seen_critical);

    result.ok(format!("{} peers led by {}", peers, meta.leader));
}

fn usage_pct(used: u64, limit: i64) -> Option<f64> {
    (limit > 0).then(|| used as f64 * 100.0 / limit as f64)
}

pub fn evaluate_jetstream_account(result: &mut CheckResult, check: &JetStreamAccountOptions, info: &AccountInfo) {
    let resources = [
        ("memory", info.memory, info.limits.max_memory, check.memory_warning, check.memory_critical, "B"),
        ("storage", info.storage, info.limits.max_storage, check.file_warning, check.file_critical, "B"),
        ("streams", info.streams, info.limits.max_streams, check.streams_warning, check.streams_critical, ""),
        ("consumers", info.consumers, info.limits.max_consumers, check.consumers_warning, check.consumers_critical, ""),
    ];

    for (name, used, limit, warn, crit, unit) in resources {
        result.attach(name, used as f64, unit);
        if let Some(pct) = usage_pct(used, limit) {
            result.attach_metric(
                PerfData::new(format!("{}_pct", name), pct)
                    .with_unit("%")
                    .with_thresholds(warn as f64, crit as f64),
            );
            apply_thresholds(result, &format!("% {} used", name), pct.round(), warn, crit);
        }
    }

    result.ok(format!("{} streams, {} consumers", info.streams, info.consumers));
}

pub fn evaluate_server(result: &mut CheckResult, check: &ServerCheckOptions, varz: &VarzData) {
    result.attach("cpu", varz.cpu, "%");
    result.attach("mem", varz.mem as f64, "B");
    result.attach("connections", varz.connections as f64, "");
    result.attach("subscriptions", varz.subscriptions as f64, "");

    apply_upper(result, "cpu", varz.cpu, check.cpu_warning, check.cpu_critical);
    apply_upper(
        result,
        "memory",
        varz.mem as f64,
        check.memory_warning.map(|v| v as f64),
        check.memory_critical.map(|v| v as f64),
    );
    apply_upper(
        result,
        "connections",
        varz.connections as f64,
        check.connections_warning.map(|v| v as f64),
        check.connections_critical.map(|v| v as f64),
    );
    apply_upper(
        result,
        "subscriptions",
        varz.subscriptions as f64,
        check.subscriptions_warning.map(|v| v as f64),
        check.subscriptions_critical.map(|v| v as f64),
    );

    result.raise(
        Severity::Critical,
        check.jetstream_required && !varz.jetstream_enabled(),
        "JetStream not enabled",
    );
    result.raise(Severity::Critical, check.tls_required && !varz.tls_required, "TLS not required");
    result.raise(Severity::Critical, check.auth_required && !varz.auth_required, "authentication not required");

    result.ok(format!("{} {}", varz.server_name, varz.version));
}

pub fn evaluate_kv_bucket(result: &mut CheckResult, check: &KvCheckOptions, info: &StreamInfo) {
    let values = info.state.messages as f64;
    result.attach_metric(
        PerfData::new("values", values)
            .with_thresholds(check.values_warning as f64, check.values_critical as f64)
            .with_help("Values stored in the bucket"),
    );
    result.attach("bytes", info.state.bytes as f64, "B");
    result.attach("replicas", info.config.num_replicas.max(1) as f64, "");
    apply_thresholds(result, "values", values, check.values_warning, check.values_critical);

    result.ok(format!("bucket {}", check.bucket));
}

/// Interpret the latest revision of the watched key.
pub fn evaluate_kv_key(result: &mut CheckResult, key: &str, latest: Result<StoredMessage, MonitorError>) -> Result<(), MonitorError> {
    let msg = match latest {
        Ok(msg) => msg,
        Err(e) if e.is_not_found() => {
            result.critical(format!("key {} not found", key));
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    let headers = match &msg.hdrs {
        Some(hdrs) => String::from_utf8_lossy(&STANDARD.decode(hdrs).unwrap_or_default()).to_string(),
        None => String::new(),
    };
    let removed = headers.lines().any(|l| {
        let l = l.trim();
        l.eq_ignore_ascii_case("KV-Operation: DEL") || l.eq_ignore_ascii_case("KV-Operation: PURGE")
    });

    if !result.raise(Severity::Critical, removed, format!("key {} was deleted", key)) {
        result.ok(format!("key {} found", key));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::api::{AccountLimits, ClusterInfo, StreamState};

    fn result(kind: &str) -> CheckResult {
        CheckResult::new("test", kind, "natscli")
    }

    fn peer(name: &str) -> PeerInfo {
        PeerInfo {
            name: name.to_string(),
            current: true,
            offline: false,
            active: 100_000_000,
            lag: 0,
        }
    }

    #[test]
    fn test_thresholds_disabled_never_fire() {
        let mut r = result("kv");
        apply_thresholds(&mut r, "values", 1_000_000.0, DISABLED, DISABLED);
        assert_eq!(r.severity(), Severity::Ok);
    }

    #[test]
    fn test_thresholds_normal_and_inverted() {
        let mut r = result("kv");
        apply_thresholds(&mut r, "values", 15.0, 10, 20);
        assert_eq!(r.severity(), Severity::Warning);

        let mut r = result("kv");
        apply_thresholds(&mut r, "values", 25.0, 10, 20);
        assert_eq!(r.severity(), Severity::Critical);

        // Alert when too few values.
        let mut r = result("kv");
        apply_thresholds(&mut r, "values", 3.0, 10, 5);
        assert_eq!(r.severity(), Severity::Critical);

        let mut r = result("kv");
        apply_thresholds(&mut r, "values", 8.0, 10, 5);
        assert_eq!(r.severity(), Severity::Warning);

        let mut r = result("kv");
        apply_thresholds(&mut r, "values", 50.0, 10, 5);
        assert_eq!(r.severity(), Severity::Ok);
    }

    #[test]
    fn test_stream_replicas() {
        let mut lagging = peer("n3");
        lagging.lag = 5000;
        let info = StreamInfo {
            state: StreamState {
                messages: 42,
                ..Default::default()
            },
            cluster: Some(ClusterInfo {
                name: Some("c1".into()),
                leader: Some("n1".into()),
                replicas: vec![peer("n2"), lagging],
            }),
            ..Default::default()
        };
        let check = StreamCheckOptions {
            stream: "ORDERS".into(),
            peer_expect: Some(3),
            peer_lag_critical: Some(1000),
            peer_seen_critical: None,
            msgs_warning: DISABLED,
            msgs_critical: DISABLED,
            min_sources: None,
            max_sources: None,
        };

        let mut r = result("stream");
        evaluate_stream(&mut r, &check, &info);
        assert_eq!(r.severity(), Severity::Critical);
        assert!(r.render().contains("Crit:n3 5000 operations behind"));

        let snap = r.snapshot();
        let peers = snap.perf_data.iter().find(|p| p.name == "peers").unwrap();
        assert_eq!(peers.value, 3.0);
    }

    #[test]
    fn test_stream_healthy() {
        let info = StreamInfo {
            state: StreamState {
                messages: 10,
                ..Default::default()
            },
            ..Default::default()
        };
        let check: StreamCheckOptions = serde_yaml::from_str("stream: ORDERS\npeer_expect: 1").unwrap();
        let mut r = result("stream");
        evaluate_stream(&mut r, &check, &info);
        assert_eq!(r.severity(), Severity::Ok);
        assert!(r.render().starts_with("OK test OK:10 messages"));
    }

    #[test]
    fn test_consumer_counters() {
        let info = ConsumerInfo {
            num_ack_pending: 500,
            num_pending: 3,
            ..Default::default()
        };
        let check: ConsumerCheckOptions =
            serde_yaml::from_str("stream: S\nconsumer: C\nack_outstanding_critical: 100").unwrap();
        let mut r = result("consumer");
        evaluate_consumer(&mut r, &check, &info, Utc::now());
        assert_eq!(r.severity(), Severity::Critical);
        assert!(r.render().contains("Crit:ack_pending 500"));
    }

    #[test]
    fn test_consumer_last_delivery_age() {
        let now = Utc::now();
        let mut info = ConsumerInfo::default();
        info.delivered.last_active = Some(now - chrono::Duration::minutes(10));
        let check: ConsumerCheckOptions =
            serde_yaml::from_str("stream: S\nconsumer: C\nlast_delivery_critical: 5m").unwrap();

        let mut r = result("consumer");
        evaluate_consumer(&mut r, &check, &info, now);
        assert_eq!(r.severity(), Severity::Critical);
    }

    #[test]
    fn test_message_age_and_content() {
        let now = Utc::now();
        let msg = StoredMessage {
            subject: "ticks".into(),
            seq: 7,
            data: Some(STANDARD.encode("hello world")),
            hdrs: None,
            time: now - chrono::Duration::seconds(90),
        };
        let check: MessageCheckOptions =
            serde_yaml::from_str("stream: S\nsubject: ticks\nage_warning: 1m\nage_critical: 5m\ncontent: world").unwrap();

        let mut r = result("message");
        evaluate_message(&mut r, &check, &msg, now).unwrap();
        assert_eq!(r.severity(), Severity::Warning);

        let check: MessageCheckOptions = serde_yaml::from_str("stream: S\nsubject: ticks\ncontent: absent").unwrap();
        let mut r = result("message");
        evaluate_message(&mut r, &check, &msg, now).unwrap();
        assert_eq!(r.severity(), Severity::Critical);
    }

    #[test]
    fn test_message_body_timestamp() {
        let now = Utc::now();
        let msg = StoredMessage {
            subject: "ticks".into(),
            seq: 1,
            data: Some(STANDARD.encode(format!("{}", now.timestamp() - 600))),
            hdrs: None,
            time: now,
        };
        let check: MessageCheckOptions =
            serde_yaml::from_str("stream: S\nsubject: ticks\nage_critical: 5m\nbody_as_timestamp: true").unwrap();
        let mut r = result("message");
        evaluate_message(&mut r, &check, &msg, now).unwrap();
        assert_eq!(r.severity(), Severity::Critical);
    }

    #[test]
    fn test_meta_without_leader() {
        let meta = MetaClusterInfo {
            name: "c1".into(),
            leader: String::new(),
            cluster_size: 3,
            replicas: vec![peer("n2"), peer("n3")],
        };
        let mut r = result("meta");
        evaluate_meta(&mut r, &MetaCheckOptions::default(), Some(&meta));
        assert_eq!(r.severity(), Severity::Critical);

        let mut r = result("meta");
        evaluate_meta(&mut r, &MetaCheckOptions::default(), None);
        assert_eq!(r.severity(), Severity::Critical);
    }

    #[test]
    fn test_jetstream_usage() {
        let info = AccountInfo {
            memory: 900,
            storage: 10,
            streams: 1,
            consumers: 1,
            limits: AccountLimits {
                max_memory: 1000,
                ..Default::default()
            },
        };
        let check: JetStreamAccountOptions =
            serde_yaml::from_str("memory_warning: 75\nmemory_critical: 90").unwrap();
        let mut r = result("jetstream");
        evaluate_jetstream_account(&mut r, &check, &info);
        assert_eq!(r.severity(), Severity::Critical);

        let mut r = result("jetstream");
        evaluate_jetstream_account(&mut r, &JetStreamAccountOptions::default(), &info);
        assert_eq!(r.severity(), Severity::Ok);
    }

    #[test]
    fn test_server_requirements() {
        let varz = VarzData {
            server_name: "n1".into(),
            cpu: 12.0,
            connections: 5,
            ..Default::default()
        };
        let check: ServerCheckOptions =
            serde_yaml::from_str("name: n1\njetstream_required: true\ncpu_warning: 10").unwrap();
        let mut r = result("server");
        evaluate_server(&mut r, &check, &varz);
        assert_eq!(r.severity(), Severity::Critical);
        let rendered = r.render();
        assert!(rendered.contains("Crit:JetStream not enabled"));
        assert!(rendered.contains("Warn:cpu 12"));
    }

    #[test]
    fn test_kv_default_thresholds_only_report() {
        let info = StreamInfo {
            state: StreamState {
                messages: 1_000_000,
                ..Default::default()
            },
            ..Default::default()
        };
        let check: KvCheckOptions = serde_yaml::from_str("bucket: CONFIG").unwrap();
        let mut r = result("kv");
        evaluate_kv_bucket(&mut r, &check, &info);
        assert_eq!(r.severity(), Severity::Ok);
    }

    #[test]
    fn test_kv_key_states() {
        let mut r = result("kv");
        let missing = Err(MonitorError::Api {
            code: 404,
            description: "no message found".into(),
        });
        evaluate_kv_key(&mut r, "color", missing).unwrap();
        assert_eq!(r.severity(), Severity::Critical);

        let deleted = StoredMessage {
            subject: "$KV.CONFIG.color".into(),
            seq: 3,
            data: None,
            hdrs: Some(STANDARD.encode("NATS/1.0\r\nKV-Operation: DEL\r\n\r\n")),
            time: Utc::now(),
        };
        let mut r = result("kv");
        evaluate_kv_key(&mut r, "color", Ok(deleted)).unwrap();
        assert_eq!(r.severity(), Severity::Critical);

        let other = Err(MonitorError::Timeout("request".into()));
        let mut r = result("kv");
        assert!(evaluate_kv_key(&mut r, "color", other).is_err());
    }
}
