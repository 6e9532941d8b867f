//! Exporter self-metrics.
//!
//! # Metrics
//! - `<ns>_exporter_scrapes_total` (counter): collect cycles run
//! - `<ns>_exporter_scrape_duration_seconds` (histogram): collect cycle latency
//! - `<ns>_exporter_checks_total` (counter): checks run by kind, status
//! - `<ns>_exporter_checks_skipped_total` (counter): checks with an unknown kind,
//!   always labelled `kind="unknown"`; the typed kind only goes to the log
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   the calls are no-ops
//! - Rendered by the Prometheus handle and appended to the scrape response

use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::result::Severity;

/// Install the global Prometheus recorder.
pub fn init_metrics() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    tracing::info!("Self-metrics recorder installed");
    Ok(handle)
}

/// Namespaced metric names of one exporter.
#[derive(Debug, Clone)]
pub struct ExporterMetrics {
    scrapes: String,
    scrape_duration: String,
    checks: String,
    skipped: String,
}

impl ExporterMetrics {
    pub fn new(namespace: &str) -> Self {
        Self {
            scrapes: format!("{}_exporter_scrapes_total", namespace),
            scrape_duration: format!("{}_exporter_scrape_duration_seconds", namespace),
            checks: format!("{}_exporter_checks_total", namespace),
            skipped: format!("{}_exporter_checks_skipped_total", namespace),
        }
    }

    pub fn record_scrape(&self, elapsed: Duration) {
        metrics::counter!(self.scrapes.clone()).increment(1);
        metrics::histogram!(self.scrape_duration.clone()).record(elapsed.as_secs_f64());
    }

    pub fn record_check(&self, kind: &str, status: Severity) {
        metrics::counter!(
            self.checks.clone(),
            "kind" => kind.to_string(),
            "status" => status.as_str()
        )
        .increment(1);
    }

    pub fn record_skipped(&self) {
        metrics::counter!(self.skipped.clone(), "kind" => "unknown").increment(1);
    }
}
