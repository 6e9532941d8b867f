//! The scrape-time check loop.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::FutureExt;
use tokio::time::Instant;

use crate::checks::{CheckHandler, Registry, Target};
use crate::collector::sink::MetricSink;
use crate::config::{CheckConfig, ExporterConfig};
use crate::context::ContextResolver;
use crate::monitor::Monitor;
use crate::observability::{ExporterMetrics, ResultLog};
use crate::resilience::check_budget;
use crate::result::{CheckResult, RenderFormat, ResultSnapshot};

pub const DEFAULT_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// What one collect cycle did.
#[derive(Debug, Clone, Default)]
pub struct CollectSummary {
    /// Checks whose series were written to the sink.
    pub emitted: usize,
    /// Checks with an unknown kind.
    pub skipped: usize,
    /// Checks abandoned because the scrape deadline passed.
    pub aborted: usize,
    pub results: Vec<ResultSnapshot>,
}

/// Runs every configured check on demand and writes the outcomes.
pub struct Collector {
    namespace: String,
    config: Arc<ArcSwap<ExporterConfig>>,
    resolver: ContextResolver,
    registry: Registry,
    monitor: Arc<dyn Monitor>,
    log: Arc<dyn ResultLog>,
    check_timeout: Duration,
    render_format: RenderFormat,
    metrics: ExporterMetrics,
}

impl Collector {
    pub fn new(
        namespace: impl Into<String>,
        config: Arc<ArcSwap<ExporterConfig>>,
        resolver: ContextResolver,
        registry: Registry,
        monitor: Arc<dyn Monitor>,
        log: Arc<dyn ResultLog>,
    ) -> Self {
        let namespace = namespace.into();
        Self {
            metrics: ExporterMetrics::new(&namespace),
            namespace,
            config,
            resolver,
            registry,
            monitor,
            log,
            check_timeout: DEFAULT_CHECK_TIMEOUT,
            render_format: RenderFormat::Nagios,
        }
    }

    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    pub fn with_render_format(mut self, format: RenderFormat) -> Self {
        self.render_format = format;
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The configuration the next scrape will use.
    pub fn config(&self) -> Arc<ExporterConfig> {
        self.config.load_full()
    }

    /// Series are only known after the checks ran, so nothing is declared
    /// up front.
    pub fn describe(&self) -> Vec<String> {
        Vec::new()
    }

    /// Run every check once, in declaration order, writing their series
    /// into `sink`. Checks still pending when `deadline` passes are
    /// abandoned.
    pub async fn collect(&self, sink: &mut dyn MetricSink, deadline: Option<Instant>) -> CollectSummary {
        let started = Instant::now();
        let config = self.config.load_full();
        let mut summary = CollectSummary::default();

        for (idx, check) in config.checks.iter().enumerate() {
            let Some(budget) = check_budget(self.check_timeout, deadline) else {
                summary.aborted = config.checks.len() - idx;
                tracing::warn!(
                    remaining = summary.aborted,
                    next = %check.name,
                    "Scrape deadline passed, abandoning remaining checks"
                );
                break;
            };

            let Some(handler) = self.registry.get(&check.kind) else {
                tracing::warn!(check = %check.name, kind = %check.kind, "Unknown check kind");
                self.metrics.record_skipped();
                summary.skipped += 1;
                continue;
            };

            let result = self.run_check(&config, check, handler.as_ref(), budget).await;

            result.emit(sink);
            self.log.record(&result);
            self.metrics.record_check(&check.kind, result.severity());
            summary.emitted += 1;
            summary.results.push(result.snapshot());
        }

        self.metrics.record_scrape(started.elapsed());
        tracing::debug!(
            emitted = summary.emitted,
            skipped = summary.skipped,
            aborted = summary.aborted,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Collect cycle finished"
        );
        summary
    }

    async fn run_check(
        &self,
        config: &ExporterConfig,
        check: &CheckConfig,
        handler: &dyn CheckHandler,
        budget: Duration,
    ) -> CheckResult {
        let mut result = CheckResult::new(&check.name, &check.kind, &self.namespace)
            .with_render_format(self.render_format);

        let context = check.context_name(&config.context);
        let target = match self.resolver.resolve(context).and_then(|p| p.connection_options()) {
            Ok((servers, options)) => Target { servers, options },
            Err(e) => {
                tracing::debug!(check = %check.name, context = %context, error = %e, "Context unusable");
                result.critical(format!("could not load context: {}", e));
                return result;
            }
        };

        let run = AssertUnwindSafe(handler.run(self.monitor.as_ref(), &target, check, &mut result)).catch_unwind();
        let outcome = tokio::time::timeout(budget, run).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(panic)) => {
                let reason = panic_reason(panic.as_ref());
                tracing::error!(check = %check.name, kind = %check.kind, reason = %reason, "Check panicked");
                result.critical(format!("check panicked: {}", reason));
            }
            Err(_) => {
                let budget = Duration::from_millis(budget.as_millis() as u64);
                result.critical(format!(
                    "check timed out after {}",
                    humantime_serde::re::humantime::format_duration(budget)
                ));
            }
        }

        result
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl std::fmt::Debug for Collector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collector")
            .field("namespace", &self.namespace)
            .field("registry", &self.registry)
            .field("check_timeout", &self.check_timeout)
            .finish()
    }
}
