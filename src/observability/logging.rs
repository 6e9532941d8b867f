//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber (text or JSON)
//! - Carry the per-check result line through an injected [`ResultLog`]
//!
//! # Design Decisions
//! - `RUST_LOG` wins over `--log-level`, which wins over the default filter
//! - Result lines are logged at a level matching their severity

use std::sync::Mutex;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::result::{CheckResult, Severity};

pub const DEFAULT_FILTER: &str = "nats_check_exporter=info,tower_http=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Install the global subscriber.
pub fn init_tracing(level: Option<&str>, format: LogFormat) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level.unwrap_or(DEFAULT_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).try_init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    }
}

/// Destination of the rendered line of every finished check.
pub trait ResultLog: Send + Sync {
    fn record(&self, result: &CheckResult);
}

/// Forwards result lines to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingResultLog;

impl ResultLog for TracingResultLog {
    fn record(&self, result: &CheckResult) {
        let line = result.render();
        match result.severity() {
            Severity::Ok => tracing::info!(check = %result.name(), kind = %result.check(), "{}", line),
            Severity::Warning => tracing::warn!(check = %result.name(), kind = %result.check(), "{}", line),
            Severity::Critical => tracing::error!(check = %result.name(), kind = %result.check(), "{}", line),
        }
    }
}

/// Keeps result lines in memory.
#[derive(Debug, Default)]
pub struct MemoryResultLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl ResultLog for MemoryResultLog {
    fn record(&self, result: &CheckResult) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(result.render());
        }
    }
}
