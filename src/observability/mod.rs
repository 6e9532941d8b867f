//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Collector:
//!     → logging.rs ResultLog (one rendered line per check)
//!     → metrics.rs  (scrapes, scrape latency, checks by kind/status)
//!
//! Consumers:
//!     → stdout (text or JSON via tracing-subscriber)
//!     → /metrics (PrometheusHandle::render, after the check series)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - The result log is injected so tests can capture it
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use logging::{init_tracing, LogFormat, MemoryResultLog, ResultLog, TracingResultLog};
pub use metrics::{init_metrics, ExporterMetrics};
