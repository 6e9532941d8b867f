//! HTTP scrape surface.
//!
//! # Data Flow
//! ```text
//! GET /metrics
//!     → server.rs metrics_handler
//!     → Collector::collect(fresh SampleBuffer, now + scrape timeout)
//!     → check series (render_prometheus) + self-metrics (PrometheusHandle)
//!     → 200 text/plain; version=0.0.4
//!
//! GET /healthz → 200 "ok"
//! ```

pub mod server;

pub use server::{AppState, HttpServer, DEFAULT_SCRAPE_TIMEOUT, PROMETHEUS_CONTENT_TYPE};
