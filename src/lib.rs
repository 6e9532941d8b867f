//! NATS check exporter library.

pub mod checks;
pub mod collector;
pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod monitor;
pub mod observability;
pub mod resilience;
pub mod result;

pub use collector::Collector;
pub use config::ExporterConfig;
pub use lifecycle::Shutdown;
pub use result::{CheckResult, Severity};
