//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! check document (YAML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ExporterConfig (validated, immutable)
//!     → shared via Arc<ArcSwap<_>> with the collector
//!
//! With --watch:
//!     watcher.rs detects change
//!     → loader.rs loads new document
//!     → validation.rs validates
//!     → atomic swap of Arc<ExporterConfig>
//!     → next scrape observes new document
//! ```
//!
//! # Design Decisions
//! - A document is accepted or rejected as a unit
//! - Check `properties` stay undecoded until the handler runs
//! - A scrape holds one snapshot for its whole cycle

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{namespace_or_default, CheckConfig, ExporterConfig, DEFAULT_NAMESPACE};
