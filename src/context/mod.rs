//! Connection context subsystem.
//!
//! # Data Flow
//! ```text
//! check.context (or document default, or "default")
//!     → resolver.rs
//!         existing file?  → parse profile JSON
//!         otherwise       → <context dir>/<name>.json, or deferred reference
//!     → profile.rs connection_options()
//!         → (server list, ConnectionOptions)
//! ```
//!
//! # Design Decisions
//! - Resolved per check, never cached (checks may target different clusters)
//! - Unknown names fail at option derivation, not at lookup
//! - Errors are values; the collector turns them into CRITICAL results

pub mod profile;
pub mod resolver;

use std::path::PathBuf;
use thiserror::Error;

pub use profile::{parse_servers, Auth, ConnectionOptions, Profile, ProfileSettings, TlsFiles};
pub use resolver::ContextResolver;

/// Profile name used when neither the check nor the document names one.
pub const DEFAULT_CONTEXT: &str = "default";

/// Errors from resolving a context or deriving its options.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("could not read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown context \"{0}\"")]
    UnknownContext(String),

    #[error("context name \"{0}\" must not contain path separators")]
    InvalidName(String),

    #[error("invalid server url {0}")]
    InvalidUrl(String),

    #[error("tls cert and key must be set together")]
    IncompleteTls,

    #[error("{field} file {path:?} does not exist")]
    MissingFile { field: &'static str, path: PathBuf },
}
