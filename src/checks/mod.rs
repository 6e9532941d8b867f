//! Check kind dispatch.
//!
//! # Data Flow
//! ```text
//! CheckConfig.kind ──→ Registry::get (exact match)
//!     unknown → None (collector logs and skips)
//!     known   → CheckHandler::run
//!                 decode properties into options
//!                 Monitor::check_* → CheckResult
//! ```
//!
//! # Design Decisions
//! - The set of kinds is closed; the registry is built once and read-only
//! - Kind lookup happens before context resolution, so unknown kinds never
//!   produce a series even when their context is broken

pub mod handlers;
pub mod kind;
pub mod registry;

pub use handlers::{CheckHandler, PropertiesError, Target};
pub use kind::CheckKind;
pub use registry::Registry;
