//! Check outcome subsystem.
//!
//! # Data Flow
//! ```text
//! collector creates CheckResult{name, kind, namespace}
//!     → handler raises severity / attaches perf data
//!     → snapshot()
//!         → render() → result log line (Nagios or JSON)
//!         → emit()   → status_code series + one series per perf item
//! ```
//!
//! # Design Decisions
//! - Severity escalates only; CRITICAL is terminal
//! - `raise` returns whether it fired so handlers can stop the failing step
//! - Rendering and emission work on an immutable snapshot

pub mod check_result;
pub mod perfdata;
pub mod severity;

pub use check_result::{CheckResult, RenderFormat, ResultSnapshot};
pub use perfdata::PerfData;
pub use severity::Severity;
