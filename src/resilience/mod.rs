//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! scrape deadline (now + scrape timeout)
//!     → timeouts.rs check_budget(per-check limit, deadline)
//!         None      → remaining checks abandoned
//!         Some(d)   → handler runs under tokio::time::timeout(d)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every check has a deadline
//! - A slow check costs its own result, never the whole scrape

pub mod timeouts;

pub use timeouts::{check_budget, deadline_after};
