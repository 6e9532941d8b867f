//! Check dispatcher.
//!
//! # Data Flow
//! ```text
//! scrape (http/server.rs)
//!     → Collector::collect(sink, deadline)
//!         config snapshot (one per cycle)
//!         for each check, in order:
//!             deadline passed?  → abandon the rest
//!             Registry::get     → unknown: log, skip, no series
//!             resolve context  → failure: CRITICAL result
//!             handler under timeout(min(check budget, time left))
//!                 panic → CRITICAL "check panicked"
//!             CheckResult::emit → sink, ResultLog, self-metrics
//!     → sink.rs SampleBuffer::render_prometheus
//! ```
//!
//! # Design Decisions
//! - Checks run sequentially; a scrape costs at most the scrape timeout
//! - Every check gets a fresh result; nothing is cached between scrapes
//! - One check's failure never affects another's series, panics included

pub mod dispatcher;
pub mod sink;

pub use dispatcher::{CollectSummary, Collector, DEFAULT_CHECK_TIMEOUT};
pub use sink::{MetricSink, Sample, SampleBuffer};
