//! Time budgets for a scrape.
//!
//! # Responsibilities
//! - Derive the budget of one check from the per-check limit and the
//!   scrape deadline
//! - Tell the collector when a scrape has run out of time
//!
//! # Design Decisions
//! - Uses Tokio's `Instant` so paused-clock tests control the budget
//! - A scrape without a deadline gives every check its full limit

use std::time::Duration;

use tokio::time::Instant;

/// Budget for the next check, or `None` once `deadline` has passed.
pub fn check_budget(per_check: Duration, deadline: Option<Instant>) -> Option<Duration> {
    check_budget_at(per_check, deadline, Instant::now())
}

pub fn check_budget_at(per_check: Duration, deadline: Option<Instant>, now: Instant) -> Option<Duration> {
    match deadline {
        None => Some(per_check),
        Some(deadline) if deadline <= now => None,
        Some(deadline) => Some(per_check.min(deadline - now)),
    }
}

/// Deadline `budget` from now.
pub fn deadline_after(budget: Duration) -> Instant {
    Instant::now() + budget
}
