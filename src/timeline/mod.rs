//! Timeline aggregator — one patient's protocol occurrences merged into a
//! single day-grouped view.
//!
//! Collects occurrences from every selected instance, derives display
//! statuses as of a date (nothing is written back), and orders same-day
//! entries deterministically. Returns everything in a single payload.

mod aggregates;
mod fetch;
mod types;

pub use aggregates::build_timeline;
pub use fetch::derive_status;
pub use types::*;

// ── Tests ──────────────────────────────────────────────────────────────────
