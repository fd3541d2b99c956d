//! Per-repository enrichment
//!
//! For each collected repository, lists its resolved pull requests, keeps
//! the reviewed ones, fetches a bounded number of details and reduces them
//! to averages.

mod enricher;
mod types;

pub use enricher::{derive_metrics, ItemEnricher};
pub use types::{DropCounts, DropReason, MetricsOutcome};
