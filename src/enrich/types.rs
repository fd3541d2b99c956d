//! Enrichment outcome types

use crate::model::{EnrichmentSummary, PullRequestMetrics};
use serde::Serialize;
use std::ops::AddAssign;

/// Why a pull request was left out of the averages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// No creation or resolution time
    Unresolved,
    /// Resolved faster than the minimum duration
    TooFast,
}

impl std::fmt::Display for DropReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved => f.write_str("unresolved"),
            Self::TooFast => f.write_str("resolved too fast"),
        }
    }
}

/// Per-reason counts of dropped sub-items
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    pub unresolved: u64,
    pub too_fast: u64,
    /// Detail was null, or its request kept failing transiently
    pub unavailable: u64,
}

impl DropCounts {
    /// Count one drop
    pub fn record(&mut self, reason: DropReason) {
        match reason {
            DropReason::Unresolved => self.unresolved += 1,
            DropReason::TooFast => self.too_fast += 1,
        }
    }

    /// Total dropped
    pub fn total(&self) -> u64 {
        self.unresolved + self.too_fast + self.unavailable
    }
}

impl AddAssign for DropCounts {
    fn add_assign(&mut self, other: Self) {
        self.unresolved += other.unresolved;
        self.too_fast += other.too_fast;
        self.unavailable += other.unavailable;
    }
}

/// Result of enriching one item
#[derive(Debug, Clone, Default)]
pub struct MetricsOutcome {
    /// Reviewed pull requests found by the listing, before capping
    pub reviewed_count: u64,
    /// Metrics of the sub-items that survived
    pub metrics: Vec<PullRequestMetrics>,
    pub drops: DropCounts,
    /// Cancellation stopped the detail loop early
    pub cancelled: bool,
}

impl MetricsOutcome {
    /// Averages over the surviving sub-items
    pub fn summary(&self) -> EnrichmentSummary {
        EnrichmentSummary::from_metrics(self.reviewed_count, &self.metrics)
    }
}
