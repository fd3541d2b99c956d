//! Driver types
//!
//! The run report and the output bundle of one pipeline run.

use crate::enrich::DropCounts;
use crate::model::RepositoryRecord;
use crate::output::ChartSeries;
use crate::stats::{AggregateResults, MetricTable};
use serde::Serialize;

/// What a run did, including everything that went partially wrong
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    /// Repositories asked for
    pub requested: u32,
    pub batches_planned: u32,
    pub batches_issued: u32,
    /// Repositories collected before filtering
    pub collected: usize,
    /// Search hits that were not usable repository nodes
    pub malformed: usize,
    /// Repositories removed by the keyword filter
    pub excluded: usize,
    /// How top-level collection ended
    pub halt: String,
    /// Failure that cut top-level collection short, if any
    pub collection_error: Option<String>,
    /// Repositories enriched successfully
    pub enriched: usize,
    /// Repositories whose enrichment aborted; their summary is zero-filled
    pub enrichment_failures: usize,
    /// Sub-items left out of enrichment averages
    pub dropped: DropCounts,
    pub analyzed: usize,
    pub analysis_failures: usize,
    /// Labels of aggregates that could not be computed
    pub undefined_aggregates: Vec<String>,
    pub cancelled: bool,
    pub duration_ms: u64,
}

impl RunReport {
    /// Whether anything was lost along the way
    pub fn is_partial(&self) -> bool {
        self.cancelled
            || self.collection_error.is_some()
            || self.enrichment_failures > 0
            || self.analysis_failures > 0
    }

    pub fn add_enrichment_failure(&mut self) {
        self.enrichment_failures += 1;
    }

    pub fn add_analysis_failure(&mut self) {
        self.analysis_failures += 1;
    }
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Output table, restricted to the configured fields
    pub table: MetricTable,
    /// Records in collection order
    pub records: Vec<RepositoryRecord>,
    pub aggregates: AggregateResults,
    /// Series for the chart collaborator
    pub series: Vec<ChartSeries>,
    pub report: RunReport,
}
