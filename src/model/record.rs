//! Flat per-repository records and their table layout

use crate::error::Result;
use crate::stats::{Cell, MetricTable};
use crate::types::round_to;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names of the record table
pub mod columns {
    pub const NAME: &str = "name";
    pub const OWNER: &str = "owner";
    pub const URL: &str = "url";
    pub const DESCRIPTION: &str = "description";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const STAR_COUNT: &str = "star_count";
    pub const MERGED_PR_COUNT: &str = "merged_pr_count";
    pub const RELEASE_COUNT: &str = "release_count";
    pub const OPEN_ISSUE_COUNT: &str = "open_issue_count";
    pub const CLOSED_ISSUE_COUNT: &str = "closed_issue_count";
    pub const PRIMARY_LANGUAGE: &str = "primary_language";

    pub const REVIEWED_PR_COUNT: &str = "reviewed_pr_count";
    pub const SAMPLED_PR_COUNT: &str = "sampled_pr_count";
    pub const AVG_ANALYSIS_HOURS: &str = "avg_analysis_hours";
    pub const AVG_FILES: &str = "avg_files";
    pub const AVG_ADDITIONS: &str = "avg_additions";
    pub const AVG_DELETIONS: &str = "avg_deletions";
    pub const AVG_DESCRIPTION_LENGTH: &str = "avg_description_length";
    pub const AVG_COMMENTS: &str = "avg_comments";
    pub const AVG_PARTICIPANTS: &str = "avg_participants";
    pub const AVG_REVIEWS: &str = "avg_reviews";
    pub const AVG_INTERACTIONS: &str = "avg_interactions";
    pub const MERGE_RATE: &str = "merge_rate";

    /// Columns every record carries
    pub const BASE: &[&str] = &[
        NAME,
        OWNER,
        URL,
        DESCRIPTION,
        CREATED_AT,
        UPDATED_AT,
        STAR_COUNT,
        MERGED_PR_COUNT,
        RELEASE_COUNT,
        OPEN_ISSUE_COUNT,
        CLOSED_ISSUE_COUNT,
        PRIMARY_LANGUAGE,
    ];

    /// Columns added when enrichment ran
    pub const ENRICHMENT: &[&str] = &[
        REVIEWED_PR_COUNT,
        SAMPLED_PR_COUNT,
        AVG_ANALYSIS_HOURS,
        AVG_FILES,
        AVG_ADDITIONS,
        AVG_DELETIONS,
        AVG_DESCRIPTION_LENGTH,
        AVG_COMMENTS,
        AVG_PARTICIPANTS,
        AVG_REVIEWS,
        AVG_INTERACTIONS,
        MERGE_RATE,
    ];
}

/// Metrics derived from one resolved pull request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequestMetrics {
    pub number: u64,
    /// Hours between creation and resolution
    pub analysis_hours: f64,
    pub file_count: u64,
    pub additions: u64,
    pub deletions: u64,
    /// Characters in the body text
    pub description_length: u64,
    pub comments: u64,
    pub participants: u64,
    pub reviews: u64,
    /// comments + participants + reviews
    pub interactions: u64,
    pub merged: bool,
}

/// Per-repository averages over its sampled pull requests.
///
/// The default value is the zero-filled summary used when enrichment was
/// skipped or failed for an item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrichmentSummary {
    /// Reviewed pull requests found by the listing
    pub reviewed_count: u64,
    /// Pull requests that survived filtering and were averaged
    pub sampled_count: u64,
    pub avg_analysis_hours: f64,
    pub avg_files: f64,
    pub avg_additions: f64,
    pub avg_deletions: f64,
    pub avg_description_length: f64,
    pub avg_comments: f64,
    pub avg_participants: f64,
    pub avg_reviews: f64,
    pub avg_interactions: f64,
    /// Fraction of sampled pull requests that were merged
    pub merge_rate: f64,
}

impl EnrichmentSummary {
    /// Average a set of per-PR metrics.
    ///
    /// Hours are rounded to 2 decimals, counts to 1, merge rate to 3.
    /// An empty sample yields zero averages with `reviewed_count` kept.
    pub fn from_metrics(reviewed_count: u64, metrics: &[PullRequestMetrics]) -> Self {
        if metrics.is_empty() {
            return Self {
                reviewed_count,
                ..Self::default()
            };
        }

        let n = metrics.len() as f64;
        let avg = |f: fn(&PullRequestMetrics) -> f64| metrics.iter().map(f).sum::<f64>() / n;

        Self {
            reviewed_count,
            sampled_count: metrics.len() as u64,
            avg_analysis_hours: round_to(avg(|m| m.analysis_hours), 2),
            avg_files: round_to(avg(|m| m.file_count as f64), 1),
            avg_additions: round_to(avg(|m| m.additions as f64), 1),
            avg_deletions: round_to(avg(|m| m.deletions as f64), 1),
            avg_description_length: round_to(avg(|m| m.description_length as f64), 1),
            avg_comments: round_to(avg(|m| m.comments as f64), 1),
            avg_participants: round_to(avg(|m| m.participants as f64), 1),
            avg_reviews: round_to(avg(|m| m.reviews as f64), 1),
            avg_interactions: round_to(avg(|m| m.interactions as f64), 1),
            merge_rate: round_to(avg(|m| if m.merged { 1.0 } else { 0.0 }), 3),
        }
    }

    /// Table cells; averages are null when nothing was sampled
    fn cells(&self) -> Vec<Cell> {
        let averages = [
            self.avg_analysis_hours,
            self.avg_files,
            self.avg_additions,
            self.avg_deletions,
            self.avg_description_length,
            self.avg_comments,
            self.avg_participants,
            self.avg_reviews,
            self.avg_interactions,
            self.merge_rate,
        ];
        let sampled = self.sampled_count > 0;

        let mut cells = vec![Cell::from(self.reviewed_count), Cell::from(self.sampled_count)];
        cells.extend(
            averages
                .into_iter()
                .map(|v| if sampled { Cell::Float(v) } else { Cell::Null }),
        );
        cells
    }
}

/// One collected repository after normalization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryRecord {
    pub name: String,
    pub owner: String,
    pub url: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub star_count: u64,
    pub merged_pr_count: u64,
    pub release_count: u64,
    pub open_issue_count: u64,
    pub closed_issue_count: u64,
    pub primary_language: String,
    /// Pull request averages; zero-filled when not enriched
    #[serde(default)]
    pub enrichment: EnrichmentSummary,
    /// Static-analysis metrics by name; empty when not analyzed
    #[serde(default)]
    pub quality: BTreeMap<String, f64>,
}

impl RepositoryRecord {
    /// `owner/name`
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }

    fn base_cells(&self) -> Vec<Cell> {
        vec![
            Cell::from(self.name.as_str()),
            Cell::from(self.owner.as_str()),
            Cell::from(self.url.as_str()),
            Cell::from(self.description.as_str()),
            Cell::from(self.created_at),
            Cell::from(self.updated_at),
            Cell::from(self.star_count),
            Cell::from(self.merged_pr_count),
            Cell::from(self.release_count),
            Cell::from(self.open_issue_count),
            Cell::from(self.closed_issue_count),
            Cell::from(self.primary_language.as_str()),
        ]
    }
}

/// Lay records out as a table, one row per record in collection order.
///
/// Enrichment columns are included on request. Quality metrics become one
/// column per metric name seen on any record; records without that metric
/// get a null cell.
pub fn records_to_table(records: &[RepositoryRecord], include_enrichment: bool) -> Result<MetricTable> {
    let quality_names: Vec<String> = records
        .iter()
        .flat_map(|r| r.quality.keys().cloned())
        .collect::<std::collections::BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut names: Vec<String> = columns::BASE.iter().map(|c| (*c).to_string()).collect();
    if include_enrichment {
        names.extend(columns::ENRICHMENT.iter().map(|c| (*c).to_string()));
    }
    names.extend(quality_names.iter().cloned());

    let mut table = MetricTable::new(names);
    for record in records {
        let mut row = record.base_cells();
        if include_enrichment {
            row.extend(record.enrichment.cells());
        }
        row.extend(
            quality_names
                .iter()
                .map(|name| Cell::from(record.quality.get(name).copied())),
        );
        table.push_row(row)?;
    }
    Ok(table)
}
