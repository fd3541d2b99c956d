//! Pipeline driver
//!
//! Runs collection end to end and decides what is fatal.
//!
//! # Overview
//!
//! ```text
//! search pages ──► keyword filter ──► normalize ──► enrich? ──► analyze?
//!                                                                  │
//!             PipelineOutput ◄── aggregates ◄── MetricTable ◄──────┘
//! ```
//!
//! Only a first batch that fails or comes back empty aborts the run. Every
//! later problem is recorded in the `RunReport` and the run carries on with
//! what it has.

mod types;

pub use types::{PipelineOutput, RunReport};

use crate::analysis::{CommandAnalyzer, QualityAnalyzer};
use crate::config::{Credentials, PipelineConfig};
use crate::enrich::ItemEnricher;
use crate::error::{Error, Result};
use crate::http::{HttpClient, QueryExecutor};
use crate::model::{records_to_table, RawRepository, RepoRef, RepositoryRecord};
use crate::normalize::{matches_keywords, normalize_all};
use crate::output::series_for;
use crate::pagination::{BatchPlan, Collected, HaltReason, Paginator, RepositorySearch};
use crate::stats::{enrichment_aggregates, run_aggregates, MetricTable};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// One configured collection pipeline
pub struct Pipeline {
    executor: Arc<dyn QueryExecutor>,
    config: PipelineConfig,
    analyzer: Option<Arc<dyn QualityAnalyzer>>,
}

impl Pipeline {
    /// Create a pipeline over any executor
    pub fn new(executor: Arc<dyn QueryExecutor>, config: PipelineConfig) -> Self {
        let analyzer = config
            .analysis
            .clone()
            .map(|a| Arc::new(CommandAnalyzer::new(a)) as Arc<dyn QualityAnalyzer>);
        Self {
            executor,
            config,
            analyzer,
        }
    }

    /// Create a pipeline talking to the configured API endpoint
    pub fn connect(config: PipelineConfig, credentials: &Credentials) -> Result<Self> {
        let client = HttpClient::with_credentials(config.api.http_config(), credentials)?;
        Ok(Self::new(Arc::new(client), config))
    }

    /// Replace the quality analyzer
    #[must_use]
    pub fn with_analyzer(mut self, analyzer: Arc<dyn QualityAnalyzer>) -> Self {
        self.analyzer = Some(analyzer);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Collect and normalize `total_desired / batch_size` pages of repositories
    pub async fn fetch(&self, total_desired: u32, batch_size: u32) -> Result<Vec<RepositoryRecord>> {
        let collected = self
            .collect_repositories(
                BatchPlan::new(total_desired, batch_size),
                &CancellationToken::new(),
            )
            .await?;
        Ok(normalize_all(&collected.items))
    }

    /// Fetch `end - start` repositories with the configured batch size
    pub async fn fetch_range(&self, start: u32, end: u32) -> Result<Vec<RepositoryRecord>> {
        self.fetch(end.saturating_sub(start), self.config.batch_size)
            .await
    }

    /// Top-level collection; a first batch that fails or is empty is fatal
    async fn collect_repositories(
        &self,
        plan: BatchPlan,
        cancel: &CancellationToken,
    ) -> Result<Collected<RawRepository>> {
        let query = RepositorySearch::new(&self.config.search_query);
        let paginator = Paginator::new(self.executor.as_ref(), &self.config.top_level_retry);
        let collected = paginator.collect(&query, plan, cancel).await;

        if collected.items.is_empty() && !collected.was_cancelled() {
            let cause = match &collected.halt {
                HaltReason::Failed(err) => err.to_string(),
                HaltReason::EmptyPage | HaltReason::EndOfData if collected.malformed == 0 => {
                    "first page was empty".to_string()
                }
                _ if plan.num_batches() == 0 => format!(
                    "batch plan is empty ({} total / {} per batch)",
                    self.config.total_desired, self.config.batch_size
                ),
                _ => "no usable repository nodes".to_string(),
            };
            return Err(Error::NoData { cause });
        }
        Ok(collected)
    }

    /// Run the whole pipeline
    pub async fn run(&self, cancel: &CancellationToken) -> Result<PipelineOutput> {
        let start = Instant::now();
        let config = &self.config;
        let plan = BatchPlan::new(config.total_desired, config.batch_size);
        info!(
            "Collecting {} repositories in {} batches of {}",
            config.total_desired,
            plan.num_batches(),
            plan.batch_size()
        );

        let collected = self.collect_repositories(plan, cancel).await?;
        let mut report = RunReport {
            requested: config.total_desired,
            batches_planned: collected.batches_planned,
            batches_issued: collected.batches_issued,
            collected: collected.items.len(),
            malformed: collected.malformed,
            halt: halt_label(&collected.halt).to_string(),
            collection_error: collected.failure().map(ToString::to_string),
            cancelled: collected.was_cancelled(),
            ..RunReport::default()
        };
        if let Some(err) = &report.collection_error {
            warn!("Collection stopped early with {} repositories: {}", report.collected, err);
        }

        let mut records = normalize_all(&collected.items);
        if !config.exclude_keywords.is_empty() {
            let before = records.len();
            records.retain(|r| !matches_keywords(r, &config.exclude_keywords));
            report.excluded = before - records.len();
            info!("Keyword filter excluded {} repositories", report.excluded);
        }

        if config.enrichment.enabled {
            self.enrich(&mut records, &mut report, cancel).await;
        }
        if let Some(analyzer) = &self.analyzer {
            analyze(analyzer.as_ref(), &mut records, &mut report, cancel).await;
        }

        let full_table = records_to_table(&records, config.enrichment.enabled)?;
        let mut specs = config.aggregates.clone();
        if config.enrichment.enabled {
            specs.extend(enrichment_aggregates());
        }
        let aggregates = run_aggregates(
            &full_table,
            &specs,
            config.reference_instant_or_now(),
            &config.ignored_categorical_values,
        );
        report.undefined_aggregates = aggregates.undefined_labels();
        let series = series_for(&full_table, &specs, &aggregates);
        let table = self.select_fields(full_table);

        report.duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            "Run finished: {} rows, {} enriched, {} enrichment failures, {} undefined aggregates",
            table.num_rows(),
            report.enriched,
            report.enrichment_failures,
            report.undefined_aggregates.len()
        );

        Ok(PipelineOutput {
            table,
            records,
            aggregates,
            series,
            report,
        })
    }

    async fn enrich(
        &self,
        records: &mut [RepositoryRecord],
        report: &mut RunReport,
        cancel: &CancellationToken,
    ) {
        let config = &self.config.enrichment;
        let enricher = ItemEnricher::new(self.executor.as_ref(), &self.config.batch_retry, config);
        let total = records.len();

        for (i, record) in records.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            info!("Enriching {} ({}/{})", record.full_name(), i + 1, total);

            let repo = RepoRef::new(&record.owner, &record.name);
            match enricher
                .collect_metrics(&repo, config.max_sub_items_per_item, cancel)
                .await
            {
                Ok(outcome) if outcome.cancelled => {
                    info!("Enrichment of {} interrupted, leaving it unenriched", record.full_name());
                    record.enrichment = Default::default();
                    report.cancelled = true;
                    break;
                }
                Ok(outcome) => {
                    record.enrichment = outcome.summary();
                    report.dropped += outcome.drops;
                    report.enriched += 1;
                }
                Err(err) => {
                    warn!("Enrichment of {} failed: {}", record.full_name(), err);
                    record.enrichment = Default::default();
                    report.add_enrichment_failure();
                }
            }
        }
    }

    /// Keep only the configured fields; unknown names are skipped
    fn select_fields(&self, table: MetricTable) -> MetricTable {
        if self.config.fields.is_empty() {
            return table;
        }
        let (known, unknown): (Vec<&String>, Vec<&String>) = self
            .config
            .fields
            .iter()
            .partition(|f| table.column_index(f).is_ok());
        if !unknown.is_empty() {
            warn!("Ignoring unknown fields: {:?}", unknown);
        }
        table.select(&known).unwrap_or(table)
    }
}

async fn analyze(
    analyzer: &dyn QualityAnalyzer,
    records: &mut [RepositoryRecord],
    report: &mut RunReport,
    cancel: &CancellationToken,
) {
    for record in records.iter_mut() {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        match analyzer.analyze(record).await {
            Ok(metrics) => {
                record.quality = metrics;
                report.analyzed += 1;
            }
            Err(err) => {
                warn!("Analysis of {} failed: {}", record.full_name(), err);
                report.add_analysis_failure();
            }
        }
    }
}

fn halt_label(halt: &HaltReason) -> &'static str {
    match halt {
        HaltReason::Completed => "completed",
        HaltReason::EndOfData => "end_of_data",
        HaltReason::EmptyPage => "empty_page",
        HaltReason::Failed(_) => "failed",
        HaltReason::Cancelled => "cancelled",
    }
}

#[cfg(test)]
mod tests;
