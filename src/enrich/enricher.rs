//! Nested pull request collection for one repository

use super::types::{DropReason, MetricsOutcome};
use crate::config::EnrichmentConfig;
use crate::error::Result;
use crate::http::{QueryExecutor, RetryPolicy};
use crate::model::{
    CountConnection, PullRequestMetrics, PullRequestState, RawPullRequestDetail, RawPullRequestRef,
    RepoRef,
};
use crate::pagination::{take_path, BatchPlan, HaltReason, Paginator, PullRequestListing};
use crate::query;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Fetches and summarizes the reviewed pull requests of repositories
pub struct ItemEnricher<'a> {
    executor: &'a dyn QueryExecutor,
    policy: &'a RetryPolicy,
    config: &'a EnrichmentConfig,
}

impl<'a> ItemEnricher<'a> {
    pub fn new(
        executor: &'a dyn QueryExecutor,
        policy: &'a RetryPolicy,
        config: &'a EnrichmentConfig,
    ) -> Self {
        Self {
            executor,
            policy,
            config,
        }
    }

    /// List resolved pull requests with at least one review.
    ///
    /// Up to `max_sub_pages` pages of `sub_page_size` are read. A terminal
    /// listing failure is returned; a transient one that outlived the retry
    /// budget keeps what was listed so far.
    pub async fn reviewed_pull_requests(
        &self,
        repo: &RepoRef,
        max_sub_pages: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawPullRequestRef>> {
        let listing = PullRequestListing::new(repo.clone());
        let plan = BatchPlan::pages(max_sub_pages, self.config.sub_page_size);
        let collected = Paginator::new(self.executor, self.policy)
            .collect(&listing, plan, cancel)
            .await;

        let listed = collected.items.len();
        if let HaltReason::Failed(err) = collected.halt {
            if err.is_terminal() {
                return Err(err);
            }
            warn!(
                "{}: listing stopped after {} pull requests: {}",
                repo.full_name(),
                listed,
                err
            );
        }

        let reviewed: Vec<_> = collected
            .items
            .into_iter()
            .filter(|pr| pr.review_count() > 0)
            .collect();
        debug!(
            "{}: {} of {} listed pull requests are reviewed",
            repo.full_name(),
            reviewed.len(),
            listed
        );
        Ok(reviewed)
    }

    /// Fetch one pull request's detail; `None` when the API returns null
    /// or a node that does not match the expected shape
    pub async fn pull_request_detail(
        &self,
        repo: &RepoRef,
        number: u64,
    ) -> Result<Option<RawPullRequestDetail>> {
        let request = query::pull_request_detail(&repo.owner, &repo.name, number);
        let data = self.executor.execute(&request, self.policy).await?;

        let Ok(node) = take_path(data, &["repository", "pullRequest"]) else {
            return Ok(None);
        };
        match serde_json::from_value(node) {
            Ok(detail) => Ok(Some(detail)),
            Err(e) => {
                debug!("{}#{}: malformed detail: {}", repo.full_name(), number, e);
                Ok(None)
            }
        }
    }

    /// Collect metrics for the first `max_items` reviewed pull requests.
    ///
    /// Any terminal failure aborts the whole item with `Err`. Sub-items with
    /// a null detail or an exhausted transient failure count as unavailable.
    pub async fn collect_metrics(
        &self,
        repo: &RepoRef,
        max_items: usize,
        cancel: &CancellationToken,
    ) -> Result<MetricsOutcome> {
        let reviewed = self
            .reviewed_pull_requests(repo, self.config.max_sub_pages, cancel)
            .await?;

        let mut outcome = MetricsOutcome {
            reviewed_count: reviewed.len() as u64,
            ..MetricsOutcome::default()
        };
        // the listing itself may have been cut short
        if cancel.is_cancelled() {
            outcome.cancelled = true;
            return Ok(outcome);
        }

        for pr in reviewed.iter().take(max_items) {
            if cancel.is_cancelled() {
                outcome.cancelled = true;
                break;
            }

            match self.pull_request_detail(repo, pr.number).await {
                Ok(Some(detail)) => {
                    match derive_metrics(&detail, self.config.min_resolution_hours) {
                        Ok(metrics) => outcome.metrics.push(metrics),
                        Err(reason) => {
                            debug!("{}#{} dropped: {}", repo.full_name(), pr.number, reason);
                            outcome.drops.record(reason);
                        }
                    }
                }
                Ok(None) => outcome.drops.unavailable += 1,
                Err(err) if err.is_terminal() => return Err(err),
                Err(err) => {
                    warn!("{}#{} unavailable: {}", repo.full_name(), pr.number, err);
                    outcome.drops.unavailable += 1;
                }
            }
        }

        info!(
            "{}: {} reviewed, {} sampled, {} dropped",
            repo.full_name(),
            outcome.reviewed_count,
            outcome.metrics.len(),
            outcome.drops.total()
        );
        Ok(outcome)
    }
}

/// Derive per-PR metrics, or say why the pull request is excluded.
///
/// The end instant is the merge time for merged pull requests and the close
/// time otherwise.
pub fn derive_metrics(
    detail: &RawPullRequestDetail,
    min_hours: f64,
) -> std::result::Result<PullRequestMetrics, DropReason> {
    let (Some(created), Some(resolved)) = (detail.created_at, detail.resolved_at()) else {
        return Err(DropReason::Unresolved);
    };

    let analysis_hours = (resolved - created).num_milliseconds() as f64 / 3_600_000.0;
    if analysis_hours < min_hours {
        return Err(DropReason::TooFast);
    }

    let count = |c: Option<CountConnection>| c.unwrap_or_default().total_count;
    let files = detail.files.clone().unwrap_or_default();
    let comments = count(detail.comments);
    let participants = count(detail.participants);
    let reviews = count(detail.reviews);

    Ok(PullRequestMetrics {
        number: detail.number,
        analysis_hours,
        file_count: files.total_count,
        additions: files.nodes.iter().map(|f| f.additions).sum(),
        deletions: files.nodes.iter().map(|f| f.deletions).sum(),
        description_length: detail
            .body_text
            .as_deref()
            .map_or(0, |b| b.chars().count() as u64),
        comments,
        participants,
        reviews,
        interactions: comments + participants + reviews,
        merged: detail.state == PullRequestState::Merged,
    })
}
