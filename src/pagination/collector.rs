//! Cursor pagination loop
//!
//! Drives a `QueryExecutor` across pages, threading the server's cursor from
//! one batch into the next and stopping on the first failure.

use super::types::{BatchPlan, Collected, HaltReason, PagedQuery};
use crate::http::{QueryExecutor, RetryPolicy};
use crate::types::Cursor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Runs pagination loops against one executor with one retry policy
pub struct Paginator<'a> {
    executor: &'a dyn QueryExecutor,
    policy: &'a RetryPolicy,
}

impl<'a> Paginator<'a> {
    /// Create a paginator
    pub fn new(executor: &'a dyn QueryExecutor, policy: &'a RetryPolicy) -> Self {
        Self { executor, policy }
    }

    /// Collect up to `plan.num_batches()` pages of `query`.
    ///
    /// Batch *i* is requested with the end cursor of batch *i-1*. A failed
    /// batch halts the loop: no new cursor was obtained, so there is nothing
    /// to continue from. Items gathered before the halt are returned.
    pub async fn collect<Q: PagedQuery>(
        &self,
        query: &Q,
        plan: BatchPlan,
        cancel: &CancellationToken,
    ) -> Collected<Q::Item> {
        let mut collected = Collected::new(plan);
        let mut cursor: Option<Cursor> = None;
        let label = query.label();
        let total = plan.num_batches();

        for batch in 0..total {
            if cancel.is_cancelled() {
                info!("{}: cancelled before batch {}/{}", label, batch + 1, total);
                collected.halt = HaltReason::Cancelled;
                return collected;
            }

            debug!("{}: fetching batch {}/{}", label, batch + 1, total);
            let request = query.request(cursor.as_ref(), plan.batch_size());
            collected.batches_issued += 1;

            let page = match self.executor.execute(&request, self.policy).await {
                Ok(data) => query.parse(data),
                Err(err) => Err(err),
            };
            let page = match page {
                Ok(page) => page,
                Err(err) => {
                    warn!(
                        "{}: batch {}/{} failed, stopping with {} items: {}",
                        label,
                        batch + 1,
                        total,
                        collected.items.len(),
                        err
                    );
                    collected.halt = HaltReason::Failed(err);
                    return collected;
                }
            };

            collected.malformed += page.malformed();
            if page.raw_count == 0 {
                info!("{}: batch {} came back empty", label, batch + 1);
                collected.halt = HaltReason::EmptyPage;
                return collected;
            }

            collected.items.extend(page.items);
            info!(
                "{}: batch {}/{} done ({} items collected)",
                label,
                batch + 1,
                total,
                collected.items.len()
            );

            match page.page_info {
                info if info.has_next_page && info.end_cursor.is_some() => {
                    cursor = info.end_cursor;
                }
                _ => {
                    debug!("{}: server reports no further pages", label);
                    collected.halt = HaltReason::EndOfData;
                    return collected;
                }
            }
        }

        collected.halt = HaltReason::Completed;
        collected
    }
}
