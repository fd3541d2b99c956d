//! Data model
//!
//! `raw` holds the typed shapes of API responses; `record` holds the flat
//! records the rest of the pipeline works with.

mod raw;
mod record;

pub use raw::{
    CountConnection, FileConnection, FileDelta, NamedNode, PullRequestState, RawOwner,
    RawPullRequestDetail, RawPullRequestRef, RawRepository, RepoRef,
};
pub use record::{columns, records_to_table, EnrichmentSummary, PullRequestMetrics, RepositoryRecord};
