//! Pagination module
//!
//! Cursor-threaded pagination over GraphQL connections.
//!
//! # Overview
//!
//! A `BatchPlan` fixes how many pages to request up front. The `Paginator`
//! walks them in order, feeding each page's end cursor into the next
//! request, and stops at the first empty page, end of data, failure or
//! cancellation. Each paginated request type implements `PagedQuery`.

mod collector;
mod queries;
mod types;

pub use collector::Paginator;
pub use queries::{PullRequestListing, RepositorySearch};
pub use types::{take_path, typed_page, BatchPlan, Collected, HaltReason, PagedQuery};
