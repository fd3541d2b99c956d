// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # repo-census
//!
//! Collects popular GitHub repositories through the GraphQL search API,
//! optionally enriches each one with pull request metrics, and summarizes
//! the result with descriptive, temporal, frequency and rank-correlation
//! statistics.
//!
//! ## Features
//!
//! - **Resilient collection**: cursor pagination in fixed-size batches with
//!   retry, backoff and client-side rate limiting
//! - **Partial results**: later failures keep everything collected so far
//! - **Enrichment**: per-repository pull request sub-collection
//! - **Statistics**: configurable aggregates over a tabular model
//! - **Arrow output**: CSV, JSON and Parquet tables plus chart series
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use repo_census::config::{Credentials, PipelineConfig};
//! use repo_census::driver::Pipeline;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> repo_census::Result<()> {
//!     let config = PipelineConfig::from_file("census.yaml")?;
//!     let pipeline = Pipeline::connect(config, &Credentials::from_env()?)?;
//!
//!     let output = pipeline.run(&CancellationToken::new()).await?;
//!     println!("{} repositories", output.table.num_rows());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                          Pipeline                               │
//! │  run() → PipelineOutput { table, aggregates, series, report }   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//! ┌──────────┬───────────┬───────┴───────┬───────────┬─────────────┐
//! │   HTTP   │ Paginate  │    Enrich     │   Stats   │   Output    │
//! ├──────────┼───────────┼───────────────┼───────────┼─────────────┤
//! │ GraphQL  │ Batches   │ PR listing    │ Mean/Mode │ CSV / JSON  │
//! │ Retry    │ Cursors   │ PR detail     │ Age/Delta │ Parquet     │
//! │ Backoff  │ Halting   │ Drop counts   │ Ranking   │ Series      │
//! │ Rate Lim │           │               │ Spearman  │             │
//! └──────────┴───────────┴───────────────┴───────────┴─────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Pipeline configuration and credentials
pub mod config;

/// GraphQL query documents and request builders
pub mod query;

/// Raw API shapes and normalized records
pub mod model;

/// Raw repository → record normalization
pub mod normalize;

/// HTTP client with retry and rate limiting
pub mod http;

/// Batched cursor pagination
pub mod pagination;

/// Per-repository pull request enrichment
pub mod enrich;

/// Statistics engine
pub mod stats;

/// External static analysis
pub mod analysis;

/// Arrow/Parquet output and chart series
pub mod output;

/// Pipeline driver
pub mod driver;

/// Command-line interface
pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use config::{Credentials, PipelineConfig};
pub use driver::{Pipeline, PipelineOutput, RunReport};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
