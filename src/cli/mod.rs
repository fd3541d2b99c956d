//! CLI module
//!
//! Command-line interface for running the pipeline.
//!
//! # Commands
//!
//! - `collect` - Full pipeline: collect, enrich, aggregate and write outputs
//! - `fetch` - Top-level repository collection only
//! - `config` - Print the effective configuration

mod commands;
mod runner;

pub use commands::{Cli, CollectionArgs, Commands};
pub use runner::Runner;
