//! CLI commands and argument parsing

use crate::config::PipelineConfig;
use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Collect and summarize popular GitHub repositories
#[derive(Parser, Debug)]
#[command(name = "repo-census")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Pipeline configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the full pipeline and write table, aggregates and chart series
    Collect {
        #[command(flatten)]
        collection: CollectionArgs,

        /// Enrich each repository with pull request metrics
        #[arg(long)]
        enrich: bool,

        /// Output table path (extension follows --format when omitted)
        #[arg(short, long, default_value = "repositories")]
        output: PathBuf,

        /// Output table format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Csv)]
        format: OutputFormat,

        /// Directory for chart series files
        #[arg(long)]
        series: Option<PathBuf>,
    },

    /// Collect repositories only and print them as JSON
    Fetch {
        #[command(flatten)]
        collection: CollectionArgs,

        /// First item of the range (fetches end - start repositories)
        #[arg(long, requires = "end")]
        start: Option<u32>,

        /// End of the range
        #[arg(long, requires = "start")]
        end: Option<u32>,
    },

    /// Print the effective configuration as YAML
    Config,
}

/// Flags shared by the collecting commands
#[derive(Args, Debug, Clone, Default)]
pub struct CollectionArgs {
    /// Search query
    #[arg(short, long)]
    pub query: Option<String>,

    /// Repositories to collect
    #[arg(short, long)]
    pub total: Option<u32>,

    /// Repositories per page (1-100)
    #[arg(short, long)]
    pub batch_size: Option<u32>,
}

impl CollectionArgs {
    /// Override file values with the flags that were given
    pub fn apply(&self, config: &mut PipelineConfig) {
        if let Some(query) = &self.query {
            config.search_query.clone_from(query);
        }
        if let Some(total) = self.total {
            config.total_desired = total;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_collect() {
        let cli = Cli::parse_from([
            "repo-census",
            "collect",
            "--total",
            "100",
            "--enrich",
            "--format",
            "parquet",
            "-o",
            "out/repos",
        ]);
        match cli.command {
            Commands::Collect {
                collection,
                enrich,
                output,
                format,
                series,
            } => {
                assert_eq!(collection.total, Some(100));
                assert!(enrich);
                assert_eq!(output, PathBuf::from("out/repos"));
                assert_eq!(format, OutputFormat::Parquet);
                assert!(series.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_fetch_range_needs_both_ends() {
        assert!(Cli::try_parse_from(["repo-census", "fetch", "--start", "10"]).is_err());
        let cli = Cli::try_parse_from(["repo-census", "fetch", "--start", "10", "--end", "60"])
            .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Fetch {
                start: Some(10),
                end: Some(60),
                ..
            }
        ));
    }

    #[test]
    fn test_collection_args_override() {
        let mut config = PipelineConfig::default();
        CollectionArgs {
            query: Some("language:rust".to_string()),
            total: None,
            batch_size: Some(50),
        }
        .apply(&mut config);
        assert_eq!(config.search_query, "language:rust");
        assert_eq!(config.total_desired, 1000);
        assert_eq!(config.batch_size, 50);
    }
}
