//! CLI runner - executes commands

use crate::cli::commands::{Cli, CollectionArgs, Commands};
use crate::config::{Credentials, PipelineConfig};
use crate::driver::{Pipeline, PipelineOutput};
use crate::error::{Result, ResultExt};
use crate::output::{ChartRenderer, OutputFormat, SeriesFileRenderer};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Collect {
                collection,
                enrich,
                output,
                format,
                series,
            } => {
                let mut config = self.load_config(collection)?;
                config.enrichment.enabled |= *enrich;
                self.collect(config, output, *format, series.as_deref())
                    .await
            }
            Commands::Fetch {
                collection,
                start,
                end,
            } => {
                let config = self.load_config(collection)?;
                self.fetch(config, start.zip(*end)).await
            }
            Commands::Config => self.print_config(),
        }
    }

    /// Load the configuration file, or defaults, then apply flag overrides
    fn load_config(&self, overrides: &CollectionArgs) -> Result<PipelineConfig> {
        let mut config = match &self.cli.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        overrides.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    fn connect(config: PipelineConfig) -> Result<Pipeline> {
        let credentials = Credentials::from_env()?;
        Pipeline::connect(config, &credentials)
    }

    /// Full pipeline run
    async fn collect(
        &self,
        config: PipelineConfig,
        output: &Path,
        format: OutputFormat,
        series_dir: Option<&Path>,
    ) -> Result<()> {
        let pipeline = Self::connect(config)?;
        let cancel = cancel_on_ctrl_c();
        let result = pipeline.run(&cancel).await?;

        let table_path = table_path(output, format);
        let writer = format.writer();
        let rows = writer
            .write_table(&result.table, &table_path)
            .with_context(|| format!("Failed to write {}", table_path.display()))?;
        info!("Wrote {} rows to {}", rows, table_path.display());

        let aggregates_path = sibling(&table_path, "aggregates.json");
        write_json(&aggregates_path, &serde_json::to_value(&result.aggregates)?)?;

        let series_files = match series_dir {
            Some(dir) => render_series(&result, dir),
            None => Vec::new(),
        };

        self.output_message(&json!({
            "type": "SUMMARY",
            "table": table_path,
            "rows": rows,
            "aggregates": aggregates_path,
            "series": series_files,
            "report": result.report,
        }));

        if result.report.is_partial() {
            warn!("Run finished with partial results");
        }
        Ok(())
    }

    /// Top-level collection only
    async fn fetch(&self, config: PipelineConfig, range: Option<(u32, u32)>) -> Result<()> {
        let (total, batch_size) = (config.total_desired, config.batch_size);
        let pipeline = Self::connect(config)?;
        let records = match range {
            Some((start, end)) => pipeline.fetch_range(start, end).await?,
            None => pipeline.fetch(total, batch_size).await?,
        };
        info!("Fetched {} repositories", records.len());

        for record in &records {
            self.output_message(&serde_json::to_value(record)?);
        }
        Ok(())
    }

    fn print_config(&self) -> Result<()> {
        let config = match &self.cli.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        print!("{}", config.to_yaml()?);
        Ok(())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) {
        if self.cli.verbose {
            println!("{}", serde_json::to_string_pretty(msg).unwrap_or_default());
        } else {
            println!("{}", serde_json::to_string(msg).unwrap_or_default());
        }
    }
}

/// Token cancelled by the first Ctrl-C
fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, finishing with what has been collected");
            token.cancel();
        }
    });
    cancel
}

/// Add the format's extension when the path has none
fn table_path(output: &Path, format: OutputFormat) -> PathBuf {
    if output.extension().is_some() {
        output.to_path_buf()
    } else {
        output.with_extension(format.writer().extension())
    }
}

/// `dir/stem.suffix` next to `path`
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map_or_else(|| "output".into(), |s| s.to_string_lossy());
    path.with_file_name(format!("{stem}.{suffix}"))
}

fn write_json(path: &Path, value: &Value) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(value)?)?;
    Ok(())
}

/// Render every series; a failed file is logged and skipped
fn render_series(output: &PipelineOutput, dir: &Path) -> Vec<PathBuf> {
    let renderer = SeriesFileRenderer::new(dir);
    output
        .series
        .iter()
        .filter_map(|series| match renderer.render(series) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to render series {}: {}", series.name(), e);
                None
            }
        })
        .collect()
}
