//! Table writers
//!
//! Every format goes through an Arrow RecordBatch: CSV and JSON use the
//! arrow writers, Parquet uses `ArrowWriter` with configurable properties.

use super::schema::table_to_record_batch;
use crate::error::{Error, Result};
use crate::stats::MetricTable;
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Persists a table to a file
pub trait TableWriter: Send + Sync {
    /// Write `table` to `path`, returning the number of rows written
    fn write_table(&self, table: &MetricTable, path: &Path) -> Result<usize>;

    /// Conventional file extension
    fn extension(&self) -> &'static str;
}

/// Supported table formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Parquet,
    Json,
}

impl OutputFormat {
    /// Writer for this format
    pub fn writer(self) -> Box<dyn TableWriter> {
        match self {
            Self::Csv => Box::new(CsvTableWriter),
            Self::Parquet => Box::new(ParquetTableWriter::default()),
            Self::Json => Box::new(JsonTableWriter),
        }
    }
}

fn create(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    File::create(path).map_err(|e| Error::Output {
        message: format!("Failed to create {}: {e}", path.display()),
    })
}

/// CSV with a header row
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvTableWriter;

impl TableWriter for CsvTableWriter {
    fn write_table(&self, table: &MetricTable, path: &Path) -> Result<usize> {
        let batch = table_to_record_batch(table)?;
        let mut writer = arrow::csv::WriterBuilder::new()
            .with_header(true)
            .build(create(path)?);
        writer.write(&batch)?;
        info!("Wrote {} rows to {}", batch.num_rows(), path.display());
        Ok(batch.num_rows())
    }

    fn extension(&self) -> &'static str {
        "csv"
    }
}

/// JSON array of row objects; null cells are omitted
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonTableWriter;

impl TableWriter for JsonTableWriter {
    fn write_table(&self, table: &MetricTable, path: &Path) -> Result<usize> {
        let batch = table_to_record_batch(table)?;
        let mut writer = arrow::json::ArrayWriter::new(create(path)?);
        writer.write(&batch)?;
        writer.finish()?;
        info!("Wrote {} rows to {}", batch.num_rows(), path.display());
        Ok(batch.num_rows())
    }

    fn extension(&self) -> &'static str {
        "json"
    }
}

/// Parquet file
#[derive(Debug, Clone, Default)]
pub struct ParquetTableWriter {
    config: ParquetWriterConfig,
}

impl ParquetTableWriter {
    pub fn new(config: ParquetWriterConfig) -> Self {
        Self { config }
    }
}

impl TableWriter for ParquetTableWriter {
    fn write_table(&self, table: &MetricTable, path: &Path) -> Result<usize> {
        let batch = table_to_record_batch(table)?;
        let rows = write_batch_to_parquet(path, &batch, Some(&self.config))?;
        info!("Wrote {} rows to {}", rows, path.display());
        Ok(rows)
    }

    fn extension(&self) -> &'static str {
        "parquet"
    }
}

/// Configuration for Parquet writer
#[derive(Debug, Clone)]
pub struct ParquetWriterConfig {
    compression: Compression,
    row_group_size: usize,
}

impl Default for ParquetWriterConfig {
    fn default() -> Self {
        Self {
            compression: Compression::SNAPPY,
            row_group_size: 64 * 1024,
        }
    }
}

impl ParquetWriterConfig {
    /// Create a new config with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set row group size
    #[must_use]
    pub fn with_row_group_size(mut self, size: usize) -> Self {
        self.row_group_size = size;
        self
    }

    /// Use no compression
    #[must_use]
    pub fn uncompressed(mut self) -> Self {
        self.compression = Compression::UNCOMPRESSED;
        self
    }

    /// Use ZSTD compression
    #[must_use]
    pub fn zstd(mut self) -> Self {
        self.compression = Compression::ZSTD(parquet::basic::ZstdLevel::default());
        self
    }

    fn build_properties(&self) -> WriterProperties {
        WriterProperties::builder()
            .set_compression(self.compression)
            .set_max_row_group_size(self.row_group_size)
            .build()
    }
}

/// Parquet file writer
pub struct ParquetWriter {
    writer: ArrowWriter<File>,
    rows_written: usize,
}

impl ParquetWriter {
    /// Create a new Parquet writer
    pub fn new(path: &Path, schema: &Schema, config: &ParquetWriterConfig) -> Result<Self> {
        let file = create(path)?;
        let props = config.build_properties();
        let writer =
            ArrowWriter::try_new(file, Arc::new(schema.clone()), Some(props)).map_err(|e| {
                Error::Output {
                    message: format!("Failed to create Parquet writer: {e}"),
                }
            })?;

        Ok(Self {
            writer,
            rows_written: 0,
        })
    }

    /// Write a RecordBatch to the file
    pub fn write(&mut self, batch: &RecordBatch) -> Result<()> {
        self.writer.write(batch).map_err(|e| Error::Output {
            message: format!("Failed to write batch: {e}"),
        })?;
        self.rows_written += batch.num_rows();
        Ok(())
    }

    /// Close the writer and finalize the file
    pub fn close(self) -> Result<usize> {
        let rows = self.rows_written;
        self.writer.close().map_err(|e| Error::Output {
            message: format!("Failed to close Parquet writer: {e}"),
        })?;
        Ok(rows)
    }
}

/// Write a single RecordBatch to a Parquet file
pub fn write_batch_to_parquet(
    path: &Path,
    batch: &RecordBatch,
    config: Option<&ParquetWriterConfig>,
) -> Result<usize> {
    let default_config = ParquetWriterConfig::default();
    let config = config.unwrap_or(&default_config);

    let mut writer = ParquetWriter::new(path, batch.schema().as_ref(), config)?;
    writer.write(batch)?;
    writer.close()
}
