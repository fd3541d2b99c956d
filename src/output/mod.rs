//! Output module
//!
//! Hands the final table and aggregates to the outside world.
//!
//! # Overview
//!
//! This module provides:
//! - Arrow schema inference and `MetricTable` → RecordBatch conversion
//! - CSV, JSON and Parquet table writers behind the `TableWriter` trait
//! - Chart series files for an external plotting tool

mod chart;
mod schema;
mod writer;

pub use chart::{series_for, ChartRenderer, ChartSeries, SeriesFileRenderer};
pub use schema::{infer_schema, table_to_record_batch};
pub use writer::{
    write_batch_to_parquet, CsvTableWriter, JsonTableWriter, OutputFormat, ParquetTableWriter,
    ParquetWriter, ParquetWriterConfig, TableWriter,
};
