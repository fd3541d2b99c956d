//! Chart series handoff
//!
//! Charts are drawn by an external plotting tool. This module only decides
//! what to plot and writes each series as a JSON file it can read.

use crate::error::Result;
use crate::stats::{AggregateResults, AggregateSpec, AggregateValue, MetricTable};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One plottable series
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartSeries {
    /// Paired numeric values, e.g. for a correlation
    Scatter {
        name: String,
        x_label: String,
        y_label: String,
        points: Vec<[f64; 2]>,
    },
    /// Labelled counts, e.g. for a frequency ranking
    Bars {
        name: String,
        labels: Vec<String>,
        values: Vec<f64>,
    },
}

impl ChartSeries {
    pub fn name(&self) -> &str {
        match self {
            Self::Scatter { name, .. } | Self::Bars { name, .. } => name,
        }
    }

    /// Pairs of two numeric columns; rows missing either side are skipped
    pub fn scatter(table: &MetricTable, x: &str, y: &str) -> Result<Self> {
        let points = table
            .numeric(x)?
            .into_iter()
            .zip(table.numeric(y)?)
            .filter_map(|pair| match pair {
                (Some(a), Some(b)) => Some([a, b]),
                _ => None,
            })
            .collect();
        Ok(Self::Scatter {
            name: format!("{x}_vs_{y}"),
            x_label: x.to_string(),
            y_label: y.to_string(),
            points,
        })
    }
}

/// Renders chart series somewhere
pub trait ChartRenderer: Send + Sync {
    /// Render one series, returning where it went
    fn render(&self, series: &ChartSeries) -> Result<PathBuf>;
}

/// Writes each series to `<dir>/<name>.json`
#[derive(Debug, Clone)]
pub struct SeriesFileRenderer {
    dir: PathBuf,
}

impl SeriesFileRenderer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ChartRenderer for SeriesFileRenderer {
    fn render(&self, series: &ChartSeries) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.json", file_stem(series.name())));
        let file = std::fs::File::create(&path)?;
        serde_json::to_writer_pretty(file, series)?;
        debug!("Wrote series {} to {}", series.name(), path.display());
        Ok(path)
    }
}

fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Series worth plotting for a set of computed aggregates: a scatter per
/// defined correlation and a bar chart per frequency ranking
pub fn series_for(
    table: &MetricTable,
    specs: &[AggregateSpec],
    results: &AggregateResults,
) -> Vec<ChartSeries> {
    let mut series = Vec::new();
    for spec in specs {
        let Some(value) = results.get(&spec.label()) else {
            continue;
        };
        match (spec, value) {
            (AggregateSpec::Correlation { a, b }, AggregateValue::Correlation(_)) => {
                if let Ok(s) = ChartSeries::scatter(table, a, b) {
                    series.push(s);
                }
            }
            (AggregateSpec::RankByFrequency { column, .. }, AggregateValue::Ranking { entries }) => {
                series.push(ChartSeries::Bars {
                    name: format!("{column}_frequency"),
                    labels: entries.iter().map(|e| e.value.clone()).collect(),
                    values: entries.iter().map(|e| e.count as f64).collect(),
                });
            }
            _ => {}
        }
    }
    series
}
