//! Mean, median and mode over numeric columns
//!
//! Nulls and non-finite values are excluded before computing. Results for
//! several columns come back in the order the columns were asked for.

use super::table::MetricTable;
use crate::error::Result;
use crate::types::round_to;
use std::collections::HashMap;

/// Per-column results in request order
pub type PerColumn<T> = Vec<(String, T)>;

/// Mean of the valid values, unrounded
pub fn mean_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Median of the valid values, unrounded
pub fn median_of(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// All values tied for the highest frequency, ascending
pub fn mode_of(values: &[f64]) -> Vec<f64> {
    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &v in values {
        // -0.0 and 0.0 count as one value
        let v = if v == 0.0 { 0.0 } else { v };
        counts.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
    }

    let Some(best) = counts.values().map(|(_, n)| *n).max() else {
        return Vec::new();
    };
    let mut modes: Vec<f64> = counts
        .into_values()
        .filter(|(_, n)| *n == best)
        .map(|(v, _)| v)
        .collect();
    modes.sort_by(f64::total_cmp);
    modes
}

/// Valid values of one numeric column
pub(crate) fn valid_values(table: &MetricTable, column: &str) -> Result<Vec<f64>> {
    Ok(table.numeric(column)?.into_iter().flatten().collect())
}

/// Mean of one column, rounded to 2 decimals
pub fn column_mean(table: &MetricTable, column: &str) -> Result<Option<f64>> {
    Ok(mean_of(&valid_values(table, column)?).map(|v| round_to(v, 2)))
}

/// Median of one column, rounded to 2 decimals
pub fn column_median(table: &MetricTable, column: &str) -> Result<Option<f64>> {
    Ok(median_of(&valid_values(table, column)?).map(|v| round_to(v, 2)))
}

/// Mode set of one column; empty when the column has no valid values
pub fn column_mode(table: &MetricTable, column: &str) -> Result<Vec<f64>> {
    Ok(mode_of(&valid_values(table, column)?))
}

/// Means of several columns
pub fn mean<S: AsRef<str>>(table: &MetricTable, columns: &[S]) -> Result<PerColumn<Option<f64>>> {
    per_column(table, columns, column_mean)
}

/// Medians of several columns
pub fn median<S: AsRef<str>>(
    table: &MetricTable,
    columns: &[S],
) -> Result<PerColumn<Option<f64>>> {
    per_column(table, columns, column_median)
}

/// Mode sets of several columns
pub fn mode<S: AsRef<str>>(table: &MetricTable, columns: &[S]) -> Result<PerColumn<Vec<f64>>> {
    per_column(table, columns, column_mode)
}

fn per_column<S: AsRef<str>, T>(
    table: &MetricTable,
    columns: &[S],
    f: fn(&MetricTable, &str) -> Result<T>,
) -> Result<PerColumn<T>> {
    columns
        .iter()
        .map(|c| Ok((c.as_ref().to_string(), f(table, c.as_ref())?)))
        .collect()
}
