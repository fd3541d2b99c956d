//! Age and time-since aggregates over timestamp columns

use super::descriptive::{mean_of, median_of, mode_of};
use super::table::MetricTable;
use crate::error::Result;
use crate::types::round_to;
use chrono::{DateTime, Utc};
use serde::Serialize;

const DAYS_PER_YEAR: f64 = 365.25;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Mean and median age in years
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AgeSummary {
    pub mean_years: f64,
    pub median_years: f64,
}

/// Mean, median and mode of a set of day deltas
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeltaSummary {
    pub mean_days: f64,
    pub median_days: f64,
    pub mode_days: Vec<f64>,
}

/// Age of each timestamp at `reference`, in years.
///
/// Ages are counted in whole elapsed days, then the mean and median of the
/// day counts are divided by 365.25 and rounded to 1 decimal.
pub fn age_in_years(
    table: &MetricTable,
    column: &str,
    reference: DateTime<Utc>,
) -> Result<Option<AgeSummary>> {
    let days: Vec<f64> = table
        .timestamps(column)?
        .into_iter()
        .flatten()
        .map(|ts| (reference - ts).num_days() as f64)
        .collect();

    Ok(mean_of(&days).zip(median_of(&days)).map(|(mean, median)| AgeSummary {
        mean_years: round_to(mean / DAYS_PER_YEAR, 1),
        median_years: round_to(median / DAYS_PER_YEAR, 1),
    }))
}

/// Fractional days between each timestamp and `reference`, row by row
pub fn days_since_update(
    table: &MetricTable,
    column: &str,
    reference: DateTime<Utc>,
) -> Result<Vec<Option<f64>>> {
    Ok(table
        .timestamps(column)?
        .into_iter()
        .map(|ts| ts.map(|ts| (reference - ts).num_milliseconds() as f64 / MILLIS_PER_DAY))
        .collect())
}

/// Summarize day deltas; `None` when there are none.
/// Mean and median are rounded to 2 decimals, modes to 2 as well.
pub fn delta_summary(deltas: &[Option<f64>]) -> Option<DeltaSummary> {
    let values: Vec<f64> = deltas.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    let mean = mean_of(&values)?;
    let median = median_of(&values)?;
    let rounded: Vec<f64> = values.iter().map(|v| round_to(*v, 2)).collect();

    Some(DeltaSummary {
        mean_days: round_to(mean, 2),
        median_days: round_to(median, 2),
        mode_days: mode_of(&rounded),
    })
}
