//! Paired comparison of two measurement columns

use super::correlation::student_t_two_sided;
use super::descriptive::mean_of;
use super::table::MetricTable;
use crate::error::Result;
use crate::types::round_to;
use serde::Serialize;

/// Paired Student's t-test of `a - b`
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairedTTest {
    pub t: f64,
    /// Two-sided p-value with n-1 degrees of freedom
    pub p_value: f64,
    /// Pairs used
    pub n: usize,
    /// Mean of `a` over the pairs, rounded to 2 decimals
    pub mean_a: f64,
    /// Mean of `b` over the pairs, rounded to 2 decimals
    pub mean_b: f64,
}

/// Paired t-test of two numeric columns.
///
/// Rows where either side is null or non-finite are dropped pairwise.
/// `None` when fewer than 2 pairs remain or the differences do not vary.
pub fn paired_t_test(table: &MetricTable, a: &str, b: &str) -> Result<Option<PairedTTest>> {
    let xs = table.numeric(a)?;
    let ys = table.numeric(b)?;
    let (xs, ys): (Vec<f64>, Vec<f64>) = xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(x), Some(y)) => Some((x, y)),
            _ => None,
        })
        .unzip();
    Ok(paired_t(&xs, &ys))
}

/// Paired t-test over already paired samples
pub fn paired_t(xs: &[f64], ys: &[f64]) -> Option<PairedTTest> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let (xs, ys) = (&xs[..n], &ys[..n]);
    let diffs: Vec<f64> = xs.iter().zip(ys).map(|(x, y)| x - y).collect();

    let mean_diff = mean_of(&diffs)?;
    let variance = diffs.iter().map(|d| (d - mean_diff).powi(2)).sum::<f64>() / (n - 1) as f64;
    if variance <= 0.0 {
        return None;
    }
    let t = mean_diff / (variance / n as f64).sqrt();

    Some(PairedTTest {
        t,
        p_value: student_t_two_sided(t, (n - 1) as f64),
        n,
        mean_a: round_to(mean_of(xs)?, 2),
        mean_b: round_to(mean_of(ys)?, 2),
    })
}
