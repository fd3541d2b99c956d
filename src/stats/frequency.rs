//! Categorical frequency ranking

use super::table::MetricTable;
use crate::error::Result;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// One category and how often it occurred
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedValue {
    pub value: String,
    pub count: u64,
}

/// Rank the values of a text column by how often they occur.
///
/// Values in `exclude` and nulls are not counted. Ties keep the order in
/// which the values first appeared. `top_n` truncates the ranking.
pub fn rank_by_frequency(
    table: &MetricTable,
    column: &str,
    exclude: &BTreeSet<String>,
    top_n: Option<usize>,
) -> Result<Vec<RankedValue>> {
    let mut ranking: Vec<RankedValue> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for value in table.text(column)?.into_iter().flatten() {
        if exclude.contains(value) {
            continue;
        }
        match index.get(value) {
            Some(&i) => ranking[i].count += 1,
            None => {
                index.insert(value, ranking.len());
                ranking.push(RankedValue {
                    value: value.to_string(),
                    count: 1,
                });
            }
        }
    }

    // stable: equal counts stay in first-appearance order
    ranking.sort_by(|a, b| b.count.cmp(&a.count));
    if let Some(n) = top_n {
        ranking.truncate(n);
    }
    Ok(ranking)
}
