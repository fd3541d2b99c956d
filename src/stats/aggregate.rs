//! Configurable aggregate evaluation
//!
//! An `AggregateSpec` names a statistic and its columns. `run_aggregates`
//! evaluates a list of them against a table; a failing aggregate becomes
//! `AggregateValue::Undefined` and the rest still run.

use super::comparison::{paired_t_test, PairedTTest};
use super::correlation::{correlation, Correlation};
use super::descriptive::{column_mean, column_median, column_mode};
use super::frequency::{rank_by_frequency, RankedValue};
use super::table::MetricTable;
use super::temporal::{age_in_years, days_since_update, delta_summary, AgeSummary, DeltaSummary};
use crate::error::Result;
use crate::model::columns;
use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;
use tracing::debug;

/// One statistic to compute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateSpec {
    Mean {
        column: String,
    },
    Median {
        column: String,
    },
    Mode {
        column: String,
    },
    /// Mean and median age in years of a timestamp column
    Age {
        column: String,
    },
    /// Summary of days elapsed since a timestamp column
    DaysSince {
        column: String,
    },
    RankByFrequency {
        column: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        top_n: Option<usize>,
    },
    Correlation {
        a: String,
        b: String,
    },
    /// Paired t-test of `a - b` over rows where both are present
    PairedTTest {
        a: String,
        b: String,
    },
}

impl AggregateSpec {
    pub fn mean(column: &str) -> Self {
        Self::Mean {
            column: column.to_string(),
        }
    }

    pub fn median(column: &str) -> Self {
        Self::Median {
            column: column.to_string(),
        }
    }

    pub fn mode(column: &str) -> Self {
        Self::Mode {
            column: column.to_string(),
        }
    }

    pub fn age(column: &str) -> Self {
        Self::Age {
            column: column.to_string(),
        }
    }

    pub fn days_since(column: &str) -> Self {
        Self::DaysSince {
            column: column.to_string(),
        }
    }

    pub fn rank_by_frequency(column: &str, top_n: Option<usize>) -> Self {
        Self::RankByFrequency {
            column: column.to_string(),
            top_n,
        }
    }

    pub fn correlation(a: &str, b: &str) -> Self {
        Self::Correlation {
            a: a.to_string(),
            b: b.to_string(),
        }
    }

    pub fn paired_t_test(a: &str, b: &str) -> Self {
        Self::PairedTTest {
            a: a.to_string(),
            b: b.to_string(),
        }
    }

    /// Result key such as `mean(star_count)`
    pub fn label(&self) -> String {
        match self {
            Self::Mean { column } => format!("mean({column})"),
            Self::Median { column } => format!("median({column})"),
            Self::Mode { column } => format!("mode({column})"),
            Self::Age { column } => format!("age({column})"),
            Self::DaysSince { column } => format!("days_since({column})"),
            Self::RankByFrequency { column, .. } => format!("rank_by_frequency({column})"),
            Self::Correlation { a, b } => format!("correlation({a}, {b})"),
            Self::PairedTTest { a, b } => format!("paired_t_test({a}, {b})"),
        }
    }
}

/// Outcome of one aggregate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AggregateValue {
    Scalar { value: f64 },
    Set { values: Vec<f64> },
    Ranking { entries: Vec<RankedValue> },
    Correlation(Correlation),
    PairedTTest(PairedTTest),
    Age(AgeSummary),
    Delta(DeltaSummary),
    /// The statistic could not be computed
    Undefined { reason: String },
}

impl AggregateValue {
    fn undefined(reason: impl Into<String>) -> Self {
        Self::Undefined {
            reason: reason.into(),
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined { .. })
    }

    /// The scalar, if this is one
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar { value } => Some(*value),
            _ => None,
        }
    }
}

/// Aggregate results keyed by label, in evaluation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregateResults {
    entries: Vec<(String, AggregateValue)>,
}

impl AggregateResults {
    /// Add or replace a result
    pub fn insert(&mut self, label: String, value: AggregateValue) {
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&AggregateValue> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AggregateValue)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels of aggregates that could not be computed
    pub fn undefined_labels(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|(_, v)| v.is_undefined())
            .map(|(l, _)| l.clone())
            .collect()
    }
}

impl Serialize for AggregateResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

/// Evaluate every spec against `table`
pub fn run_aggregates(
    table: &MetricTable,
    specs: &[AggregateSpec],
    reference: DateTime<Utc>,
    ignored: &BTreeSet<String>,
) -> AggregateResults {
    let mut results = AggregateResults::default();
    for spec in specs {
        let value = evaluate(table, spec, reference, ignored)
            .unwrap_or_else(|e| AggregateValue::undefined(e.to_string()));
        if let AggregateValue::Undefined { reason } = &value {
            debug!("{} undefined: {}", spec.label(), reason);
        }
        results.insert(spec.label(), value);
    }
    results
}

fn evaluate(
    table: &MetricTable,
    spec: &AggregateSpec,
    reference: DateTime<Utc>,
    ignored: &BTreeSet<String>,
) -> Result<AggregateValue> {
    const NO_VALUES: &str = "no valid values";

    let value = match spec {
        AggregateSpec::Mean { column } => column_mean(table, column)?
            .map_or_else(|| AggregateValue::undefined(NO_VALUES), |value| AggregateValue::Scalar { value }),
        AggregateSpec::Median { column } => column_median(table, column)?
            .map_or_else(|| AggregateValue::undefined(NO_VALUES), |value| AggregateValue::Scalar { value }),
        AggregateSpec::Mode { column } => {
            let values = column_mode(table, column)?;
            if values.is_empty() {
                AggregateValue::undefined(NO_VALUES)
            } else {
                AggregateValue::Set { values }
            }
        }
        AggregateSpec::Age { column } => age_in_years(table, column, reference)?
            .map_or_else(|| AggregateValue::undefined("no timestamps"), AggregateValue::Age),
        AggregateSpec::DaysSince { column } => {
            delta_summary(&days_since_update(table, column, reference)?)
                .map_or_else(|| AggregateValue::undefined("no timestamps"), AggregateValue::Delta)
        }
        AggregateSpec::RankByFrequency { column, top_n } => AggregateValue::Ranking {
            entries: rank_by_frequency(table, column, ignored, *top_n)?,
        },
        AggregateSpec::Correlation { a, b } => correlation(table, a, b)?.map_or_else(
            || AggregateValue::undefined("fewer than 2 pairs or no rank variance"),
            AggregateValue::Correlation,
        ),
        AggregateSpec::PairedTTest { a, b } => paired_t_test(table, a, b)?.map_or_else(
            || AggregateValue::undefined("fewer than 2 pairs or no variance in differences"),
            AggregateValue::PairedTTest,
        ),
    };
    Ok(value)
}

/// Repository-level statistics computed when none are configured
pub fn default_aggregates() -> Vec<AggregateSpec> {
    let mut specs = vec![AggregateSpec::age(columns::CREATED_AT)];
    for column in [
        columns::STAR_COUNT,
        columns::MERGED_PR_COUNT,
        columns::RELEASE_COUNT,
        columns::CLOSED_ISSUE_COUNT,
    ] {
        specs.push(AggregateSpec::mean(column));
        specs.push(AggregateSpec::median(column));
        specs.push(AggregateSpec::mode(column));
    }
    specs.push(AggregateSpec::days_since(columns::UPDATED_AT));
    specs.push(AggregateSpec::rank_by_frequency(columns::PRIMARY_LANGUAGE, None));
    specs.push(AggregateSpec::correlation(
        columns::STAR_COUNT,
        columns::MERGED_PR_COUNT,
    ));
    specs
}

/// Pull request statistics, meaningful only when enrichment ran
pub fn enrichment_aggregates() -> Vec<AggregateSpec> {
    let features = [
        columns::AVG_FILES,
        columns::AVG_ANALYSIS_HOURS,
        columns::AVG_DESCRIPTION_LENGTH,
        columns::AVG_INTERACTIONS,
    ];
    let mut specs = vec![
        AggregateSpec::mean(columns::AVG_ANALYSIS_HOURS),
        AggregateSpec::median(columns::AVG_ANALYSIS_HOURS),
        AggregateSpec::mean(columns::MERGE_RATE),
    ];
    for target in [columns::MERGE_RATE, columns::AVG_REVIEWS] {
        specs.extend(features.iter().map(|f| AggregateSpec::correlation(f, target)));
    }
    specs
}
