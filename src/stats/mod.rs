//! Statistics engine
//!
//! Descriptive, categorical, correlation, paired comparison and time-delta
//! aggregates over a `MetricTable`. Every function borrows the table and
//! leaves it untouched.
//!
//! # Missing values
//!
//! Null and non-finite cells are excluded before computing. A statistic
//! with nothing left to work on reports `None` (or
//! `AggregateValue::Undefined` through `run_aggregates`) instead of a
//! misleading number.

mod aggregate;
mod comparison;
mod correlation;
mod descriptive;
mod frequency;
mod table;
mod temporal;

pub use aggregate::{
    default_aggregates, enrichment_aggregates, run_aggregates, AggregateResults, AggregateSpec,
    AggregateValue,
};
pub use comparison::{paired_t, paired_t_test, PairedTTest};
pub use correlation::{
    average_ranks, correlation, ln_gamma, regularized_incomplete_beta, spearman,
    student_t_two_sided, Correlation,
};
pub use descriptive::{
    column_mean, column_median, column_mode, mean, mean_of, median, median_of, mode, mode_of,
    PerColumn,
};
pub use frequency::{rank_by_frequency, RankedValue};
pub use table::{Cell, MetricTable};
pub use temporal::{age_in_years, days_since_update, delta_summary, AgeSummary, DeltaSummary};
