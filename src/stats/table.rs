//! Rectangular metric table
//!
//! Columns are named, rows keep insertion order, and every row has exactly
//! one cell per column. All accessors borrow; transformations such as
//! `select` and `sorted_by` return new tables.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

/// One table cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    /// Absent value
    Null,
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value
    Text(String),
    /// UTC timestamp
    Timestamp(DateTime<Utc>),
}

impl Cell {
    /// Numeric view; `None` for nulls and non-numeric cells
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(v) => Some(*v as f64),
            Cell::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether the cell is null
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Cell::Null => "null",
            Cell::Int(_) => "integer",
            Cell::Float(_) => "float",
            Cell::Text(_) => "text",
            Cell::Timestamp(_) => "timestamp",
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Null => Ok(()),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => write!(f, "{v}"),
            Cell::Text(v) => f.write_str(v),
            Cell::Timestamp(v) => f.write_str(&v.to_rfc3339()),
        }
    }
}

impl From<u64> for Cell {
    fn from(v: u64) -> Self {
        i64::try_from(v).map_or(Cell::Float(v as f64), Cell::Int)
    }
}

impl From<usize> for Cell {
    fn from(v: usize) -> Self {
        Cell::from(v as u64)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Float(v)
    }
}

impl From<String> for Cell {
    fn from(v: String) -> Self {
        Cell::Text(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Cell {
    fn from(v: DateTime<Utc>) -> Self {
        Cell::Timestamp(v)
    }
}

impl<T: Into<Cell>> From<Option<T>> for Cell {
    fn from(v: Option<T>) -> Self {
        v.map_or(Cell::Null, Into::into)
    }
}

/// Ordered, rectangular collection of rows
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetricTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl MetricTable {
    /// Create an empty table with the given columns
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the column count
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(Error::RowWidth {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names in order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in insertion order
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns
    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Whether the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column
    pub fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| Error::unknown_column(name))
    }

    /// Cells of one column
    pub fn column(&self, name: &str) -> Result<Vec<&Cell>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Cell at a row and column
    pub fn cell(&self, row: usize, name: &str) -> Result<Option<&Cell>> {
        let idx = self.column_index(name)?;
        Ok(self.rows.get(row).map(|r| &r[idx]))
    }

    /// Numeric view of a column; nulls and non-finite values become `None`
    pub fn numeric(&self, name: &str) -> Result<Vec<Option<f64>>> {
        self.column(name)?
            .into_iter()
            .map(|cell| match cell {
                Cell::Null => Ok(None),
                Cell::Int(_) | Cell::Float(_) => Ok(cell.as_f64().filter(|v| v.is_finite())),
                _ => Err(Error::column_type(name, "numeric")),
            })
            .collect()
    }

    /// Timestamp view of a column; RFC 3339 text is accepted
    pub fn timestamps(&self, name: &str) -> Result<Vec<Option<DateTime<Utc>>>> {
        self.column(name)?
            .into_iter()
            .map(|cell| match cell {
                Cell::Null => Ok(None),
                Cell::Timestamp(ts) => Ok(Some(*ts)),
                Cell::Text(text) => Ok(DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|ts| ts.with_timezone(&Utc))),
                _ => Err(Error::column_type(name, "a timestamp")),
            })
            .collect()
    }

    /// Text view of a column
    pub fn text(&self, name: &str) -> Result<Vec<Option<&str>>> {
        self.column(name)?
            .into_iter()
            .map(|cell| match cell {
                Cell::Null => Ok(None),
                Cell::Text(text) => Ok(Some(text.as_str())),
                _ => Err(Error::column_type(name, "text")),
            })
            .collect()
    }

    /// New table holding only the named columns, in the given order
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<MetricTable> {
        let indices = names
            .iter()
            .map(|n| self.column_index(n.as_ref()))
            .collect::<Result<Vec<_>>>()?;

        Ok(MetricTable {
            columns: names.iter().map(|n| n.as_ref().to_string()).collect(),
            rows: self
                .rows
                .iter()
                .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                .collect(),
        })
    }

    /// New table sorted by a numeric column; nulls go last, ties keep order
    pub fn sorted_by(&self, name: &str, descending: bool) -> Result<MetricTable> {
        let keys = self.numeric(name)?;
        let mut order: Vec<usize> = (0..self.rows.len()).collect();
        order.sort_by(|&a, &b| match (keys[a], keys[b]) {
            (Some(x), Some(y)) => {
                let ord = x.total_cmp(&y);
                if descending {
                    ord.reverse()
                } else {
                    ord
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        });

        Ok(MetricTable {
            columns: self.columns.clone(),
            rows: order.into_iter().map(|i| self.rows[i].clone()).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> MetricTable {
        let mut table = MetricTable::new(["name", "stars", "language"]);
        table
            .push_row(vec!["a".into(), Cell::Int(10), "Rust".into()])
            .unwrap();
        table
            .push_row(vec!["b".into(), Cell::Null, "Go".into()])
            .unwrap();
        table
            .push_row(vec!["c".into(), Cell::Float(30.5), Cell::Null])
            .unwrap();
        table
    }

    #[test]
    fn test_push_row_rejects_wrong_width() {
        let mut table = MetricTable::new(["a", "b"]);
        let err = table.push_row(vec![Cell::Int(1)]).unwrap_err();
        assert!(matches!(
            err,
            Error::RowWidth {
                expected: 2,
                actual: 1
            }
        ));
        assert!(table.is_empty());
    }

    #[test]
    fn test_numeric_view() {
        let table = sample();
        assert_eq!(
            table.numeric("stars").unwrap(),
            vec![Some(10.0), None, Some(30.5)]
        );
        assert!(matches!(
            table.numeric("name"),
            Err(Error::ColumnType { .. })
        ));
        assert!(matches!(
            table.numeric("missing"),
            Err(Error::UnknownColumn { .. })
        ));
    }

    #[test]
    fn test_non_finite_is_treated_as_missing() {
        let mut table = MetricTable::new(["x"]);
        table.push_row(vec![Cell::Float(f64::NAN)]).unwrap();
        table.push_row(vec![Cell::Float(f64::INFINITY)]).unwrap();
        table.push_row(vec![Cell::Float(1.0)]).unwrap();
        assert_eq!(table.numeric("x").unwrap(), vec![None, None, Some(1.0)]);
    }

    #[test]
    fn test_timestamps_accept_text() {
        let mut table = MetricTable::new(["ts"]);
        table.push_row(vec!["2024-01-01T00:00:00Z".into()]).unwrap();
        table.push_row(vec!["not a date".into()]).unwrap();
        let values = table.timestamps("ts").unwrap();
        assert!(values[0].is_some());
        assert!(values[1].is_none());
    }

    #[test]
    fn test_select_reorders_without_touching_source() {
        let table = sample();
        let selected = table.select(&["language", "name"]).unwrap();
        assert_eq!(selected.columns(), &["language", "name"]);
        assert_eq!(selected.rows()[0], vec![Cell::from("Rust"), Cell::from("a")]);
        assert_eq!(table.num_columns(), 3);
    }

    #[test]
    fn test_sorted_by_descending_nulls_last() {
        let table = sample();
        let sorted = table.sorted_by("stars", true).unwrap();
        let names: Vec<String> = sorted
            .column("name")
            .unwrap()
            .into_iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
        assert_eq!(table.cell(0, "name").unwrap(), Some(&Cell::from("a")));
    }

    #[test]
    fn test_cell_conversions() {
        assert_eq!(Cell::from(Some(3u64)), Cell::Int(3));
        assert_eq!(Cell::from(None::<u64>), Cell::Null);
        assert_eq!(Cell::from(u64::MAX).kind(), "float");
    }
}
