//! Arrow schema inference and table to Arrow conversion
//!
//! Column types are inferred from the cells of a `MetricTable` and every
//! column becomes one nullable Arrow array.

use crate::error::{Error, Result};
use crate::stats::{Cell, MetricTable};
use arrow::array::{ArrayRef, Float64Array, Int64Array, NullArray, StringArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use std::sync::Arc;

const UTC: &str = "UTC";

/// Infer an Arrow schema from a table
///
/// Each column takes the type shared by its non-null cells. Mixed integer
/// and float columns become Float64; any other mix falls back to Utf8.
pub fn infer_schema(table: &MetricTable) -> Schema {
    let fields: Vec<Field> = table
        .columns()
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let data_type = table
                .rows()
                .iter()
                .map(|row| cell_type(&row[i]))
                .fold(DataType::Null, |acc, t| merge_types(&acc, &t));
            Field::new(name, data_type, true) // All fields nullable
        })
        .collect();
    Schema::new(fields)
}

/// Convert a table to a single Arrow RecordBatch
pub fn table_to_record_batch(table: &MetricTable) -> Result<RecordBatch> {
    let schema = Arc::new(infer_schema(table));
    if table.num_columns() == 0 {
        return Ok(RecordBatch::new_empty(schema));
    }

    let columns = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let cells: Vec<&Cell> = table.rows().iter().map(|row| &row[i]).collect();
            build_array(&cells, field.data_type())
        })
        .collect::<Result<Vec<ArrayRef>>>()?;

    RecordBatch::try_new(schema, columns).map_err(|e| Error::Output {
        message: format!("Failed to create RecordBatch: {e}"),
    })
}

/// Arrow DataType of a single cell
fn cell_type(cell: &Cell) -> DataType {
    match cell {
        Cell::Null => DataType::Null,
        Cell::Int(_) => DataType::Int64,
        Cell::Float(_) => DataType::Float64,
        Cell::Text(_) => DataType::Utf8,
        Cell::Timestamp(_) => timestamp_type(),
    }
}

fn timestamp_type() -> DataType {
    DataType::Timestamp(TimeUnit::Millisecond, Some(UTC.into()))
}

/// Merge two data types into a compatible type
fn merge_types(type1: &DataType, type2: &DataType) -> DataType {
    match (type1, type2) {
        (a, b) if a == b => a.clone(),

        // Null can merge with anything
        (DataType::Null, other) | (other, DataType::Null) => other.clone(),

        (DataType::Int64, DataType::Float64) | (DataType::Float64, DataType::Int64) => {
            DataType::Float64
        }

        _ => DataType::Utf8,
    }
}

/// Build an Arrow array from cells
fn build_array(cells: &[&Cell], data_type: &DataType) -> Result<ArrayRef> {
    match data_type {
        DataType::Null => Ok(Arc::new(NullArray::new(cells.len()))),

        DataType::Int64 => {
            let arr: Int64Array = cells
                .iter()
                .map(|c| match c {
                    Cell::Int(v) => Some(*v),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Float64 => {
            let arr: Float64Array = cells.iter().map(|c| c.as_f64()).collect();
            Ok(Arc::new(arr))
        }

        DataType::Utf8 => {
            let arr: StringArray = cells
                .iter()
                .map(|c| (!c.is_null()).then(|| c.to_string()))
                .collect();
            Ok(Arc::new(arr))
        }

        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            let arr: TimestampMillisecondArray = cells
                .iter()
                .map(|c| match c {
                    Cell::Timestamp(ts) => Some(ts.timestamp_millis()),
                    _ => None,
                })
                .collect();
            Ok(Arc::new(arr.with_timezone(UTC)))
        }

        other => Err(Error::Output {
            message: format!("Unsupported column type: {other}"),
        }),
    }
}
