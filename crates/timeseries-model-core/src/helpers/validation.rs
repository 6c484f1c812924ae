//! Argument validation shared by the local and distributed backends.
//!
//! These functions only look at a table's schema, so a distributed table is
//! validated without materializing any rows and both engines reject exactly
//! the same argument combinations.

use std::collections::HashSet;

use arrow::datatypes::Schema;
use snafu::prelude::*;

use crate::backend::layout::{CollectionLayout, CollectionOptions, SeriesLayout, SeriesOptions};
use crate::error::{
    ColumnRoleConflictSnafu, DuplicateColumnSnafu, IdLengthMismatchSnafu, SeriesResult,
    UnknownColumnSnafu, UnsupportedKeyTypeSnafu,
};
use crate::model::IdValue;

fn require_column(schema: &Schema, column: &str, role: &'static str) -> SeriesResult<()> {
    ensure!(
        schema.index_of(column).is_ok(),
        UnknownColumnSnafu { column, role }
    );
    Ok(())
}

fn ensure_distinct(columns: &[String]) -> SeriesResult<()> {
    let mut seen = HashSet::with_capacity(columns.len());
    for column in columns {
        ensure!(seen.insert(column.as_str()), DuplicateColumnSnafu { column });
    }
    Ok(())
}

// Explicit value columns are checked against the reserved roles; the default
// is every remaining column in schema order.
fn resolve_value_columns(
    schema: &Schema,
    requested: Option<&[String]>,
    reserved: &[&str],
) -> SeriesResult<Vec<String>> {
    match requested {
        Some(columns) => {
            ensure_distinct(columns)?;
            for column in columns {
                require_column(schema, column, "value")?;
                ensure!(
                    !reserved.contains(&column.as_str()),
                    ColumnRoleConflictSnafu {
                        column,
                        role: "value"
                    }
                );
            }
            Ok(columns.to_vec())
        }
        None => Ok(schema
            .fields()
            .iter()
            .map(|f| f.name())
            .filter(|name| !reserved.contains(&name.as_str()))
            .cloned()
            .collect()),
    }
}

/// Fail with `ColumnRoleConflict` if an export would synthesize `column`
/// (in `role`) while the table already holds a column of that name.
pub fn ensure_unclaimed(schema: &Schema, column: &str, role: &'static str) -> SeriesResult<()> {
    ensure!(
        schema.index_of(column).is_err(),
        ColumnRoleConflictSnafu { column, role }
    );
    Ok(())
}

/// Validate the column roles of one series.
pub fn validate_series(schema: &Schema, options: &SeriesOptions) -> SeriesResult<SeriesLayout> {
    let mut reserved = Vec::new();
    if let Some(ts) = options.timestamp_column.as_deref() {
        require_column(schema, ts, "timestamp")?;
        reserved.push(ts);
    }

    let value_columns =
        resolve_value_columns(schema, options.value_columns.as_deref(), &reserved)?;

    Ok(SeriesLayout {
        timestamp_column: options.timestamp_column.clone(),
        value_columns,
        ids: options.ids.clone(),
    })
}

/// Validate the column roles of a keyed collection.
pub fn validate_collection(
    schema: &Schema,
    options: &CollectionOptions,
) -> SeriesResult<CollectionLayout> {
    let key_columns = options.key_columns.as_slice();
    ensure_distinct(key_columns)?;

    for column in key_columns {
        require_column(schema, column, "key")?;
        let datatype = schema.field_with_name(column).map(|f| f.data_type().clone());
        if let Ok(datatype) = datatype {
            ensure!(
                IdValue::supports(&datatype),
                UnsupportedKeyTypeSnafu { column, datatype }
            );
        }
    }

    let mut reserved: Vec<&str> = key_columns.iter().map(String::as_str).collect();
    if let Some(ts) = options.timestamp_column.as_deref() {
        require_column(schema, ts, "timestamp")?;
        ensure!(
            !reserved.contains(&ts),
            ColumnRoleConflictSnafu {
                column: ts,
                role: "timestamp"
            }
        );
        reserved.push(ts);
    }

    let value_columns =
        resolve_value_columns(schema, options.value_columns.as_deref(), &reserved)?;

    if let Some(ids) = &options.ids {
        ensure!(
            ids.len() == key_columns.len(),
            IdLengthMismatchSnafu {
                expected: key_columns.len(),
                actual: ids.len(),
            }
        );
    }

    Ok(CollectionLayout {
        key_columns: key_columns.to_vec(),
        timestamp_column: options.timestamp_column.clone(),
        value_columns,
        ids: options.ids.clone(),
        producer_id: options.producer_id.clone(),
    })
}
