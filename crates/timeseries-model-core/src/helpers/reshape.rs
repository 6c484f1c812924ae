//! Column-level reshaping of local tables for export.
//!
//! Exports never modify a backend's table; these helpers build a new
//! `RecordBatch` sharing the untouched column buffers.

use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch};
use arrow::datatypes::{Field, Schema};
use snafu::prelude::*;

use crate::error::{ArrowSnafu, DuplicateColumnSnafu, SeriesResult};

/// Append `column` as the last column, named `name`.
pub fn append_column(batch: &RecordBatch, name: &str, column: ArrayRef) -> SeriesResult<RecordBatch> {
    let schema = batch.schema();
    ensure!(
        schema.index_of(name).is_err(),
        DuplicateColumnSnafu { column: name }
    );

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields.push(Field::new(name, column.data_type().clone(), column.null_count() > 0));

    let mut columns = batch.columns().to_vec();
    columns.push(column);

    RecordBatch::try_new(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
    )
    .context(ArrowSnafu)
}

/// Drop every column named in `names`; unknown names are ignored.
pub fn drop_columns(batch: &RecordBatch, names: &[&str]) -> SeriesResult<RecordBatch> {
    let keep: Vec<usize> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| !names.contains(&f.name().as_str()))
        .map(|(i, _)| i)
        .collect();
    batch.project(&keep).context(ArrowSnafu)
}

/// Keep only the columns named in `names`, in table order.
pub fn retain_columns(batch: &RecordBatch, names: &[&str]) -> SeriesResult<RecordBatch> {
    let keep: Vec<usize> = batch
        .schema()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| names.contains(&f.name().as_str()))
        .map(|(i, _)| i)
        .collect();
    batch.project(&keep).context(ArrowSnafu)
}
