//! Calendar ("periodic") timestamp columns.
//!
//! Local tables may carry the timestamp role as a calendar date
//! (`Date32`/`Date64`). Before a local table is bridged into the distributed
//! engine, that column is converted to a millisecond `Timestamp` at its
//! canonical instant (midnight UTC) so that window and ordering operations on
//! the timestamp role work on instants.

use std::sync::Arc;

use arrow::array::RecordBatch;
use arrow::compute::cast;
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use snafu::ResultExt;

use crate::error::{ArrowSnafu, SeriesResult};

fn is_periodic(dt: &DataType) -> bool {
    matches!(dt, DataType::Date32 | DataType::Date64)
}

/// Convert **one** calendar column of `batch` to `Timestamp(Millisecond, None)`.
///
/// With `timestamp_column` set only that column is considered; otherwise the
/// first calendar column is converted. When no such column exists the batch
/// is returned unchanged (the clone only bumps reference counts).
pub fn strip_periodic(
    batch: &RecordBatch,
    timestamp_column: Option<&str>,
) -> SeriesResult<RecordBatch> {
    let schema = batch.schema();
    let index = match timestamp_column {
        Some(name) => schema
            .index_of(name)
            .ok()
            .filter(|&i| is_periodic(schema.field(i).data_type())),
        None => schema
            .fields()
            .iter()
            .position(|f| is_periodic(f.data_type())),
    };

    let Some(index) = index else {
        return Ok(batch.clone());
    };

    let target = DataType::Timestamp(TimeUnit::Millisecond, None);
    let converted = cast(batch.column(index), &target).context(ArrowSnafu)?;

    let mut fields: Vec<Field> = schema.fields().iter().map(|f| f.as_ref().clone()).collect();
    fields[index] = fields[index].clone().with_data_type(target);

    let mut columns = batch.columns().to_vec();
    columns[index] = converted;

    RecordBatch::try_new(
        Arc::new(Schema::new_with_metadata(fields, schema.metadata().clone())),
        columns,
    )
    .context(ArrowSnafu)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Array, Date32Array, Int64Array, TimestampMillisecondArray};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn batch() -> Result<RecordBatch, Box<dyn std::error::Error>> {
        let schema = Arc::new(Schema::new(vec![
            Field::new("day", DataType::Date32, false),
            Field::new("val", DataType::Int64, false),
        ]));
        Ok(RecordBatch::try_new(
            schema,
            vec![
                Arc::new(Date32Array::from(vec![0, 1])),
                Arc::new(Int64Array::from(vec![5, 6])),
            ],
        )?)
    }

    #[test]
    fn converts_first_calendar_column() -> TestResult {
        let out = strip_periodic(&batch()?, None)?;
        assert_eq!(
            out.schema().field(0).data_type(),
            &DataType::Timestamp(TimeUnit::Millisecond, None)
        );
        let ts = out
            .column(0)
            .as_any()
            .downcast_ref::<TimestampMillisecondArray>()
            .ok_or("timestamp column")?;
        assert_eq!(ts.value(1), 86_400_000);
        assert_eq!(out.column(1).len(), 2);
        Ok(())
    }

    #[test]
    fn named_non_calendar_column_is_left_alone() -> TestResult {
        let input = batch()?;
        let out = strip_periodic(&input, Some("val"))?;
        assert_eq!(out.schema(), input.schema());
        Ok(())
    }
}
