#![allow(dead_code)]

use std::sync::Arc;

use arrow::array::{
    ArrayRef, Date32Array, Float64Array, Int64Array, StringArray, TimestampMillisecondArray,
};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use timeseries_model_core::{CellValue, SingleSeries};

pub type TestResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Columns `[id, ts, val]`, rows `(1,0,10), (1,1,11), (2,0,20)`.
pub fn id_ts_val() -> TestResult<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("ts", DataType::Int64, false),
        Field::new("val", DataType::Int64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![1, 1, 2])),
        Arc::new(Int64Array::from(vec![0, 1, 0])),
        Arc::new(Int64Array::from(vec![10, 11, 20])),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Same rows as [`id_ts_val`] without the timestamp column.
pub fn id_val() -> TestResult<RecordBatch> {
    let batch = id_ts_val()?;
    Ok(batch.project(&[0, 2])?)
}

/// Single column `val` with rows `5, 6`.
pub fn val_only() -> TestResult<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![Field::new("val", DataType::Int64, false)]));
    Ok(RecordBatch::try_new(
        schema,
        vec![Arc::new(Int64Array::from(vec![5, 6]))],
    )?)
}

/// Two string/int keys, millisecond timestamps and two value columns.
pub fn prices() -> TestResult<RecordBatch> {
    let base = 1_700_000_000_000_i64;
    let schema = Arc::new(Schema::new(vec![
        Field::new("symbol", DataType::Utf8, false),
        Field::new("venue", DataType::Int64, false),
        Field::new("ts", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("price", DataType::Float64, true),
        Field::new("note", DataType::Utf8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["NVDA", "NVDA", "AAPL", "NVDA", "AAPL"])),
        Arc::new(Int64Array::from(vec![1, 1, 1, 2, 1])),
        Arc::new(TimestampMillisecondArray::from(vec![
            base,
            base + 1_000,
            base,
            base,
            base + 1_500,
        ])),
        Arc::new(Float64Array::from(vec![
            Some(100.0),
            Some(101.5),
            Some(190.0),
            None,
            Some(191.25),
        ])),
        Arc::new(StringArray::from(vec![None, Some("halt"), None, None, None])),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Calendar-day timestamps.
pub fn daily() -> TestResult<RecordBatch> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("day", DataType::Date32, false),
        Field::new("val", DataType::Int64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Date32Array::from(vec![19_000, 19_001])),
        Arc::new(Int64Array::from(vec![1, 2])),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Integer values of the value column `label`.
pub fn int_values(series: &SingleSeries, label: &str) -> TestResult<Vec<i64>> {
    let column = series
        .values()?
        .into_iter()
        .find(|seq| seq.label == label)
        .ok_or("no such value column")?;
    column
        .values
        .into_iter()
        .map(|cell| match cell {
            CellValue::Int(v) => Ok(v),
            other => Err(format!("not an integer: {other:?}").into()),
        })
        .collect()
}

/// Rows of `batch` rendered as strings and sorted, for order-insensitive
/// comparisons.
pub fn sorted_rows(batch: &RecordBatch) -> TestResult<Vec<String>> {
    use arrow::util::display::{ArrayFormatter, FormatOptions};

    let options = FormatOptions::default().with_null("null");
    let formatters = batch
        .columns()
        .iter()
        .map(|c| ArrayFormatter::try_new(c.as_ref(), &options))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rows: Vec<String> = (0..batch.num_rows())
        .map(|row| {
            formatters
                .iter()
                .map(|f| f.value(row).to_string())
                .collect::<Vec<_>>()
                .join("|")
        })
        .collect();
    rows.sort();
    Ok(rows)
}

/// Column names of `batch`.
pub fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect()
}
