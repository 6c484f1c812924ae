use std::sync::Arc;

use arrow::array::{ArrayRef, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};

use crate::model::CellValue;
use crate::series::SingleSeries;

pub(crate) type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Columns `[id, ts, val]`, rows `(1,0,10), (1,1,11), (2,0,20)`.
pub(crate) fn id_ts_val_batch() -> Result<RecordBatch, Box<dyn std::error::Error>> {
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

/// Single column `val` with rows `5, 6`.
pub(crate) fn val_only_batch() -> Result<RecordBatch, Box<dyn std::error::Error>> {
    let schema = Arc::new(Schema::new(vec![Field::new("val", DataType::Int64, false)]));
    Ok(RecordBatch::try_new(
        schema,
        vec![Arc::new(Int64Array::from(vec![5, 6]))],
    )?)
}

/// `id` is null in the middle row.
pub(crate) fn nullable_key_batch() -> Result<RecordBatch, Box<dyn std::error::Error>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, true),
        Field::new("val", DataType::Int64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(vec![Some(1), None, Some(1)])),
        Arc::new(Int64Array::from(vec![1, 2, 3])),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Keys `(region, id)`: `(east,1)`, `(west,1)`, `(east,2)`, `(east,1)`.
pub(crate) fn two_key_batch() -> Result<RecordBatch, Box<dyn std::error::Error>> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("region", DataType::Utf8, false),
        Field::new("id", DataType::Int64, false),
        Field::new("val", DataType::Int64, false),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from(vec!["east", "west", "east", "east"])),
        Arc::new(Int64Array::from(vec![1, 1, 2, 1])),
        Arc::new(Int64Array::from(vec![100, 200, 300, 400])),
    ];
    Ok(RecordBatch::try_new(schema, columns)?)
}

/// Integer values of the value column `label`.
pub(crate) fn int_values(
    series: &SingleSeries,
    label: &str,
) -> Result<Vec<i64>, Box<dyn std::error::Error>> {
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
