//! Row-by-row access to value columns.
//!
//! Arrow arrays are not directly iterable as a uniform value type, and
//! columns coming back from the distributed engine may use view or large
//! string encodings. [`column_cells`] turns any supported column into
//! [`CellValue`]s, recursing into list columns (one nested list per row).

use arrow::array::{Array, ArrowPrimitiveType, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type,
    UInt16Type, UInt32Type, UInt64Type,
};
use snafu::ResultExt;

use crate::error::{ArrowSnafu, SeriesError, SeriesResult};
use crate::model::CellValue;

/// Convert every row of `array` into a [`CellValue`].
pub fn column_cells(array: &dyn Array, column: &str) -> SeriesResult<Vec<CellValue>> {
    let cells = match array.data_type() {
        DataType::Null => vec![CellValue::Null; array.len()],
        DataType::Boolean => array
            .as_boolean()
            .iter()
            .map(|v| v.map(CellValue::Bool).unwrap_or(CellValue::Null))
            .collect(),

        DataType::Int8 => primitive::<Int8Type>(array, |v| CellValue::Int(v as i64)),
        DataType::Int16 => primitive::<Int16Type>(array, |v| CellValue::Int(v as i64)),
        DataType::Int32 => primitive::<Int32Type>(array, |v| CellValue::Int(v as i64)),
        DataType::Int64 => primitive::<Int64Type>(array, CellValue::Int),
        DataType::UInt8 => primitive::<UInt8Type>(array, |v| CellValue::UInt(v as u64)),
        DataType::UInt16 => primitive::<UInt16Type>(array, |v| CellValue::UInt(v as u64)),
        DataType::UInt32 => primitive::<UInt32Type>(array, |v| CellValue::UInt(v as u64)),
        DataType::UInt64 => primitive::<UInt64Type>(array, CellValue::UInt),
        DataType::Float32 => primitive::<Float32Type>(array, |v| CellValue::Float(v as f64)),
        DataType::Float64 => primitive::<Float64Type>(array, CellValue::Float),

        DataType::Utf8 => strings(array.as_string::<i32>().iter()),
        DataType::LargeUtf8 => strings(array.as_string::<i64>().iter()),
        DataType::Utf8View => strings(array.as_string_view().iter()),

        // Temporal values are reported as their raw integer encoding.
        DataType::Date32
        | DataType::Date64
        | DataType::Timestamp(_, _)
        | DataType::Duration(_) => {
            let raw = cast(array, &DataType::Int64).context(ArrowSnafu)?;
            primitive::<Int64Type>(raw.as_ref(), CellValue::Int)
        }

        DataType::List(_) => {
            let list = array.as_list::<i32>();
            nested(list.iter(), column)?
        }
        DataType::LargeList(_) => {
            let list = array.as_list::<i64>();
            nested(list.iter(), column)?
        }
        DataType::FixedSizeList(_, _) => {
            let list = array.as_fixed_size_list();
            nested(list.iter(), column)?
        }

        other => {
            return Err(SeriesError::UnsupportedValueType {
                column: column.to_string(),
                datatype: other.clone(),
            });
        }
    };

    Ok(cells)
}

fn primitive<T: ArrowPrimitiveType>(
    array: &dyn Array,
    f: impl Fn(T::Native) -> CellValue,
) -> Vec<CellValue> {
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map(&f).unwrap_or(CellValue::Null))
        .collect()
}

fn strings<'a>(iter: impl Iterator<Item = Option<&'a str>>) -> Vec<CellValue> {
    iter.map(|v| {
        v.map(|s| CellValue::Str(s.to_string()))
            .unwrap_or(CellValue::Null)
    })
    .collect()
}

fn nested(
    rows: impl Iterator<Item = Option<arrow::array::ArrayRef>>,
    column: &str,
) -> SeriesResult<Vec<CellValue>> {
    rows.map(|row| match row {
        Some(values) => column_cells(values.as_ref(), column).map(CellValue::List),
        None => Ok(CellValue::Null),
    })
    .collect()
}
