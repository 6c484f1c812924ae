//! Timestamp normalization.
//!
//! Every backend reports timestamps as `f64` seconds since the Unix epoch:
//! - numeric columns pass through unchanged,
//! - `Date32`/`Date64` (calendar days) use the instant of midnight UTC,
//! - `Timestamp(unit, tz)` uses the stored instant; timezone-naive values are
//!   read as UTC wall-clock time, so a naive `2024-01-01T00:00:00` maps to
//!   the same seconds as `NaiveDateTime::and_utc().timestamp()`.
//!
//! Null slots become `NaN`. Any other type is an
//! [`SeriesError::UnsupportedValueType`].

use arrow::array::{Array, ArrowPrimitiveType, AsArray};
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type,
    Int64Type, TimeUnit, TimestampMicrosecondType, TimestampMillisecondType,
    TimestampNanosecondType, TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use arrow::temporal_conversions::date32_to_datetime;

use crate::error::{SeriesError, SeriesResult};

/// Synthesized timestamps: the 0-based row position.
pub fn position_timestamps(len: usize) -> Vec<f64> {
    (0..len).map(|i| i as f64).collect()
}

/// Normalize a timestamp column to seconds since the Unix epoch.
pub fn timestamp_seconds(array: &dyn Array, column: &str) -> SeriesResult<Vec<f64>> {
    let out = match array.data_type() {
        DataType::Int8 => numeric::<Int8Type>(array, |v| v as f64),
        DataType::Int16 => numeric::<Int16Type>(array, |v| v as f64),
        DataType::Int32 => numeric::<Int32Type>(array, |v| v as f64),
        DataType::Int64 => numeric::<Int64Type>(array, |v| v as f64),
        DataType::UInt8 => numeric::<UInt8Type>(array, |v| v as f64),
        DataType::UInt16 => numeric::<UInt16Type>(array, |v| v as f64),
        DataType::UInt32 => numeric::<UInt32Type>(array, |v| v as f64),
        DataType::UInt64 => numeric::<UInt64Type>(array, |v| v as f64),
        DataType::Float32 => numeric::<Float32Type>(array, |v| v as f64),
        DataType::Float64 => numeric::<Float64Type>(array, |v| v),

        DataType::Date32 => numeric::<Date32Type>(array, |days| {
            date32_to_datetime(days)
                .map(|dt| dt.and_utc().timestamp() as f64)
                .unwrap_or(f64::NAN)
        }),
        DataType::Date64 => numeric::<Date64Type>(array, |millis| scaled(millis, 1_000)),

        DataType::Timestamp(TimeUnit::Second, _) => {
            numeric::<TimestampSecondType>(array, |v| v as f64)
        }
        DataType::Timestamp(TimeUnit::Millisecond, _) => {
            numeric::<TimestampMillisecondType>(array, |v| scaled(v, 1_000))
        }
        DataType::Timestamp(TimeUnit::Microsecond, _) => {
            numeric::<TimestampMicrosecondType>(array, |v| scaled(v, 1_000_000))
        }
        DataType::Timestamp(TimeUnit::Nanosecond, _) => {
            numeric::<TimestampNanosecondType>(array, |v| scaled(v, 1_000_000_000))
        }

        other => {
            return Err(SeriesError::UnsupportedValueType {
                column: column.to_string(),
                datatype: other.clone(),
            });
        }
    };

    Ok(out)
}

fn numeric<T: ArrowPrimitiveType>(array: &dyn Array, f: impl Fn(T::Native) -> f64) -> Vec<f64> {
    array
        .as_primitive::<T>()
        .iter()
        .map(|v| v.map(&f).unwrap_or(f64::NAN))
        .collect()
}

// Split into whole seconds and remainder first so large nanosecond values
// keep their sub-second precision.
fn scaled(value: i64, per_second: i64) -> f64 {
    let secs = value.div_euclid(per_second);
    let rem = value.rem_euclid(per_second);
    secs as f64 + rem as f64 / per_second as f64
}
