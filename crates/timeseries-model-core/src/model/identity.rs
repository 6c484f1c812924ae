//! Key values, id tuples and producer identity.
//!
//! A multi-series collection is partitioned by one or more key columns. Each
//! resulting series carries an id-tuple (one [`IdValue`] per key label, in key
//! label order). Key columns are restricted to integer, boolean and string
//! types so that ids can be compared, sorted and turned back into constant
//! columns when a collection is re-assembled into one table.

use std::fmt;
use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Int64Array, StringArray, UInt64Array,
};
use arrow::datatypes::{
    DataType, Int8Type, Int16Type, Int32Type, Int64Type, UInt8Type, UInt16Type, UInt32Type,
    UInt64Type,
};
use serde::{Deserialize, Serialize};

use crate::error::{SeriesError, SeriesResult};

/// One key value identifying a group.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum IdValue {
    /// Signed integer key (any signed width, widened).
    Int(i64),
    /// Unsigned integer key (any unsigned width, widened).
    UInt(u64),
    /// String key.
    Str(String),
    /// Boolean key.
    Bool(bool),
}

impl IdValue {
    /// Whether `dt` can hold key values.
    pub fn supports(dt: &DataType) -> bool {
        matches!(
            dt,
            DataType::Int8
                | DataType::Int16
                | DataType::Int32
                | DataType::Int64
                | DataType::UInt8
                | DataType::UInt16
                | DataType::UInt32
                | DataType::UInt64
                | DataType::Boolean
                | DataType::Utf8
                | DataType::LargeUtf8
                | DataType::Utf8View
        )
    }

    /// Read the key value at `row`, or `None` if the slot is null.
    pub fn from_array(array: &dyn Array, row: usize, column: &str) -> SeriesResult<Option<Self>> {
        if array.is_null(row) {
            return Ok(None);
        }

        let value = match array.data_type() {
            DataType::Int8 => IdValue::Int(array.as_primitive::<Int8Type>().value(row) as i64),
            DataType::Int16 => IdValue::Int(array.as_primitive::<Int16Type>().value(row) as i64),
            DataType::Int32 => IdValue::Int(array.as_primitive::<Int32Type>().value(row) as i64),
            DataType::Int64 => IdValue::Int(array.as_primitive::<Int64Type>().value(row)),
            DataType::UInt8 => IdValue::UInt(array.as_primitive::<UInt8Type>().value(row) as u64),
            DataType::UInt16 => {
                IdValue::UInt(array.as_primitive::<UInt16Type>().value(row) as u64)
            }
            DataType::UInt32 => {
                IdValue::UInt(array.as_primitive::<UInt32Type>().value(row) as u64)
            }
            DataType::UInt64 => IdValue::UInt(array.as_primitive::<UInt64Type>().value(row)),
            DataType::Boolean => IdValue::Bool(array.as_boolean().value(row)),
            DataType::Utf8 => IdValue::Str(array.as_string::<i32>().value(row).to_string()),
            DataType::LargeUtf8 => IdValue::Str(array.as_string::<i64>().value(row).to_string()),
            DataType::Utf8View => IdValue::Str(array.as_string_view().value(row).to_string()),
            other => {
                return Err(SeriesError::UnsupportedKeyType {
                    column: column.to_string(),
                    datatype: other.clone(),
                });
            }
        };

        Ok(Some(value))
    }

    /// Arrow type used when this value is written back as a column.
    pub fn data_type(&self) -> DataType {
        match self {
            IdValue::Int(_) => DataType::Int64,
            IdValue::UInt(_) => DataType::UInt64,
            IdValue::Str(_) => DataType::Utf8,
            IdValue::Bool(_) => DataType::Boolean,
        }
    }

    /// Build a constant column of `len` rows holding this value.
    pub fn repeat(&self, len: usize) -> ArrayRef {
        match self {
            IdValue::Int(v) => Arc::new(Int64Array::from(vec![*v; len])),
            IdValue::UInt(v) => Arc::new(UInt64Array::from(vec![*v; len])),
            IdValue::Str(v) => Arc::new(StringArray::from(vec![v.as_str(); len])),
            IdValue::Bool(v) => Arc::new(BooleanArray::from(vec![*v; len])),
        }
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdValue::Int(v) => write!(f, "{v}"),
            IdValue::UInt(v) => write!(f, "{v}"),
            IdValue::Str(v) => write!(f, "{v}"),
            IdValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<i64> for IdValue {
    fn from(v: i64) -> Self {
        IdValue::Int(v)
    }
}

impl From<i32> for IdValue {
    fn from(v: i32) -> Self {
        IdValue::Int(v as i64)
    }
}

impl From<u64> for IdValue {
    fn from(v: u64) -> Self {
        IdValue::UInt(v)
    }
}

impl From<bool> for IdValue {
    fn from(v: bool) -> Self {
        IdValue::Bool(v)
    }
}

impl From<&str> for IdValue {
    fn from(v: &str) -> Self {
        IdValue::Str(v.to_string())
    }
}

impl From<String> for IdValue {
    fn from(v: String) -> Self {
        IdValue::Str(v)
    }
}

/// The key of one group produced by partitioning a collection.
///
/// Single-key groups carry a scalar key, mirroring the ungrouped case;
/// multi-key groups carry the full tuple in key-column order.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    /// Key of a group partitioned by exactly one column.
    Scalar(IdValue),
    /// Key of a group partitioned by two or more columns.
    Tuple(Vec<IdValue>),
}

impl GroupKey {
    /// Build a key from the values of every key column, in order.
    pub fn from_values(mut values: Vec<IdValue>) -> Self {
        if values.len() == 1 {
            if let Some(v) = values.pop() {
                return GroupKey::Scalar(v);
            }
        }
        GroupKey::Tuple(values)
    }

    /// Normalize to the id-tuple stored on a series.
    pub fn into_ids(self) -> Vec<IdValue> {
        match self {
            GroupKey::Scalar(v) => vec![v],
            GroupKey::Tuple(values) => values,
        }
    }
}

/// Provenance tag attached to a multi-series collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct ProducerId {
    /// Name of the producer (for example a model or pipeline).
    pub name: String,
    /// Version of the producer.
    pub version: String,
}

impl ProducerId {
    /// Create a producer identity.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }
}

impl<N: Into<String>, V: Into<String>> From<(N, V)> for ProducerId {
    fn from((name, version): (N, V)) -> Self {
        ProducerId::new(name, version)
    }
}

/// Ordered key-column names, accepted as one name or a sequence of names.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyColumns(Vec<String>);

impl KeyColumns {
    /// No key columns (the ungrouped shape).
    pub fn none() -> Self {
        Self(Vec::new())
    }

    /// Key-column names in order.
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    /// Consume into the ordered list of names.
    pub fn into_vec(self) -> Vec<String> {
        self.0
    }

    /// Number of key columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no key columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for KeyColumns {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for KeyColumns {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for KeyColumns {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for KeyColumns {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for KeyColumns {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for KeyColumns {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|n| n.to_string()).collect())
    }
}

impl<T: Into<KeyColumns>> From<Option<T>> for KeyColumns {
    fn from(names: Option<T>) -> Self {
        names.map(Into::into).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Int32Array, StringViewArray};

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn reads_widened_integers_and_strings() -> TestResult {
        let ints = Int32Array::from(vec![Some(7), None]);
        assert_eq!(IdValue::from_array(&ints, 0, "id")?, Some(IdValue::Int(7)));
        assert_eq!(IdValue::from_array(&ints, 1, "id")?, None);

        let views = StringViewArray::from(vec!["a"]);
        assert_eq!(
            IdValue::from_array(&views, 0, "id")?,
            Some(IdValue::Str("a".to_string()))
        );
        Ok(())
    }

    #[test]
    fn float_keys_are_rejected() {
        let floats = arrow::array::Float64Array::from(vec![1.0]);
        let err = IdValue::from_array(&floats, 0, "f").expect_err("floats are not keys");
        assert!(matches!(err, SeriesError::UnsupportedKeyType { .. }));
    }

    #[test]
    fn group_key_scalar_for_single_column() {
        let key = GroupKey::from_values(vec![IdValue::Int(1)]);
        assert_eq!(key, GroupKey::Scalar(IdValue::Int(1)));
        assert_eq!(key.into_ids(), vec![IdValue::Int(1)]);

        let key = GroupKey::from_values(vec![IdValue::Int(1), IdValue::from("a")]);
        assert!(matches!(key, GroupKey::Tuple(ref v) if v.len() == 2));
    }

    #[test]
    fn key_columns_normalize_single_name() {
        let keys = KeyColumns::from("id");
        assert_eq!(keys.as_slice(), ["id".to_string()]);
        assert!(KeyColumns::from(None::<&str>).is_empty());
        assert_eq!(KeyColumns::from(["a", "b"]).len(), 2);
    }

    #[test]
    fn repeat_builds_constant_column() {
        let col = IdValue::from("x").repeat(3);
        assert_eq!(col.len(), 3);
        assert_eq!(col.data_type(), &DataType::Utf8);
    }
}
