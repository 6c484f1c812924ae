//! Row-level values of a series.

use serde::{Deserialize, Serialize};

/// One row-level value from a value column.
///
/// List-like columns (for example embedding vectors) are flattened into
/// [`CellValue::List`] so that every column can be walked row by row.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum CellValue {
    /// Missing value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Signed integer (any width, widened).
    Int(i64),
    /// Unsigned integer (any width, widened).
    UInt(u64),
    /// Floating point value.
    Float(f64),
    /// String value.
    Str(String),
    /// Nested list value.
    List(Vec<CellValue>),
}

/// All values of one value column of a series, in row order.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ValueSequence {
    /// Name of the value column.
    pub label: String,
    /// Row values.
    pub values: Vec<CellValue>,
}
