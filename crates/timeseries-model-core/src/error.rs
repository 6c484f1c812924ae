//! Error types and SNAFU context selectors for the time-series data model.
//!
//! This module centralizes the `SeriesError` enum returned by every public
//! operation and exposes context selectors (via
//! `#[snafu(visibility(pub(crate)))]`) so backends and helpers can attach
//! context without re-exporting everything at the crate root. Keep new
//! variants here so user-facing messages stay consistent.
//!
//! None of these errors are transient: they describe programmer or
//! data-shape mistakes, so callers should not retry.

use arrow::{datatypes::DataType, error::ArrowError};
use snafu::prelude::*;

/// Convenience alias used across the crate.
pub type SeriesResult<T> = Result<T, SeriesError>;

/// Coarse classification of a [`SeriesError`].
///
/// Useful when callers want to branch on the class of failure without
/// matching every concrete variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed column specification, id length mismatch, bad key type.
    InvalidArgument,
    /// Construction was attempted without any usable data source.
    MissingDataArgument,
    /// `get_attribute` was called with a name outside the recognized set.
    UnknownAttribute,
    /// The operation needs an engine capability that is not available.
    UnsupportedOperation,
    /// A timestamp-like or value column has a type that cannot be converted.
    UnsupportedValueType,
    /// The underlying physical engine failed.
    Engine,
}

/// Errors from time-series construction, attribute reads, and exports.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SeriesError {
    /// A column named in the arguments does not exist in the table.
    #[snafu(display("Unknown {role} column {column}"))]
    UnknownColumn {
        /// Name of the missing column.
        column: String,
        /// Role the column was requested for (key, timestamp, value).
        role: &'static str,
    },

    /// The same column was listed twice for one role.
    #[snafu(display("Column {column} listed more than once"))]
    DuplicateColumn {
        /// Name of the duplicated column.
        column: String,
    },

    /// A column was assigned two roles (for example key and value).
    #[snafu(display("Column {column} cannot be used as a {role} column"))]
    ColumnRoleConflict {
        /// Name of the conflicting column.
        column: String,
        /// Role that could not be assigned.
        role: &'static str,
    },

    /// Key columns must hold integers, booleans or strings.
    #[snafu(display("Unsupported type {datatype} for key column {column}"))]
    UnsupportedKeyType {
        /// Name of the key column.
        column: String,
        /// Arrow type found for the key column.
        datatype: DataType,
    },

    /// An id-tuple does not have one entry per key label.
    #[snafu(display("Expected {expected} id values (one per key label), got {actual}"))]
    IdLengthMismatch {
        /// Number of key labels.
        expected: usize,
        /// Number of id values supplied.
        actual: usize,
    },

    /// Any other malformed argument.
    #[snafu(display("Invalid argument: {message}"))]
    InvalidArgument {
        /// Human readable description of the problem.
        message: String,
    },

    /// Construction was called with neither a table nor explicit series.
    #[snafu(display("A time series needs a data table or explicit series"))]
    MissingDataArgument,

    /// `get_attribute` was called with a name the backend does not know.
    #[snafu(display("Provided an attribute name that does not exist: {name}"))]
    UnknownAttribute {
        /// The unrecognized attribute name.
        name: String,
    },

    /// The requested operation needs a capability the process does not have.
    #[snafu(display("Unsupported operation: {operation}"))]
    UnsupportedOperation {
        /// Short description of the refused operation.
        operation: String,
    },

    /// A column value could not be converted (timestamps, cells).
    #[snafu(display("Unsupported type {datatype} in column {column}"))]
    UnsupportedValueType {
        /// Column holding the unsupported values.
        column: String,
        /// Arrow type of that column.
        datatype: DataType,
    },

    /// Arrow compute or construction error.
    #[snafu(display("Arrow error: {source}"))]
    Arrow {
        /// Underlying Arrow error.
        source: ArrowError,
    },

    /// DataFusion planning or execution error.
    #[cfg(feature = "datafusion")]
    #[snafu(display("DataFusion error: {source}"))]
    DataFusion {
        /// Underlying DataFusion error.
        source: datafusion::error::DataFusionError,
    },

    /// The Tokio runtime driving DataFusion could not be started.
    #[cfg(feature = "datafusion")]
    #[snafu(display("Failed to start the distributed engine runtime: {source}"))]
    Runtime {
        /// Underlying I/O error from the runtime builder.
        source: std::io::Error,
    },
}

impl SeriesError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            SeriesError::UnknownColumn { .. }
            | SeriesError::DuplicateColumn { .. }
            | SeriesError::ColumnRoleConflict { .. }
            | SeriesError::UnsupportedKeyType { .. }
            | SeriesError::IdLengthMismatch { .. }
            | SeriesError::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            SeriesError::MissingDataArgument => ErrorKind::MissingDataArgument,
            SeriesError::UnknownAttribute { .. } => ErrorKind::UnknownAttribute,
            SeriesError::UnsupportedOperation { .. } => ErrorKind::UnsupportedOperation,
            SeriesError::UnsupportedValueType { .. } => ErrorKind::UnsupportedValueType,
            SeriesError::Arrow { .. } => ErrorKind::Engine,
            #[cfg(feature = "datafusion")]
            SeriesError::DataFusion { .. } | SeriesError::Runtime { .. } => ErrorKind::Engine,
        }
    }
}
