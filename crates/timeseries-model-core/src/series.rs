//! One ungrouped series.
//!
//! A [`SingleSeries`] is a backend plus a memoized local materialization. It
//! is either built directly from a table and [`SeriesOptions`], or produced by
//! partitioning a collection, in which case it carries the id-tuple of its
//! group. Series are immutable after construction.

use std::sync::{Arc, OnceLock};

use arrow::array::{Int64Array, RecordBatch};

use crate::backend::{
    LocalSeriesBackend, LocalSeriesTable, SeriesBackend, SeriesOptions, TimeSeriesBackend,
};
use crate::error::{SeriesError, SeriesResult};
use crate::helpers::reshape::{append_column, drop_columns, retain_columns};
use crate::helpers::validation::ensure_unclaimed;
use crate::model::{IdValue, SeriesAttribute, SeriesAttributeValue, ValueSequence};
use crate::timeseries::TIMESTAMP_COLUMN;

#[cfg(feature = "datafusion")]
use crate::{
    backend::{DistributedSeriesBackend, grouping::append_group_positions},
    engine::{DistributedTable, from_local, require_distributed},
    helpers::periodic::strip_periodic,
};

/// One ordered sequence of (timestamp, values) observations.
#[derive(Debug, Clone)]
pub struct SingleSeries {
    backend: SeriesBackend,
    local: OnceLock<LocalSeriesTable>,
}

macro_rules! typed_attribute {
    ($self:ident, $attr:ident) => {
        match $self.attribute(SeriesAttribute::$attr)? {
            SeriesAttributeValue::$attr(v) => Ok(v),
            other => Err(SeriesError::InvalidArgument {
                message: format!(
                    "backend answered {} with {other:?}",
                    SeriesAttribute::$attr
                ),
            }),
        }
    };
}

impl SingleSeries {
    /// Wrap a local table.
    pub fn try_new(batch: RecordBatch, options: &SeriesOptions) -> SeriesResult<Self> {
        Ok(Self::from_backend(LocalSeriesBackend::try_new(batch, options)?))
    }

    /// Wrap a distributed table.
    #[cfg(feature = "datafusion")]
    pub fn try_from_distributed(
        table: DistributedTable,
        options: &SeriesOptions,
    ) -> SeriesResult<Self> {
        Ok(Self::from_backend(DistributedSeriesBackend::try_new(table, options)?))
    }

    pub(crate) fn from_backend(backend: impl Into<SeriesBackend>) -> Self {
        Self {
            backend: backend.into(),
            local: OnceLock::new(),
        }
    }

    /// The backend holding the rows.
    pub fn backend(&self) -> &SeriesBackend {
        &self.backend
    }

    /// Resolve an attribute by name.
    ///
    /// Fails with [`SeriesError::UnknownAttribute`] for names outside
    /// [`SeriesAttribute::ALL`].
    pub fn get_attribute(&self, name: &str) -> SeriesResult<SeriesAttributeValue> {
        self.backend.get_attribute(name)
    }

    /// Resolve one attribute.
    pub fn attribute(&self, attr: SeriesAttribute) -> SeriesResult<SeriesAttributeValue> {
        self.backend.attribute(attr)
    }

    /// Timestamps in seconds since the Unix epoch, or 0-based positions when
    /// no timestamp column is configured.
    pub fn timestamps(&self) -> SeriesResult<Vec<f64>> {
        typed_attribute!(self, Timestamps)
    }

    /// One sequence per value column.
    pub fn values(&self) -> SeriesResult<Vec<ValueSequence>> {
        typed_attribute!(self, Values)
    }

    /// Id-tuple (empty for an ungrouped series).
    pub fn ids(&self) -> SeriesResult<Vec<IdValue>> {
        typed_attribute!(self, Ids)
    }

    /// Number of observations.
    pub fn len(&self) -> SeriesResult<usize> {
        typed_attribute!(self, Len)
    }

    /// Whether the series has no observations.
    pub fn is_empty(&self) -> SeriesResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Timestamp column, if configured.
    pub fn timestamp_label(&self) -> Option<&str> {
        self.backend.layout().timestamp_column()
    }

    /// Value columns in order.
    pub fn value_labels(&self) -> &[String] {
        self.backend.layout().value_columns()
    }

    /// Local materialization, computed once.
    pub fn to_local_table(&self) -> SeriesResult<&LocalSeriesTable> {
        if let Some(table) = self.local.get() {
            return Ok(table);
        }
        let table = self.backend.to_local_table()?;
        Ok(self.local.get_or_init(|| table))
    }

    /// Names of the exported columns (timestamp and values) in table order.
    fn exported_columns(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.value_labels().iter().map(String::as_str).collect();
        names.extend(self.timestamp_label());
        names
    }

    /// Export as a local table holding the timestamp and value columns.
    ///
    /// `include_timestamps`:
    /// - `Some(true)` without a timestamp column appends a 0-based
    ///   [`TIMESTAMP_COLUMN`],
    /// - `Some(false)` drops the configured timestamp column,
    /// - `None` leaves the table as it is.
    ///
    /// If a value column is already named [`TIMESTAMP_COLUMN`], synthesizing
    /// fails with [`SeriesError::ColumnRoleConflict`].
    pub fn as_local_table(&self, include_timestamps: Option<bool>) -> SeriesResult<RecordBatch> {
        let table = self.to_local_table()?;
        let batch = retain_columns(&table.batch, &self.exported_columns())?;

        match (include_timestamps, self.timestamp_label()) {
            (Some(true), None) => {
                ensure_unclaimed(batch.schema().as_ref(), TIMESTAMP_COLUMN, "timestamp")?;
                let positions = Int64Array::from_iter_values(0..batch.num_rows() as i64);
                append_column(&batch, TIMESTAMP_COLUMN, Arc::new(positions))
            }
            (Some(false), Some(ts)) => drop_columns(&batch, &[ts]),
            _ => Ok(batch),
        }
    }

    /// Export as a distributed table, with the same timestamp rules as
    /// [`SingleSeries::as_local_table`].
    ///
    /// A distributed series stays lazy; a local one is registered with the
    /// shared session after calendar timestamps are converted to instants.
    #[cfg(feature = "datafusion")]
    pub fn as_distributed_table(
        &self,
        include_timestamps: Option<bool>,
    ) -> SeriesResult<DistributedTable> {
        require_distributed("exporting a distributed table")?;

        match &self.backend {
            SeriesBackend::Distributed(backend) => {
                let table = backend.table().retain_columns(&self.exported_columns())?;
                match (include_timestamps, self.timestamp_label()) {
                    (Some(true), None) => {
                        ensure_unclaimed(&table.schema(), TIMESTAMP_COLUMN, "timestamp")?;
                        append_group_positions(&table, &[], TIMESTAMP_COLUMN)
                    }
                    (Some(false), Some(ts)) => table.drop_columns(&[ts]),
                    _ => Ok(table),
                }
            }
            SeriesBackend::Local(_) => {
                let batch = self.as_local_table(include_timestamps)?;
                let ts = match include_timestamps {
                    Some(false) => None,
                    _ => self.timestamp_label(),
                };
                from_local(strip_periodic(&batch, ts)?)
            }
        }
    }
}
