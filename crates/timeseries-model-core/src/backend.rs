//! Physical backends behind series and collections.
//!
//! A backend owns (by reference count) one physical table and a validated
//! column layout. Two engines are supported, chosen once at construction:
//!
//! - [`local`]: Arrow `RecordBatch`, evaluated eagerly.
//! - `distributed` (feature `datafusion`): DataFusion `DataFrame`, evaluated
//!   lazily, with pinning through [`crate::cache::ScopedCache`].
//!
//! Both implement the same two contracts, [`TimeSeriesBackend`] for one
//! series and [`MultiTimeSeriesBackend`] for a keyed collection. The closed
//! enums [`SeriesBackend`] and [`CollectionBackend`] dispatch between them.
//! Backends never mutate their table; every reshaping produces a new one.

pub mod layout;
pub mod local;

#[cfg(feature = "datafusion")]
pub mod distributed;
#[cfg(feature = "datafusion")]
pub mod grouping;

use arrow::array::{ArrayRef, RecordBatch};
use snafu::OptionExt;

use crate::error::{SeriesResult, UnknownColumnSnafu};
use crate::model::{
    CollectionAttribute, ProducerId, SeriesAttribute, SeriesAttributeValue,
};
use crate::series::SingleSeries;

pub use layout::{CollectionLayout, CollectionOptions, SeriesLayout, SeriesOptions};
pub use local::{LocalCollectionBackend, LocalSeriesBackend};

#[cfg(feature = "datafusion")]
pub use distributed::{DistributedCollectionBackend, DistributedSeriesBackend};

/// Column-level read access to a physical table.
///
/// The attribute logic in [`SeriesLayout::resolve`] only talks to this trait,
/// so each engine supplies its own way of producing a column.
pub trait ColumnAccessor {
    /// Materialize the column called `name`.
    fn column(&self, name: &str) -> SeriesResult<ArrayRef>;
    /// Number of rows.
    fn row_count(&self) -> SeriesResult<usize>;
}

impl ColumnAccessor for RecordBatch {
    fn column(&self, name: &str) -> SeriesResult<ArrayRef> {
        let column = self.column_by_name(name).context(UnknownColumnSnafu {
            column: name,
            role: "value",
        })?;
        Ok(column.clone())
    }

    fn row_count(&self) -> SeriesResult<usize> {
        Ok(self.num_rows())
    }
}

/// A series exported as a local table.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSeriesTable {
    /// The rows.
    pub batch: RecordBatch,
    /// Timestamp column; `None` means timestamps are synthesized.
    pub timestamp_column: Option<String>,
    /// Value columns in order.
    pub value_columns: Vec<String>,
}

/// A collection exported as a local table.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalCollectionTable {
    /// The rows of every series.
    pub batch: RecordBatch,
    /// Key columns in order.
    pub key_columns: Vec<String>,
    /// Timestamp column; `None` means timestamps are synthesized.
    pub timestamp_column: Option<String>,
    /// Value columns in order.
    pub value_columns: Vec<String>,
}

/// Value of a [`CollectionAttribute`].
#[derive(Debug, Clone)]
pub enum CollectionAttributeValue {
    /// One series per distinct key.
    Timeseries(Vec<SingleSeries>),
    /// Key-column names.
    IdLabels(Vec<String>),
    /// Producer identity.
    ProducerId(Option<ProducerId>),
}

/// Contract every single-series backend fulfils.
pub trait TimeSeriesBackend {
    /// Validated column roles.
    fn layout(&self) -> &SeriesLayout;

    /// Resolve one attribute.
    fn attribute(&self, attr: SeriesAttribute) -> SeriesResult<SeriesAttributeValue>;

    /// Resolve an attribute by name.
    fn get_attribute(&self, name: &str) -> SeriesResult<SeriesAttributeValue> {
        self.attribute(name.parse()?)
    }

    /// Materialize as a local table.
    fn to_local_table(&self) -> SeriesResult<LocalSeriesTable>;
}

/// Contract every multi-series backend fulfils.
pub trait MultiTimeSeriesBackend {
    /// Validated column roles.
    fn layout(&self) -> &CollectionLayout;

    /// Resolve one attribute.
    fn attribute(&self, attr: CollectionAttribute) -> SeriesResult<CollectionAttributeValue>;

    /// Resolve an attribute by name.
    fn get_attribute(&self, name: &str) -> SeriesResult<CollectionAttributeValue> {
        self.attribute(name.parse()?)
    }

    /// Materialize as a local table.
    fn to_local_table(&self) -> SeriesResult<LocalCollectionTable>;

    /// Total number of rows across every series.
    fn row_count(&self) -> SeriesResult<usize>;
}

/// A single-series backend of either engine.
#[derive(Debug, Clone)]
pub enum SeriesBackend {
    /// Eager Arrow table.
    Local(LocalSeriesBackend),
    /// Lazy DataFusion table.
    #[cfg(feature = "datafusion")]
    Distributed(DistributedSeriesBackend),
}

impl SeriesBackend {
    fn inner(&self) -> &dyn TimeSeriesBackend {
        match self {
            SeriesBackend::Local(b) => b,
            #[cfg(feature = "datafusion")]
            SeriesBackend::Distributed(b) => b,
        }
    }
}

impl TimeSeriesBackend for SeriesBackend {
    fn layout(&self) -> &SeriesLayout {
        self.inner().layout()
    }

    fn attribute(&self, attr: SeriesAttribute) -> SeriesResult<SeriesAttributeValue> {
        self.inner().attribute(attr)
    }

    fn to_local_table(&self) -> SeriesResult<LocalSeriesTable> {
        self.inner().to_local_table()
    }
}

impl From<LocalSeriesBackend> for SeriesBackend {
    fn from(b: LocalSeriesBackend) -> Self {
        SeriesBackend::Local(b)
    }
}

#[cfg(feature = "datafusion")]
impl From<DistributedSeriesBackend> for SeriesBackend {
    fn from(b: DistributedSeriesBackend) -> Self {
        SeriesBackend::Distributed(b)
    }
}

/// A multi-series backend of either engine.
#[derive(Debug, Clone)]
pub enum CollectionBackend {
    /// Eager Arrow table.
    Local(LocalCollectionBackend),
    /// Lazy DataFusion table.
    #[cfg(feature = "datafusion")]
    Distributed(DistributedCollectionBackend),
}

impl CollectionBackend {
    fn inner(&self) -> &dyn MultiTimeSeriesBackend {
        match self {
            CollectionBackend::Local(b) => b,
            #[cfg(feature = "datafusion")]
            CollectionBackend::Distributed(b) => b,
        }
    }
}

impl MultiTimeSeriesBackend for CollectionBackend {
    fn layout(&self) -> &CollectionLayout {
        self.inner().layout()
    }

    fn attribute(&self, attr: CollectionAttribute) -> SeriesResult<CollectionAttributeValue> {
        self.inner().attribute(attr)
    }

    fn to_local_table(&self) -> SeriesResult<LocalCollectionTable> {
        self.inner().to_local_table()
    }

    fn row_count(&self) -> SeriesResult<usize> {
        self.inner().row_count()
    }
}

impl From<LocalCollectionBackend> for CollectionBackend {
    fn from(b: LocalCollectionBackend) -> Self {
        CollectionBackend::Local(b)
    }
}

#[cfg(feature = "datafusion")]
impl From<DistributedCollectionBackend> for CollectionBackend {
    fn from(b: DistributedCollectionBackend) -> Self {
        CollectionBackend::Distributed(b)
    }
}
