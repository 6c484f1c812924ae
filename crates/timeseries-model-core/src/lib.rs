//! Backend-polymorphic time-series data model.
//!
//! A [`TimeSeries`] is a logical table of observations indexed by time and
//! optionally grouped by one or more key columns. It can be built from, and
//! exported back to, either physical engine without the caller knowing which
//! one holds the rows:
//!
//! - an eager, in-memory Arrow `RecordBatch` (always available),
//! - a lazy DataFusion `DataFrame` wrapped in [`engine::DistributedTable`]
//!   (cargo feature `datafusion`, on by default).
//!
//! The crate is organized as follows:
//!
//! - [`model`]: key values, producer identity, attribute names and values.
//! - [`backend`]: the per-engine single-series and multi-series backends and
//!   the column-role layouts they share.
//! - [`cache`]: the scoped pinning guard used around deferred reads.
//! - [`series`]: [`SingleSeries`], one ungrouped series.
//! - [`timeseries`]: the [`TimeSeries`] facade and its builder.
//! - [`helpers`]: timestamp normalization, cell conversion, argument
//!   validation and calendar-column stripping.
//! - `engine` (feature `datafusion`): the shared DataFusion session, the
//!   blocking runtime and the distributed capability flag.
//!
//! Everything is synchronous; DataFusion futures are driven to completion on
//! an internal runtime, so the API must not be called from inside an async
//! task.
#![deny(missing_docs)]
pub mod backend;
pub mod cache;
#[cfg(feature = "datafusion")]
pub mod engine;
pub mod error;
pub mod helpers;
pub mod model;
pub mod series;
pub mod timeseries;

#[cfg(test)]
pub(crate) mod test_util;

pub use error::{ErrorKind, SeriesError, SeriesResult};
pub use model::{
    CellValue, CollectionAttribute, GroupKey, IdValue, KeyColumns, ProducerId, SeriesAttribute,
    SeriesAttributeValue, ValueSequence,
};
pub use series::SingleSeries;
pub use timeseries::{
    ExplicitSeries, RESERVED_KEY_COLUMN, TIMESTAMP_COLUMN, TableData, TimeSeries, TimeSeriesBuilder,
};

#[cfg(feature = "datafusion")]
pub use engine::{DistributedConfig, DistributedTable};
