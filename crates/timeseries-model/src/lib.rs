//! # timeseries-model
//!
//! Time-series data model over interchangeable table engines.
//!
//! This crate is the supported public entry point and provides a small, stable surface.
//!
//! ## Features
//!
//! - `datafusion` (default): Enables lazy, DataFusion-backed tables
//!
//! ## Example
//!
//! ```rust,ignore
//! use timeseries_model::prelude::*;
//!
//! let ts = TimeSeries::builder()
//!     .data(batch)
//!     .key_column("id")
//!     .timestamp_column("ts")
//!     .build()?;
//! for series in ts.timeseries()? {
//!     println!("{:?}: {:?}", series.ids()?, series.timestamps()?);
//! }
//! ```

/// Convenience prelude with the stable, supported surface.
pub mod prelude;

/// Backend namespace (wrapper-only).
pub mod backend {
    pub use timeseries_model_core::backend::{
        CollectionAttributeValue, CollectionBackend, CollectionOptions, LocalCollectionTable,
        LocalSeriesTable, MultiTimeSeriesBackend, SeriesBackend, SeriesOptions, TimeSeriesBackend,
    };
}

/// Distributed engine (enabled by default).
#[cfg(feature = "datafusion")]
pub mod distributed {
    pub use timeseries_model_core::engine::{
        DistributedConfig, DistributedTable, config, distributed_available, from_local, init,
    };
}

pub use timeseries_model_core::error::{ErrorKind, SeriesError, SeriesResult};
pub use timeseries_model_core::model::{
    CellValue, IdValue, KeyColumns, ProducerId, SeriesAttribute, SeriesAttributeValue,
    ValueSequence,
};
pub use timeseries_model_core::series::SingleSeries;
pub use timeseries_model_core::timeseries::{
    RESERVED_KEY_COLUMN, TIMESTAMP_COLUMN, TableData, TimeSeries, TimeSeriesBuilder,
};
