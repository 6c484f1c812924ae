//! Wrapper prelude.
//!
//! The `timeseries-model` crate is the supported public entry point.
//! Downstream code should prefer importing from this prelude instead of
//! depending on internal core module paths.

pub use crate::backend;
pub use crate::{
    CellValue, ErrorKind, IdValue, KeyColumns, ProducerId, SeriesError, SeriesResult,
    SingleSeries, TableData, TimeSeries, ValueSequence,
};

#[cfg(feature = "datafusion")]
pub use crate::distributed::{DistributedConfig, DistributedTable};
