//! The [`TimeSeries`] facade.
//!
//! A `TimeSeries` owns either an explicit list of [`SingleSeries`] or a
//! deferred multi-series backend over one physical table. The backend
//! variant is picked once, from the [`TableData`] variant handed to the
//! builder:
//!
//! | source                         | storage                         |
//! |--------------------------------|---------------------------------|
//! | `TableData::Local`             | deferred, local backend         |
//! | `TableData::Distributed`       | deferred, distributed backend   |
//! | one explicit `SingleSeries`    | list, no key labels             |
//! | several explicit series        | list, key labels required       |
//! | nothing                        | `MissingDataArgument`           |
//!
//! The first operation that needs the per-key series promotes a deferred
//! backend into the list form once and memoizes it. Exports reuse a memoized
//! local backend so repeated exports do not rebuild the table.
//!
//! ```ignore
//! let ts = TimeSeries::builder()
//!     .data(batch)
//!     .key_column("id")
//!     .timestamp_column("ts")
//!     .build()?;
//! assert_eq!(ts.timeseries()?.len(), 2);
//! let flat = ts.as_local_table(Some(true), Some(false))?;
//! ```

use std::sync::{Arc, OnceLock};

use arrow::array::{Int32Array, RecordBatch};
use arrow::compute::concat_batches;
use arrow::util::pretty::pretty_format_batches;
use log::debug;
use snafu::prelude::*;

use crate::backend::local::group_positions;
use crate::backend::{
    CollectionAttributeValue, CollectionBackend, CollectionOptions, LocalCollectionBackend,
    MultiTimeSeriesBackend,
};
use crate::error::{
    ArrowSnafu, IdLengthMismatchSnafu, InvalidArgumentSnafu, MissingDataArgumentSnafu,
    SeriesError, SeriesResult,
};
use crate::helpers::reshape::{append_column, drop_columns};
use crate::helpers::validation::ensure_unclaimed;
use crate::model::{CollectionAttribute, IdValue, KeyColumns, ProducerId};
use crate::series::SingleSeries;

#[cfg(feature = "datafusion")]
use datafusion::prelude::lit;

#[cfg(feature = "datafusion")]
use crate::{
    backend::{DistributedCollectionBackend, grouping::append_group_positions},
    engine::{DistributedTable, from_local, require_distributed},
    helpers::periodic::strip_periodic,
};

/// Constant grouping column added when an ungrouped series is exported as a
/// grouped table.
pub const RESERVED_KEY_COLUMN: &str = "__ts_reserved_key";

/// Name of the synthesized timestamp column.
pub const TIMESTAMP_COLUMN: &str = "timestamp";

/// A physical table of one of the supported engines.
#[derive(Debug, Clone)]
pub enum TableData {
    /// Eager in-memory Arrow table.
    Local(RecordBatch),
    /// Lazy DataFusion table.
    #[cfg(feature = "datafusion")]
    Distributed(DistributedTable),
}

impl From<RecordBatch> for TableData {
    fn from(batch: RecordBatch) -> Self {
        TableData::Local(batch)
    }
}

#[cfg(feature = "datafusion")]
impl From<DistributedTable> for TableData {
    fn from(table: DistributedTable) -> Self {
        TableData::Distributed(table)
    }
}

/// Already-built series handed to [`TimeSeriesBuilder::timeseries`].
#[derive(Debug, Clone)]
pub enum ExplicitSeries {
    /// One ungrouped series.
    One(SingleSeries),
    /// Several series; key labels must be supplied alongside.
    Many(Vec<SingleSeries>),
}

impl From<SingleSeries> for ExplicitSeries {
    fn from(series: SingleSeries) -> Self {
        ExplicitSeries::One(series)
    }
}

impl From<Vec<SingleSeries>> for ExplicitSeries {
    fn from(series: Vec<SingleSeries>) -> Self {
        ExplicitSeries::Many(series)
    }
}

#[derive(Debug, Clone)]
enum Source {
    Table(TableData),
    Series(ExplicitSeries),
}

/// Builder for [`TimeSeries`].
///
/// Exactly one data source is used: the last of [`TimeSeriesBuilder::data`]
/// and [`TimeSeriesBuilder::timeseries`] to be called.
#[derive(Debug, Clone, Default)]
pub struct TimeSeriesBuilder {
    source: Option<Source>,
    key_columns: Option<KeyColumns>,
    timestamp_column: Option<String>,
    value_columns: Option<Vec<String>>,
    ids: Option<Vec<IdValue>>,
    producer_id: Option<ProducerId>,
}

impl TimeSeriesBuilder {
    /// Use a physical table as the data source.
    pub fn data(mut self, data: impl Into<TableData>) -> Self {
        self.source = Some(Source::Table(data.into()));
        self
    }

    /// Use already-built series as the data source.
    pub fn timeseries(mut self, series: impl Into<ExplicitSeries>) -> Self {
        self.source = Some(Source::Series(series.into()));
        self
    }

    /// Key column(s); one name or an ordered list.
    pub fn key_column(mut self, keys: impl Into<KeyColumns>) -> Self {
        self.key_columns = Some(keys.into());
        self
    }

    /// Timestamp column.
    pub fn timestamp_column(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column = Some(name.into());
        self
    }

    /// Value columns.
    pub fn value_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_columns = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Restrict a table-backed collection to the series with this id-tuple.
    pub fn ids<I, V>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IdValue>,
    {
        self.ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    /// Provenance tag.
    pub fn producer_id(mut self, producer_id: impl Into<ProducerId>) -> Self {
        self.producer_id = Some(producer_id.into());
        self
    }

    /// Validate the arguments and build the time series.
    pub fn build(self) -> SeriesResult<TimeSeries> {
        match self.source {
            None => MissingDataArgumentSnafu.fail(),
            Some(Source::Series(ExplicitSeries::One(series))) => {
                TimeSeries::from_series(vec![series], KeyColumns::none(), self.producer_id)
            }
            Some(Source::Series(ExplicitSeries::Many(series))) => {
                let labels = self.key_columns.context(InvalidArgumentSnafu {
                    message: "a list of series needs key labels",
                })?;
                TimeSeries::from_series(series, labels, self.producer_id)
            }
            Some(Source::Table(data)) => {
                let options = CollectionOptions {
                    key_columns: self.key_columns.unwrap_or_default(),
                    timestamp_column: self.timestamp_column,
                    value_columns: self.value_columns,
                    ids: self.ids,
                    producer_id: self.producer_id,
                };
                TimeSeries::try_new(data, &options)
            }
        }
    }
}

/// The list form: every series with its key labels.
#[derive(Debug, Clone)]
struct SeriesList {
    timeseries: Vec<SingleSeries>,
    id_labels: Vec<String>,
    producer_id: Option<ProducerId>,
}

#[derive(Debug, Clone)]
enum Storage {
    List(SeriesList),
    Deferred(CollectionBackend),
}

/// A single series or a keyed collection of series, backed by either engine.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    storage: Storage,
    promoted: OnceLock<SeriesList>,
    local: OnceLock<LocalCollectionBackend>,
}

impl TimeSeries {
    /// Start building a time series.
    pub fn builder() -> TimeSeriesBuilder {
        TimeSeriesBuilder::default()
    }

    /// Wrap a physical table, dispatching on its engine.
    pub fn try_new(data: impl Into<TableData>, options: &CollectionOptions) -> SeriesResult<Self> {
        let backend: CollectionBackend = match data.into() {
            TableData::Local(batch) => LocalCollectionBackend::try_new(batch, options)?.into(),
            #[cfg(feature = "datafusion")]
            TableData::Distributed(table) => {
                require_distributed("building a time series from a distributed table")?;
                DistributedCollectionBackend::try_new(table, options)?.into()
            }
        };
        Ok(Self::with_storage(Storage::Deferred(backend)))
    }

    /// Wrap explicit series.
    ///
    /// Every series must carry one id per key label. Without key labels the
    /// result is the ungrouped shape and needs at least one series.
    pub fn from_series(
        timeseries: Vec<SingleSeries>,
        id_labels: impl Into<KeyColumns>,
        producer_id: Option<ProducerId>,
    ) -> SeriesResult<Self> {
        let id_labels = id_labels.into().into_vec();
        ensure!(
            !(id_labels.is_empty() && timeseries.is_empty()),
            InvalidArgumentSnafu {
                message: "an ungrouped time series needs one series",
            }
        );
        for series in &timeseries {
            let ids = series.ids()?;
            ensure!(
                ids.len() == id_labels.len(),
                IdLengthMismatchSnafu {
                    expected: id_labels.len(),
                    actual: ids.len(),
                }
            );
        }

        Ok(Self::with_storage(Storage::List(SeriesList {
            timeseries,
            id_labels,
            producer_id,
        })))
    }

    fn with_storage(storage: Storage) -> Self {
        Self {
            storage,
            promoted: OnceLock::new(),
            local: OnceLock::new(),
        }
    }

    /// Whether the per-key series have been materialized.
    pub fn is_materialized(&self) -> bool {
        matches!(self.storage, Storage::List(_)) || self.promoted.get().is_some()
    }

    fn list(&self) -> SeriesResult<&SeriesList> {
        let backend = match &self.storage {
            Storage::List(list) => return Ok(list),
            Storage::Deferred(backend) => backend,
        };
        if let Some(list) = self.promoted.get() {
            return Ok(list);
        }

        debug!("promoting deferred backend to explicit series");
        let timeseries = match backend.attribute(CollectionAttribute::Timeseries)? {
            CollectionAttributeValue::Timeseries(series) => series,
            other => {
                return InvalidArgumentSnafu {
                    message: format!("backend answered timeseries with {other:?}"),
                }
                .fail();
            }
        };
        let layout = backend.layout();
        let list = SeriesList {
            timeseries,
            id_labels: layout.key_columns().to_vec(),
            producer_id: layout.producer_id().cloned(),
        };
        Ok(self.promoted.get_or_init(|| list))
    }

    /// The series, one per distinct key.
    pub fn timeseries(&self) -> SeriesResult<&[SingleSeries]> {
        Ok(&self.list()?.timeseries)
    }

    /// Key labels in order; empty for the ungrouped shape.
    pub fn id_labels(&self) -> &[String] {
        match &self.storage {
            Storage::List(list) => &list.id_labels,
            Storage::Deferred(backend) => backend.layout().key_columns(),
        }
    }

    /// Provenance tag.
    pub fn producer_id(&self) -> Option<&ProducerId> {
        match &self.storage {
            Storage::List(list) => list.producer_id.as_ref(),
            Storage::Deferred(backend) => backend.layout().producer_id(),
        }
    }

    /// Whether this is the grouped shape.
    pub fn is_multi(&self) -> bool {
        !self.id_labels().is_empty()
    }

    /// Resolve an attribute (`timeseries`, `id_labels`, `producer_id`) by name.
    pub fn get_attribute(&self, name: &str) -> SeriesResult<CollectionAttributeValue> {
        let value = match name.parse::<CollectionAttribute>()? {
            CollectionAttribute::Timeseries => {
                CollectionAttributeValue::Timeseries(self.timeseries()?.to_vec())
            }
            CollectionAttribute::IdLabels => {
                CollectionAttributeValue::IdLabels(self.id_labels().to_vec())
            }
            CollectionAttribute::ProducerId => {
                CollectionAttributeValue::ProducerId(self.producer_id().cloned())
            }
        };
        Ok(value)
    }

    /// Total number of rows across every series.
    pub fn len(&self) -> SeriesResult<usize> {
        match &self.storage {
            Storage::Deferred(backend) => backend.row_count(),
            Storage::List(_) => self.local_backend()?.row_count(),
        }
    }

    /// Whether there are no rows.
    pub fn is_empty(&self) -> SeriesResult<bool> {
        Ok(self.len()? == 0)
    }

    fn first_series(&self) -> SeriesResult<&SingleSeries> {
        self.timeseries()?
            .first()
            .context(InvalidArgumentSnafu {
                message: "time series has no series",
            })
    }

    /// The whole collection as a local backend, built once.
    fn local_backend(&self) -> SeriesResult<&LocalCollectionBackend> {
        if let Storage::Deferred(CollectionBackend::Local(backend)) = &self.storage {
            debug!("using backend local conversion");
            return Ok(backend);
        }
        if let Some(backend) = self.local.get() {
            return Ok(backend);
        }

        let backend = match &self.storage {
            Storage::Deferred(backend) => {
                debug!("materializing deferred backend");
                let table = backend.to_local_table()?;
                LocalCollectionBackend::try_new(
                    table.batch,
                    &CollectionOptions {
                        key_columns: table.key_columns.into(),
                        timestamp_column: table.timestamp_column,
                        value_columns: Some(table.value_columns),
                        ids: None,
                        producer_id: backend.layout().producer_id().cloned(),
                    },
                )?
            }
            Storage::List(list) => {
                debug!("concatenating {} series", list.timeseries.len());
                concat_series(list)?
            }
        };
        Ok(self.local.get_or_init(|| backend))
    }

    fn timestamp_column(&self) -> Option<&str> {
        match &self.storage {
            Storage::Deferred(backend) => backend.layout().timestamp_column(),
            Storage::List(list) => list.timeseries.first().and_then(|s| s.timestamp_label()),
        }
    }

    /// Export as a local table.
    ///
    /// `is_multi` reshapes between the grouped and ungrouped forms:
    /// - ungrouped, `Some(true)`: append [`RESERVED_KEY_COLUMN`] holding `0`,
    /// - grouped, `Some(false)`: drop the key columns,
    /// - otherwise the shape is kept.
    ///
    /// `include_timestamps`:
    /// - `Some(true)` without a timestamp column appends [`TIMESTAMP_COLUMN`]
    ///   holding each row's 0-based position within its group,
    /// - `Some(false)` drops the timestamp column,
    /// - `None` keeps whatever is there.
    ///
    /// Only the series selected by the `ids` option are exported. A
    /// synthesized column whose name is already taken by the table fails with
    /// [`SeriesError::ColumnRoleConflict`].
    pub fn as_local_table(
        &self,
        include_timestamps: Option<bool>,
        is_multi: Option<bool>,
    ) -> SeriesResult<RecordBatch> {
        if !self.is_multi() {
            let batch = self.first_series()?.as_local_table(include_timestamps)?;
            if is_multi == Some(true) {
                ensure_unclaimed(batch.schema().as_ref(), RESERVED_KEY_COLUMN, "key")?;
                let reserved = Int32Array::from(vec![0; batch.num_rows()]);
                return append_column(&batch, RESERVED_KEY_COLUMN, Arc::new(reserved));
            }
            return Ok(batch);
        }

        let table = self.local_backend()?.to_local_table()?;
        let mut batch = table.batch;

        match (include_timestamps, table.timestamp_column.as_deref()) {
            (Some(true), None) => {
                ensure_unclaimed(batch.schema().as_ref(), TIMESTAMP_COLUMN, "timestamp")?;
                let positions = group_positions(&batch, &table.key_columns)?;
                batch = append_column(&batch, TIMESTAMP_COLUMN, Arc::new(positions))?;
            }
            (Some(false), Some(ts)) => batch = drop_columns(&batch, &[ts])?,
            _ => {}
        }

        if is_multi == Some(false) {
            let keys: Vec<&str> = table.key_columns.iter().map(String::as_str).collect();
            batch = drop_columns(&batch, &keys)?;
        }
        Ok(batch)
    }

    /// Export as a distributed table, with the reshaping rules of
    /// [`TimeSeries::as_local_table`].
    ///
    /// A distributed backend is reshaped lazily (group positions come from a
    /// `row_number` window partitioned by the key columns); anything else is
    /// exported locally and registered with the shared session.
    #[cfg(feature = "datafusion")]
    pub fn as_distributed_table(
        &self,
        include_timestamps: Option<bool>,
        is_multi: Option<bool>,
    ) -> SeriesResult<DistributedTable> {
        require_distributed("exporting a distributed table")?;

        if !self.is_multi() {
            let table = self.first_series()?.as_distributed_table(include_timestamps)?;
            if is_multi == Some(true) {
                ensure_unclaimed(&table.schema(), RESERVED_KEY_COLUMN, "key")?;
                return table.derive(|f| f.with_column(RESERVED_KEY_COLUMN, lit(0_i32)));
            }
            return Ok(table);
        }

        if let Storage::Deferred(CollectionBackend::Distributed(backend)) = &self.storage {
            debug!("using backend distributed conversion");
            let layout = backend.layout();
            let mut table = backend.selected_table()?;

            match (include_timestamps, layout.timestamp_column()) {
                (Some(true), None) => {
                    ensure_unclaimed(&table.schema(), TIMESTAMP_COLUMN, "timestamp")?;
                    table = append_group_positions(&table, layout.key_columns(), TIMESTAMP_COLUMN)?;
                }
                (Some(false), Some(ts)) => table = table.drop_columns(&[ts])?,
                _ => {}
            }

            if is_multi == Some(false) {
                let keys: Vec<&str> = layout.key_columns().iter().map(String::as_str).collect();
                table = table.drop_columns(&keys)?;
            }
            return Ok(table);
        }

        let batch = self.as_local_table(include_timestamps, is_multi)?;
        let ts = match include_timestamps {
            Some(false) => None,
            _ => self.timestamp_column(),
        };
        from_local(strip_periodic(&batch, ts)?)
    }

    /// Render the local export as a text table.
    pub fn to_pretty_string(&self) -> SeriesResult<String> {
        let batch = self.as_local_table(None, None)?;
        let rendered = pretty_format_batches(&[batch]).context(ArrowSnafu)?;
        Ok(rendered.to_string())
    }
}

/// Stack the series of `list` into one table, adding one constant column per
/// key label.
fn concat_series(list: &SeriesList) -> SeriesResult<LocalCollectionBackend> {
    let first = list.timeseries.first().context(InvalidArgumentSnafu {
        message: "cannot build a table without any series",
    })?;
    let timestamp_column = first.timestamp_label().map(str::to_string);
    let value_columns = first.value_labels().to_vec();

    let mut batches = Vec::with_capacity(list.timeseries.len());
    for series in &list.timeseries {
        let mut batch = series.as_local_table(None)?;
        let ids = series.ids()?;
        ensure!(
            ids.len() == list.id_labels.len(),
            IdLengthMismatchSnafu {
                expected: list.id_labels.len(),
                actual: ids.len(),
            }
        );
        for (label, id) in list.id_labels.iter().zip(&ids) {
            batch = append_column(&batch, label, id.repeat(batch.num_rows()))?;
        }
        batches.push(batch);
    }

    let schema = batches[0].schema();
    let batch = concat_batches(&schema, &batches).context(ArrowSnafu)?;

    LocalCollectionBackend::try_new(
        batch,
        &CollectionOptions {
            key_columns: list.id_labels.clone().into(),
            timestamp_column,
            value_columns: Some(value_columns),
            ids: None,
            producer_id: list.producer_id.clone(),
        },
    )
}

impl TryFrom<SingleSeries> for TimeSeries {
    type Error = SeriesError;

    fn try_from(series: SingleSeries) -> Result<Self, Self::Error> {
        TimeSeries::builder().timeseries(series).build()
    }
}
