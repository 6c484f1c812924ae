//! Backends over an in-memory Arrow `RecordBatch`.
//!
//! Grouping is native: every row's key tuple is read once, rows are bucketed
//! by key (groups come out sorted by key, rows keep their table order inside
//! a group), and each group becomes its own batch via `take`.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arrow::array::{Array, Int64Array, RecordBatch, UInt32Array};
use arrow::compute::take_record_batch;
use snafu::{OptionExt, ResultExt};

use crate::backend::{
    CollectionAttributeValue, CollectionLayout, CollectionOptions, ColumnAccessor,
    LocalCollectionTable, LocalSeriesTable, MultiTimeSeriesBackend, SeriesLayout, SeriesOptions,
    TimeSeriesBackend,
};
use crate::error::{ArrowSnafu, SeriesResult, UnknownColumnSnafu};
use crate::model::{
    CollectionAttribute, GroupKey, IdValue, SeriesAttribute, SeriesAttributeValue,
};
use crate::series::SingleSeries;

/// One series stored in a local table.
#[derive(Debug, Clone)]
pub struct LocalSeriesBackend {
    batch: RecordBatch,
    layout: SeriesLayout,
}

impl LocalSeriesBackend {
    /// Validate `options` against `batch` and wrap it.
    pub fn try_new(batch: RecordBatch, options: &SeriesOptions) -> SeriesResult<Self> {
        let layout = SeriesLayout::try_new(batch.schema().as_ref(), options)?;
        Ok(Self { batch, layout })
    }

    pub(crate) fn from_layout(batch: RecordBatch, layout: SeriesLayout) -> Self {
        Self { batch, layout }
    }

    /// The underlying table.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Resolve `attr` with this backend's layout, reading from `source`
    /// instead of the stored table.
    pub fn attribute_from(
        &self,
        attr: SeriesAttribute,
        source: &dyn ColumnAccessor,
    ) -> SeriesResult<SeriesAttributeValue> {
        self.layout.resolve(attr, source)
    }
}

impl TimeSeriesBackend for LocalSeriesBackend {
    fn layout(&self) -> &SeriesLayout {
        &self.layout
    }

    fn attribute(&self, attr: SeriesAttribute) -> SeriesResult<SeriesAttributeValue> {
        self.attribute_from(attr, &self.batch)
    }

    fn to_local_table(&self) -> SeriesResult<LocalSeriesTable> {
        Ok(LocalSeriesTable {
            batch: self.batch.clone(),
            timestamp_column: self.layout.timestamp_column.clone(),
            value_columns: self.layout.value_columns.clone(),
        })
    }
}

/// A keyed collection stored in a local table.
#[derive(Debug, Clone)]
pub struct LocalCollectionBackend {
    batch: RecordBatch,
    layout: CollectionLayout,
}

impl LocalCollectionBackend {
    /// Validate `options` against `batch` and wrap it.
    pub fn try_new(batch: RecordBatch, options: &CollectionOptions) -> SeriesResult<Self> {
        let layout = CollectionLayout::try_new(batch.schema().as_ref(), options)?;
        Ok(Self { batch, layout })
    }

    /// The underlying table.
    pub fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Rows of the series this collection is restricted to by its `ids`
    /// option, or every row when there is no restriction.
    pub fn selected_batch(&self) -> SeriesResult<RecordBatch> {
        let Some(wanted) = self.layout.ids.as_deref() else {
            return Ok(self.batch.clone());
        };

        let columns = key_arrays(&self.batch, &self.layout.key_columns)?;
        let mut rows = Vec::new();
        for row in 0..self.batch.num_rows() {
            if row_key(&columns, row)?.as_deref() == Some(wanted) {
                rows.push(row as u32);
            }
        }
        take_record_batch(&self.batch, &UInt32Array::from(rows)).context(ArrowSnafu)
    }

    fn partition(&self) -> SeriesResult<Vec<SingleSeries>> {
        if self.layout.key_columns.is_empty() {
            let backend =
                LocalSeriesBackend::from_layout(self.batch.clone(), self.layout.series_layout(vec![]));
            return Ok(vec![SingleSeries::from_backend(backend)]);
        }

        let mut series = Vec::new();
        for (key, rows) in group_rows(&self.batch, &self.layout.key_columns)? {
            let ids = key.into_ids();
            if !self.layout.selects(&ids) {
                continue;
            }
            let indices = UInt32Array::from(rows);
            let sub = take_record_batch(&self.batch, &indices).context(ArrowSnafu)?;
            let backend = LocalSeriesBackend::from_layout(sub, self.layout.series_layout(ids));
            series.push(SingleSeries::from_backend(backend));
        }
        Ok(series)
    }
}

impl MultiTimeSeriesBackend for LocalCollectionBackend {
    fn layout(&self) -> &CollectionLayout {
        &self.layout
    }

    fn attribute(&self, attr: CollectionAttribute) -> SeriesResult<CollectionAttributeValue> {
        let value = match attr {
            CollectionAttribute::Timeseries => {
                CollectionAttributeValue::Timeseries(self.partition()?)
            }
            CollectionAttribute::IdLabels => {
                CollectionAttributeValue::IdLabels(self.layout.key_columns.clone())
            }
            CollectionAttribute::ProducerId => {
                CollectionAttributeValue::ProducerId(self.layout.producer_id.clone())
            }
        };
        Ok(value)
    }

    fn to_local_table(&self) -> SeriesResult<LocalCollectionTable> {
        Ok(LocalCollectionTable {
            batch: self.selected_batch()?,
            key_columns: self.layout.key_columns.clone(),
            timestamp_column: self.layout.timestamp_column.clone(),
            value_columns: self.layout.value_columns.clone(),
        })
    }

    fn row_count(&self) -> SeriesResult<usize> {
        match self.layout.ids {
            None => Ok(self.batch.num_rows()),
            Some(_) => Ok(self.selected_batch()?.num_rows()),
        }
    }
}

/// Read the key tuple of `row`, or `None` if any key is null.
fn row_key(
    columns: &[(&str, &Arc<dyn Array>)],
    row: usize,
) -> SeriesResult<Option<Vec<IdValue>>> {
    let mut key = Vec::with_capacity(columns.len());
    for &(name, array) in columns {
        match IdValue::from_array(&**array, row, name)? {
            Some(v) => key.push(v),
            None => return Ok(None),
        }
    }
    Ok(Some(key))
}

fn key_arrays<'a>(
    batch: &'a RecordBatch,
    key_columns: &'a [String],
) -> SeriesResult<Vec<(&'a str, &'a Arc<dyn Array>)>> {
    key_columns
        .iter()
        .map(|name| {
            batch
                .column_by_name(name)
                .map(|array| (name.as_str(), array))
                .context(UnknownColumnSnafu {
                    column: name,
                    role: "key",
                })
        })
        .collect()
}

/// Bucket the rows of `batch` by key, sorted by key.
///
/// Rows with a null in any key column belong to no group.
pub fn group_rows(
    batch: &RecordBatch,
    key_columns: &[String],
) -> SeriesResult<Vec<(GroupKey, Vec<u32>)>> {
    let columns = key_arrays(batch, key_columns)?;
    let mut groups: BTreeMap<Vec<IdValue>, Vec<u32>> = BTreeMap::new();

    for row in 0..batch.num_rows() {
        if let Some(key) = row_key(&columns, row)? {
            groups.entry(key).or_default().push(row as u32);
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, rows)| (GroupKey::from_values(key), rows))
        .collect())
}

/// 0-based position of every row within its key group, in table order.
///
/// Rows with a null key get a null position.
pub fn group_positions(batch: &RecordBatch, key_columns: &[String]) -> SeriesResult<Int64Array> {
    let columns = key_arrays(batch, key_columns)?;
    let mut counters: HashMap<Vec<IdValue>, i64> = HashMap::new();
    let mut positions = Vec::with_capacity(batch.num_rows());

    for row in 0..batch.num_rows() {
        let position = row_key(&columns, row)?.map(|key| {
            let counter = counters.entry(key).or_insert(0);
            let position = *counter;
            *counter += 1;
            position
        });
        positions.push(position);
    }

    Ok(Int64Array::from(positions))
}
