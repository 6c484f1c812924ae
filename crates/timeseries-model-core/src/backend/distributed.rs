//! Backends over a lazily evaluated DataFusion table.
//!
//! A distributed series does not re-implement attribute resolution: it holds
//! a local backend with the same layout over an empty projection of its
//! schema, and resolves attributes through that backend while reading
//! columns from the DataFusion table. Every read is wrapped in a
//! [`ScopedCache`] so the plan is executed once per call, not once per
//! column.

use arrow::array::RecordBatch;
use log::debug;

use crate::backend::grouping::{group_by, key_predicate};
use crate::backend::{
    CollectionAttributeValue, CollectionLayout, CollectionOptions, LocalCollectionTable,
    LocalSeriesBackend, LocalSeriesTable, MultiTimeSeriesBackend, SeriesLayout, SeriesOptions,
    TimeSeriesBackend,
};
use crate::cache::ScopedCache;
use crate::engine::{DistributedTable, require_distributed};
use crate::error::SeriesResult;
use crate::model::{CollectionAttribute, SeriesAttribute, SeriesAttributeValue};
use crate::series::SingleSeries;

/// One series stored in a distributed table.
#[derive(Debug, Clone)]
pub struct DistributedSeriesBackend {
    table: DistributedTable,
    helper: LocalSeriesBackend,
}

impl DistributedSeriesBackend {
    /// Validate `options` against the schema of `table` and wrap it.
    pub fn try_new(table: DistributedTable, options: &SeriesOptions) -> SeriesResult<Self> {
        require_distributed("wrapping a distributed table")?;
        let layout = SeriesLayout::try_new(&table.schema(), options)?;
        Ok(Self::from_layout(table, layout))
    }

    pub(crate) fn from_layout(table: DistributedTable, layout: SeriesLayout) -> Self {
        let empty = RecordBatch::new_empty(table.schema().into());
        Self {
            helper: LocalSeriesBackend::from_layout(empty, layout),
            table,
        }
    }

    /// The underlying table.
    pub fn table(&self) -> &DistributedTable {
        &self.table
    }
}

impl TimeSeriesBackend for DistributedSeriesBackend {
    fn layout(&self) -> &SeriesLayout {
        self.helper.layout()
    }

    fn attribute(&self, attr: SeriesAttribute) -> SeriesResult<SeriesAttributeValue> {
        let _cache = ScopedCache::acquire(&self.table);
        self.helper.attribute_from(attr, &self.table)
    }

    fn to_local_table(&self) -> SeriesResult<LocalSeriesTable> {
        let layout = self.helper.layout();
        Ok(LocalSeriesTable {
            batch: self.table.collect()?,
            timestamp_column: layout.timestamp_column.clone(),
            value_columns: layout.value_columns.clone(),
        })
    }
}

/// A keyed collection stored in a distributed table.
#[derive(Debug, Clone)]
pub struct DistributedCollectionBackend {
    table: DistributedTable,
    layout: CollectionLayout,
}

impl DistributedCollectionBackend {
    /// Validate `options` against the schema of `table` and wrap it.
    ///
    /// Validation only reads the schema, so it rejects exactly what the local
    /// backend rejects without executing the plan.
    pub fn try_new(table: DistributedTable, options: &CollectionOptions) -> SeriesResult<Self> {
        require_distributed("wrapping a distributed table")?;
        let layout = CollectionLayout::try_new(&table.schema(), options)?;
        Ok(Self { table, layout })
    }

    /// The underlying table.
    pub fn table(&self) -> &DistributedTable {
        &self.table
    }

    /// Lazy filter down to the series selected by the `ids` option, or the
    /// whole table when there is no restriction.
    pub fn selected_table(&self) -> SeriesResult<DistributedTable> {
        match &self.layout.ids {
            None => Ok(self.table.clone()),
            Some(ids) => {
                let predicate = key_predicate(&self.layout.key_columns, ids);
                self.table.derive(|f| f.filter(predicate))
            }
        }
    }

    fn partition(&self) -> SeriesResult<Vec<SingleSeries>> {
        let _cache = ScopedCache::acquire(&self.table);

        if self.layout.key_columns.is_empty() {
            let backend = DistributedSeriesBackend::from_layout(
                self.table.clone(),
                self.layout.series_layout(vec![]),
            );
            return Ok(vec![SingleSeries::from_backend(backend)]);
        }

        let groups = group_by(&self.table, &self.layout.key_columns)?;
        debug!("partitioning distributed table into {} groups", groups.remaining());

        let mut series = Vec::with_capacity(groups.remaining());
        for group in groups {
            let (key, sub) = group?;
            let ids = key.into_ids();
            if !self.layout.selects(&ids) {
                continue;
            }
            let backend = DistributedSeriesBackend::from_layout(sub, self.layout.series_layout(ids));
            series.push(SingleSeries::from_backend(backend));
        }
        Ok(series)
    }
}

impl MultiTimeSeriesBackend for DistributedCollectionBackend {
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
            batch: self.selected_table()?.collect()?,
            key_columns: self.layout.key_columns.clone(),
            timestamp_column: self.layout.timestamp_column.clone(),
            value_columns: self.layout.value_columns.clone(),
        })
    }

    fn row_count(&self) -> SeriesResult<usize> {
        self.selected_table()?.count()
    }
}
