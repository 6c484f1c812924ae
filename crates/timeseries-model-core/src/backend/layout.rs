//! Column-role metadata and the attribute logic written once for all engines.
//!
//! A backend is a physical table plus a layout: which column holds the
//! timestamps, which hold values, and (for collections) which hold the keys.
//! [`SeriesLayout::resolve`] answers every series attribute through a
//! [`ColumnAccessor`], so the local and distributed backends share one
//! implementation and differ only in how they fetch columns.

use arrow::datatypes::Schema;

use crate::backend::ColumnAccessor;
use crate::error::SeriesResult;
use crate::helpers::{
    cells::column_cells,
    timestamps::{position_timestamps, timestamp_seconds},
    validation,
};
use crate::model::{
    IdValue, KeyColumns, ProducerId, SeriesAttribute, SeriesAttributeValue, ValueSequence,
};

/// Arguments describing one series inside a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesOptions {
    /// Column holding timestamps; `None` synthesizes 0-based positions.
    pub timestamp_column: Option<String>,
    /// Value columns; `None` means every column except the timestamp column.
    pub value_columns: Option<Vec<String>>,
    /// Id-tuple of the series.
    pub ids: Vec<IdValue>,
}

impl SeriesOptions {
    /// Set the timestamp column.
    pub fn timestamp_column(mut self, name: impl Into<String>) -> Self {
        self.timestamp_column = Some(name.into());
        self
    }

    /// Set the value columns.
    pub fn value_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.value_columns = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Set the id-tuple.
    pub fn ids<I, V>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<IdValue>,
    {
        self.ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Arguments describing a keyed collection of series inside a table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CollectionOptions {
    /// Key columns (empty for the ungrouped shape).
    pub key_columns: KeyColumns,
    /// Column holding timestamps; `None` synthesizes per-series positions.
    pub timestamp_column: Option<String>,
    /// Value columns; `None` means every column that is neither key nor timestamp.
    pub value_columns: Option<Vec<String>>,
    /// Restrict the collection to the series with this id-tuple.
    pub ids: Option<Vec<IdValue>>,
    /// Provenance tag.
    pub producer_id: Option<ProducerId>,
}

/// Validated column roles of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesLayout {
    pub(crate) timestamp_column: Option<String>,
    pub(crate) value_columns: Vec<String>,
    pub(crate) ids: Vec<IdValue>,
}

impl SeriesLayout {
    /// Validate `options` against `schema`.
    pub fn try_new(schema: &Schema, options: &SeriesOptions) -> SeriesResult<Self> {
        validation::validate_series(schema, options)
    }

    /// Timestamp column, if configured.
    pub fn timestamp_column(&self) -> Option<&str> {
        self.timestamp_column.as_deref()
    }

    /// Value columns in order.
    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    /// Id-tuple.
    pub fn ids(&self) -> &[IdValue] {
        &self.ids
    }

    /// Resolve `attr` reading columns through `source`.
    pub fn resolve(
        &self,
        attr: SeriesAttribute,
        source: &dyn ColumnAccessor,
    ) -> SeriesResult<SeriesAttributeValue> {
        let value = match attr {
            SeriesAttribute::Timestamps => {
                let timestamps = match &self.timestamp_column {
                    Some(column) => timestamp_seconds(source.column(column)?.as_ref(), column)?,
                    None => position_timestamps(source.row_count()?),
                };
                SeriesAttributeValue::Timestamps(timestamps)
            }
            SeriesAttribute::Values => {
                let mut sequences = Vec::with_capacity(self.value_columns.len());
                for label in &self.value_columns {
                    let array = source.column(label)?;
                    sequences.push(ValueSequence {
                        label: label.clone(),
                        values: column_cells(array.as_ref(), label)?,
                    });
                }
                SeriesAttributeValue::Values(sequences)
            }
            SeriesAttribute::TimestampLabel => {
                SeriesAttributeValue::TimestampLabel(self.timestamp_column.clone())
            }
            SeriesAttribute::ValueLabels => {
                SeriesAttributeValue::ValueLabels(self.value_columns.clone())
            }
            SeriesAttribute::Ids => SeriesAttributeValue::Ids(self.ids.clone()),
            SeriesAttribute::Len => SeriesAttributeValue::Len(source.row_count()?),
        };

        Ok(value)
    }
}

/// Validated column roles of a keyed collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionLayout {
    pub(crate) key_columns: Vec<String>,
    pub(crate) timestamp_column: Option<String>,
    pub(crate) value_columns: Vec<String>,
    pub(crate) ids: Option<Vec<IdValue>>,
    pub(crate) producer_id: Option<ProducerId>,
}

impl CollectionLayout {
    /// Validate `options` against `schema`.
    pub fn try_new(schema: &Schema, options: &CollectionOptions) -> SeriesResult<Self> {
        validation::validate_collection(schema, options)
    }

    /// Key columns in order.
    pub fn key_columns(&self) -> &[String] {
        &self.key_columns
    }

    /// Timestamp column, if configured.
    pub fn timestamp_column(&self) -> Option<&str> {
        self.timestamp_column.as_deref()
    }

    /// Value columns in order.
    pub fn value_columns(&self) -> &[String] {
        &self.value_columns
    }

    /// Producer identity.
    pub fn producer_id(&self) -> Option<&ProducerId> {
        self.producer_id.as_ref()
    }

    /// Layout of the series that carries `ids`.
    pub(crate) fn series_layout(&self, ids: Vec<IdValue>) -> SeriesLayout {
        SeriesLayout {
            timestamp_column: self.timestamp_column.clone(),
            value_columns: self.value_columns.clone(),
            ids,
        }
    }

    /// Whether a group with `ids` belongs to this collection.
    pub(crate) fn selects(&self, ids: &[IdValue]) -> bool {
        self.ids.as_deref().is_none_or(|wanted| wanted == ids)
    }
}
