//! Closed sets of attribute names understood by the backends.
//!
//! Attribute reads go through `get_attribute(name)` on every backend so that
//! a series looks the same no matter which engine holds its rows. Names are
//! parsed with [`std::str::FromStr`]; anything outside the set is an
//! [`SeriesError::UnknownAttribute`].

use std::fmt;
use std::str::FromStr;

use crate::error::SeriesError;
use crate::model::{IdValue, ValueSequence};

/// Attributes of a single series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesAttribute {
    /// Timestamps normalized to seconds since the Unix epoch.
    Timestamps,
    /// One [`ValueSequence`] per value column.
    Values,
    /// Name of the timestamp column, if one was configured.
    TimestampLabel,
    /// Names of the value columns, in order.
    ValueLabels,
    /// The id-tuple of the series.
    Ids,
    /// Number of observations.
    Len,
}

impl SeriesAttribute {
    /// Every recognized attribute.
    pub const ALL: [SeriesAttribute; 6] = [
        SeriesAttribute::Timestamps,
        SeriesAttribute::Values,
        SeriesAttribute::TimestampLabel,
        SeriesAttribute::ValueLabels,
        SeriesAttribute::Ids,
        SeriesAttribute::Len,
    ];

    /// Canonical attribute name.
    pub fn name(&self) -> &'static str {
        match self {
            SeriesAttribute::Timestamps => "timestamps",
            SeriesAttribute::Values => "values",
            SeriesAttribute::TimestampLabel => "timestamp_label",
            SeriesAttribute::ValueLabels => "value_labels",
            SeriesAttribute::Ids => "ids",
            SeriesAttribute::Len => "len",
        }
    }
}

impl FromStr for SeriesAttribute {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SeriesAttribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| SeriesError::UnknownAttribute {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for SeriesAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Attributes of a multi-series collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionAttribute {
    /// The per-key series.
    Timeseries,
    /// Key-column names, in order.
    IdLabels,
    /// Producer identity, if any.
    ProducerId,
}

impl CollectionAttribute {
    /// Canonical attribute name.
    pub fn name(&self) -> &'static str {
        match self {
            CollectionAttribute::Timeseries => "timeseries",
            CollectionAttribute::IdLabels => "id_labels",
            CollectionAttribute::ProducerId => "producer_id",
        }
    }
}

impl FromStr for CollectionAttribute {
    type Err = SeriesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "timeseries" => Ok(CollectionAttribute::Timeseries),
            "id_labels" => Ok(CollectionAttribute::IdLabels),
            "producer_id" => Ok(CollectionAttribute::ProducerId),
            other => Err(SeriesError::UnknownAttribute {
                name: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for CollectionAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Value of a [`SeriesAttribute`].
#[derive(Debug, Clone, PartialEq)]
pub enum SeriesAttributeValue {
    /// Seconds since the Unix epoch (null slots are NaN).
    Timestamps(Vec<f64>),
    /// Value columns.
    Values(Vec<ValueSequence>),
    /// Timestamp column name.
    TimestampLabel(Option<String>),
    /// Value column names.
    ValueLabels(Vec<String>),
    /// Id-tuple.
    Ids(Vec<IdValue>),
    /// Row count.
    Len(usize),
}
