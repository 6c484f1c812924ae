//! Plain data types shared by every backend.
//!
//! - [`identity`]: key values, id tuples, grouping keys and producer identity.
//! - [`values`]: row-level cells and per-column value sequences.
//! - [`attributes`]: the closed sets of attribute names and their values.

pub mod attributes;
pub mod identity;
pub mod values;

pub use attributes::{CollectionAttribute, SeriesAttribute, SeriesAttributeValue};
pub use identity::{GroupKey, IdValue, KeyColumns, ProducerId};
pub use values::{CellValue, ValueSequence};
