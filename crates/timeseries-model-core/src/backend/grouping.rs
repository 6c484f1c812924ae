//! Group-by iteration for the distributed engine.
//!
//! DataFusion has no "iterate over groups" primitive, so it is emulated:
//!
//! 1. project the key columns, deduplicate and collect the distinct key
//!    tuples locally (the set of groups must be known up front),
//! 2. for every distinct tuple, filter the source table with an equality
//!    conjunction over all key columns.
//!
//! Predicates are built as DataFusion expressions with quoted identifiers and
//! typed literals, never as SQL text, so key-column names and key values may
//! contain any character.
//!
//! Distinct keys are sorted before iteration, but callers must not rely on
//! group order.

use arrow::datatypes::DataType;
use datafusion::functions_window::expr_fn::row_number;
use datafusion::logical_expr::ExprFunctionExt;
use datafusion::prelude::{Expr, cast, ident, lit};
use log::trace;
use snafu::ResultExt;

use crate::engine::DistributedTable;
use crate::error::{DataFusionSnafu, SeriesResult};
use crate::model::{GroupKey, IdValue};

/// Lazy sequence of `(key, sub_table)` pairs produced by [`group_by`].
///
/// Finite and not resumable: call [`group_by`] again to restart.
#[derive(Debug)]
pub struct Groups {
    table: DistributedTable,
    key_columns: Vec<String>,
    keys: std::vec::IntoIter<Vec<IdValue>>,
}

impl Groups {
    /// Number of groups not yet yielded.
    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl Iterator for Groups {
    type Item = SeriesResult<(GroupKey, DistributedTable)>;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.keys.next()?;
        let predicate = key_predicate(&self.key_columns, &key);
        trace!("emitting group {key:?}");

        let sub = self.table.derive(|f| f.filter(predicate));
        Some(sub.map(|sub| (GroupKey::from_values(key), sub)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.keys.size_hint()
    }
}

/// Partition `table` by `key_columns`.
///
/// The distinct keys are collected eagerly; the sub-tables are lazy filters
/// of `table`. Rows with a null in any key column belong to no group.
pub fn group_by(table: &DistributedTable, key_columns: &[String]) -> SeriesResult<Groups> {
    let names: Vec<&str> = key_columns.iter().map(String::as_str).collect();
    let distinct = table
        .derive(|f| f.select_columns(&names)?.distinct())?
        .collect()?;

    let mut keys = Vec::with_capacity(distinct.num_rows());
    'rows: for row in 0..distinct.num_rows() {
        let mut key = Vec::with_capacity(key_columns.len());
        for (i, name) in key_columns.iter().enumerate() {
            match IdValue::from_array(distinct.column(i).as_ref(), row, name)? {
                Some(v) => key.push(v),
                None => continue 'rows,
            }
        }
        keys.push(key);
    }
    keys.sort();

    Ok(Groups {
        table: table.clone(),
        key_columns: key_columns.to_vec(),
        keys: keys.into_iter(),
    })
}

fn id_literal(value: &IdValue) -> Expr {
    match value {
        IdValue::Int(v) => lit(*v),
        IdValue::UInt(v) => lit(*v),
        IdValue::Str(v) => lit(v.clone()),
        IdValue::Bool(v) => lit(*v),
    }
}

/// Equality conjunction matching the rows whose key tuple equals `key`.
pub(crate) fn key_predicate(key_columns: &[String], key: &[IdValue]) -> Expr {
    key_columns
        .iter()
        .zip(key)
        .map(|(name, value)| ident(name).eq(id_literal(value)))
        .reduce(Expr::and)
        .unwrap_or_else(|| lit(true))
}

/// Append `name` holding each row's 0-based rank within its key group.
///
/// With no key columns the whole table is one group. Rank order inside a
/// group follows the engine's scan order.
pub fn append_group_positions(
    table: &DistributedTable,
    key_columns: &[String],
    name: &str,
) -> SeriesResult<DistributedTable> {
    let partition: Vec<Expr> = key_columns.iter().map(ident).collect();
    let rank = row_number()
        .partition_by(partition)
        .build()
        .context(DataFusionSnafu)?;
    let position = cast(rank, DataType::Int64) - lit(1_i64);
    table.derive(|f| f.with_column(name, position))
}
