//! The same scenarios as the local suite, with the rows held by DataFusion.
#![cfg(feature = "datafusion")]

mod common;

use arrow::array::AsArray;
use arrow::datatypes::{DataType, Int32Type, Int64Type, TimeUnit};
use common::*;
use arrow::record_batch::RecordBatch;
use timeseries_model_core::backend::{CollectionAttributeValue, SeriesBackend, SeriesOptions};
use timeseries_model_core::cache::{Pinnable, ScopedCache};
use timeseries_model_core::engine::{distributed_available, from_local};
use timeseries_model_core::{
    ErrorKind, IdValue, KeyColumns, RESERVED_KEY_COLUMN, SingleSeries, TIMESTAMP_COLUMN,
    TableData, TimeSeries,
};

// Positions depend on row order inside a group, which the engines do not
// promise to agree on; they are checked separately.
fn without_positions(batch: &RecordBatch) -> TestResult<RecordBatch> {
    let keep: Vec<usize> = (0..batch.num_columns())
        .filter(|&i| batch.schema().field(i).name() != TIMESTAMP_COLUMN)
        .collect();
    Ok(batch.project(&keep)?)
}

fn sorted(mut v: Vec<f64>) -> Vec<f64> {
    v.sort_by(f64::total_cmp);
    v
}

#[test]
fn engine_is_enabled_by_default() {
    assert!(distributed_available());
}

#[test]
fn partitions_match_the_local_engine() -> TestResult {
    for (batch, keys, ts) in [
        (id_ts_val()?, KeyColumns::from("id"), Some("ts")),
        (prices()?, KeyColumns::from(["symbol", "venue"]), Some("ts")),
        (id_val()?, KeyColumns::from("id"), None),
    ] {
        let build = |data: TableData| {
            let mut builder = TimeSeries::builder().data(data).key_column(keys.clone());
            if let Some(ts) = ts {
                builder = builder.timestamp_column(ts);
            }
            builder.build()
        };
        let local = build(batch.clone().into())?;
        let distributed = build(from_local(batch)?.into())?;

        let (l, d) = (local.timeseries()?, distributed.timeseries()?);
        assert_eq!(l.len(), d.len());
        for (l, d) in l.iter().zip(d) {
            assert_eq!(l.ids()?, d.ids()?);
            assert_eq!(l.len()?, d.len()?);
            assert_eq!(sorted(l.timestamps()?), sorted(d.timestamps()?));
            assert!(matches!(d.backend(), SeriesBackend::Distributed(_)));
        }
    }
    Ok(())
}

#[test]
fn grouped_series_keep_scalar_ids() -> TestResult {
    let ts = TimeSeries::builder()
        .data(from_local(id_ts_val()?)?)
        .key_column("id")
        .timestamp_column("ts")
        .build()?;
    let series = ts.timeseries()?;
    assert_eq!(series[0].ids()?, vec![IdValue::Int(1)]);
    assert_eq!(series[1].ids()?, vec![IdValue::Int(2)]);

    let mut first = int_values(&series[0], "val")?;
    first.sort();
    assert_eq!(first, vec![10, 11]);
    Ok(())
}

#[test]
fn distributed_round_trip_preserves_rows() -> TestResult {
    for (batch, keys) in [
        (id_ts_val()?, KeyColumns::from("id")),
        (prices()?, KeyColumns::from(["symbol", "venue"])),
        (val_only()?, KeyColumns::none()),
    ] {
        let is_multi = !keys.is_empty();
        let ts = TimeSeries::builder()
            .data(from_local(batch.clone())?)
            .key_column(keys)
            .build()?;
        let out = ts.as_distributed_table(None, Some(is_multi))?.collect()?;
        assert_eq!(sorted_rows(&out)?, sorted_rows(&batch)?);
    }
    Ok(())
}

#[test]
fn exports_agree_across_engines() -> TestResult {
    let local = TimeSeries::builder().data(id_val()?).key_column("id").build()?;
    let distributed = TimeSeries::builder()
        .data(from_local(id_val()?)?)
        .key_column("id")
        .build()?;

    for include_timestamps in [None, Some(true), Some(false)] {
        for is_multi in [None, Some(true), Some(false)] {
            let l = local.as_local_table(include_timestamps, is_multi)?;
            let from_local_backend = local.as_distributed_table(include_timestamps, is_multi)?;
            let from_distributed = distributed.as_distributed_table(include_timestamps, is_multi)?;
            let d = distributed.as_local_table(include_timestamps, is_multi)?;

            for other in [from_local_backend.collect()?, from_distributed.collect()?, d] {
                assert_eq!(column_names(&other), column_names(&l));
                assert_eq!(
                    sorted_rows(&without_positions(&other)?)?,
                    sorted_rows(&without_positions(&l)?)?
                );
            }
        }
    }
    Ok(())
}

#[test]
fn window_positions_restart_per_group() -> TestResult {
    let ts = TimeSeries::builder()
        .data(from_local(id_val()?)?)
        .key_column("id")
        .build()?;
    let out = ts.as_distributed_table(Some(true), None)?.collect()?;

    let ids = out.column_by_name("id").ok_or("id")?.as_primitive::<Int64Type>();
    let pos = out
        .column_by_name(TIMESTAMP_COLUMN)
        .ok_or("timestamp")?
        .as_primitive::<Int64Type>();
    let mut pairs: Vec<(i64, i64)> = ids
        .values()
        .iter()
        .copied()
        .zip(pos.values().iter().copied())
        .collect();
    pairs.sort();
    assert_eq!(pairs, vec![(1, 0), (1, 1), (2, 0)]);
    Ok(())
}

#[test]
fn ungrouped_export_gets_the_reserved_key() -> TestResult {
    let ts = TimeSeries::builder().data(from_local(val_only()?)?).build()?;
    let out = ts.as_distributed_table(None, Some(true))?.collect()?;
    assert_eq!(column_names(&out), vec!["val", RESERVED_KEY_COLUMN]);
    let reserved = out
        .column_by_name(RESERVED_KEY_COLUMN)
        .ok_or("reserved")?
        .as_primitive::<Int32Type>();
    assert!(reserved.iter().all(|v| v == Some(0)));
    Ok(())
}

#[test]
fn calendar_timestamps_become_instants() -> TestResult {
    let ts = TimeSeries::builder()
        .data(daily()?)
        .timestamp_column("day")
        .build()?;
    let table = ts.as_distributed_table(None, None)?;
    let schema = table.schema();
    assert_eq!(
        schema.field_with_name("day")?.data_type(),
        &DataType::Timestamp(TimeUnit::Millisecond, None)
    );

    let local = ts.as_local_table(None, None)?;
    assert_eq!(local.schema().field(0).data_type(), &DataType::Date32);
    Ok(())
}

#[test]
fn attribute_reads_leave_the_table_unpinned() -> TestResult {
    let table = from_local(id_ts_val()?)?;
    let ts = TimeSeries::builder()
        .data(table.clone())
        .key_column("id")
        .timestamp_column("ts")
        .build()?;

    for series in ts.timeseries()? {
        series.timestamps()?;
        series.values()?;
        let SeriesBackend::Distributed(backend) = series.backend() else {
            return Err("expected a distributed series".into());
        };
        assert!(!backend.table().is_pinned());
    }
    assert!(!table.is_pinned());

    let err = ts.timeseries()?[0]
        .get_attribute("nonexistent_name")
        .expect_err("unknown attribute");
    assert_eq!(err.kind(), ErrorKind::UnknownAttribute);
    assert!(!table.is_pinned());
    Ok(())
}

#[test]
fn outer_pin_survives_inner_reads() -> TestResult {
    let table = from_local(val_only()?)?;
    let series = SingleSeries::try_from_distributed(table.clone(), &SeriesOptions::default())?;

    let outer = ScopedCache::acquire(&table);
    assert!(outer.did_pin());
    series.values()?;
    series.timestamps()?;
    assert!(table.is_pinned());

    drop(outer);
    assert!(!table.is_pinned());
    Ok(())
}

#[test]
fn validation_errors_match_the_local_engine() -> TestResult {
    for keys in [
        KeyColumns::from("missing"),
        KeyColumns::from("price"),
        KeyColumns::from(["symbol", "symbol"]),
    ] {
        let local = TimeSeries::builder()
            .data(prices()?)
            .key_column(keys.clone())
            .build()
            .expect_err("invalid keys");
        let distributed = TimeSeries::builder()
            .data(from_local(prices()?)?)
            .key_column(keys)
            .build()
            .expect_err("invalid keys");
        assert_eq!(local.kind(), distributed.kind());
        assert_eq!(local.to_string(), distributed.to_string());
    }
    Ok(())
}

#[test]
fn deferred_row_count_does_not_partition() -> TestResult {
    let ts = TimeSeries::builder()
        .data(from_local(prices()?)?)
        .key_column("symbol")
        .build()?;
    assert_eq!(ts.len()?, 5);
    assert!(!ts.is_materialized());

    let labels = match ts.get_attribute("id_labels")? {
        CollectionAttributeValue::IdLabels(labels) => labels,
        _ => return Err("expected labels".into()),
    };
    assert_eq!(labels, vec!["symbol".to_string()]);
    assert!(!ts.is_materialized());
    Ok(())
}

#[test]
fn explicit_series_export_to_the_distributed_engine() -> TestResult {
    let source = TimeSeries::builder()
        .data(from_local(id_ts_val()?)?)
        .key_column("id")
        .timestamp_column("ts")
        .build()?;
    let rebuilt = TimeSeries::builder()
        .timeseries(source.timeseries()?.to_vec())
        .key_column("id")
        .build()?;

    let out = rebuilt.as_distributed_table(None, None)?.collect()?;
    assert_eq!(column_names(&out), vec!["ts", "val", "id"]);
    assert_eq!(out.num_rows(), 3);
    Ok(())
}

#[test]
fn ids_option_restricts_every_view() -> TestResult {
    let ts = TimeSeries::builder()
        .data(from_local(id_ts_val()?)?)
        .key_column("id")
        .timestamp_column("ts")
        .ids([1_i64])
        .build()?;

    assert_eq!(ts.len()?, 2);
    assert_eq!(ts.as_distributed_table(None, None)?.count()?, 2);
    assert_eq!(ts.as_distributed_table(Some(false), Some(false))?.count()?, 2);
    assert_eq!(ts.as_local_table(None, None)?.num_rows(), 2);

    let series = ts.timeseries()?;
    assert_eq!(series.len(), 1);
    assert_eq!(series[0].len()?, ts.len()?);
    Ok(())
}

#[test]
fn failed_read_leaves_the_table_unpinned() -> TestResult {
    let table = from_local(prices()?)?;
    let series = SingleSeries::try_from_distributed(
        table.clone(),
        &SeriesOptions::default().timestamp_column("symbol"),
    )?;

    let err = series.timestamps().expect_err("strings are not timestamps");
    assert_eq!(err.kind(), ErrorKind::UnsupportedValueType);
    assert!(!table.is_pinned());

    // an outer pin is kept across the failure
    table.pin();
    assert!(series.timestamps().is_err());
    assert!(table.is_pinned());
    table.unpin();
    Ok(())
}
