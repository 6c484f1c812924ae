//! Behavior when the distributed engine is switched off for the process.
//!
//! Runs in its own test binary because the configuration is process-wide.
#![cfg(feature = "datafusion")]

mod common;

use std::sync::Once;

use common::*;
use datafusion::prelude::SessionContext;
use timeseries_model_core::engine::{self, DistributedConfig};
use timeseries_model_core::{DistributedTable, ErrorKind, TimeSeries};

static DISABLE: Once = Once::new();

fn disable() {
    DISABLE.call_once(|| {
        engine::init(DistributedConfig {
            enabled: false,
            ..Default::default()
        });
    });
}

#[test]
fn capability_flag_reports_disabled() {
    disable();
    assert!(!engine::distributed_available());
    assert!(!engine::config().enabled);
}

#[test]
fn local_tables_still_work() -> TestResult {
    disable();
    let ts = TimeSeries::builder()
        .data(id_ts_val()?)
        .key_column("id")
        .timestamp_column("ts")
        .build()?;
    assert_eq!(ts.timeseries()?.len(), 2);
    assert_eq!(ts.as_local_table(None, None)?.num_rows(), 3);
    Ok(())
}

#[test]
fn distributed_export_is_unsupported() -> TestResult {
    disable();
    let ts = TimeSeries::builder().data(val_only()?).build()?;
    let err = ts
        .as_distributed_table(None, None)
        .expect_err("engine is disabled");
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);

    let err = ts.timeseries()?[0]
        .as_distributed_table(Some(true))
        .expect_err("engine is disabled");
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    Ok(())
}

#[test]
fn bridging_a_local_table_is_unsupported() -> TestResult {
    disable();
    let err = engine::from_local(val_only()?).expect_err("engine is disabled");
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    Ok(())
}

#[test]
fn distributed_input_is_unsupported() -> TestResult {
    disable();
    // Built from a caller-owned session, bypassing the disabled shared one.
    let frame = SessionContext::new().read_batch(id_ts_val()?)?;
    let err = TimeSeries::builder()
        .data(DistributedTable::new(frame))
        .key_column("id")
        .build()
        .expect_err("engine is disabled");
    assert_eq!(err.kind(), ErrorKind::UnsupportedOperation);
    Ok(())
}
