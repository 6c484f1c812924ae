//! The distributed (DataFusion) engine.
//!
//! DataFusion is async while this crate is not. Every DataFusion future is
//! run to completion on one process-wide multi-thread Tokio runtime through
//! [`run_blocking`], so none of these functions may be called from inside an
//! async task.
//!
//! Whether distributed tables are accepted at all is a capability flag
//! ([`distributed_available`]) resolved once per process from
//! [`DistributedConfig`]. Call [`init`] before first use to override the
//! environment-derived defaults.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use arrow::array::{ArrayRef, RecordBatch};
use arrow::compute::concat_batches;
use arrow::datatypes::{Schema, SchemaRef};
use datafusion::dataframe::DataFrame;
use datafusion::error::Result as DFResult;
use datafusion::prelude::{Expr, SessionConfig, SessionContext, ident};
use log::debug;
use snafu::prelude::*;
use tokio::runtime::{Builder, Runtime};

use crate::backend::ColumnAccessor;
use crate::cache::{CacheCapability, Pinnable};
use crate::error::{
    ArrowSnafu, DataFusionSnafu, RuntimeSnafu, SeriesResult, UnknownColumnSnafu,
    UnsupportedOperationSnafu,
};

const ENV_ENABLED: &str = "TIMESERIES_MODEL_DISTRIBUTED";
const ENV_TARGET_PARTITIONS: &str = "TIMESERIES_MODEL_TARGET_PARTITIONS";
const ENV_BATCH_SIZE: &str = "TIMESERIES_MODEL_BATCH_SIZE";

/// Process-wide settings of the distributed engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributedConfig {
    /// Whether distributed tables are accepted.
    pub enabled: bool,
    /// DataFusion target partitions; `None` keeps DataFusion's default.
    pub target_partitions: Option<usize>,
    /// DataFusion batch size; `None` keeps DataFusion's default.
    pub batch_size: Option<usize>,
}

impl Default for DistributedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_partitions: None,
            batch_size: None,
        }
    }
}

impl DistributedConfig {
    /// Read the configuration from `TIMESERIES_MODEL_*` environment variables.
    ///
    /// `TIMESERIES_MODEL_DISTRIBUTED=0|false|off` disables the engine.
    /// Unparseable sizes are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let enabled = lookup(ENV_ENABLED)
            .map(|v| {
                !matches!(
                    v.trim().to_ascii_lowercase().as_str(),
                    "0" | "false" | "off" | "no"
                )
            })
            .unwrap_or(true);
        let size = |key: &str| {
            lookup(key)
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|&n| n > 0)
        };

        Self {
            enabled,
            target_partitions: size(ENV_TARGET_PARTITIONS),
            batch_size: size(ENV_BATCH_SIZE),
        }
    }

    fn session_config(&self) -> SessionConfig {
        let mut cfg = SessionConfig::new();
        if let Some(n) = self.target_partitions {
            cfg = cfg.with_target_partitions(n);
        }
        if let Some(n) = self.batch_size {
            cfg = cfg.with_batch_size(n);
        }
        cfg
    }
}

static CONFIG: OnceLock<DistributedConfig> = OnceLock::new();
static SESSION: OnceLock<SessionContext> = OnceLock::new();
static GLOBAL_RUNTIME: OnceLock<Arc<Runtime>> = OnceLock::new();

/// Install `config` for this process.
///
/// Returns `false` if a configuration was already installed (explicitly or
/// by first use), in which case `config` is ignored.
pub fn init(config: DistributedConfig) -> bool {
    CONFIG.set(config).is_ok()
}

/// The active configuration, resolved from the environment on first use.
pub fn config() -> &'static DistributedConfig {
    CONFIG.get_or_init(DistributedConfig::from_env)
}

/// Whether distributed tables can be used in this process.
pub fn distributed_available() -> bool {
    config().enabled
}

/// Fail with `UnsupportedOperation` unless the distributed engine is enabled.
pub(crate) fn require_distributed(operation: &str) -> SeriesResult<()> {
    ensure!(
        distributed_available(),
        UnsupportedOperationSnafu {
            operation: format!("{operation} needs the distributed engine, which is disabled"),
        }
    );
    Ok(())
}

/// The shared DataFusion session.
pub fn session() -> &'static SessionContext {
    SESSION.get_or_init(|| SessionContext::new_with_config(config().session_config()))
}

fn new_runtime() -> SeriesResult<Runtime> {
    Builder::new_multi_thread()
        .enable_all()
        .build()
        .context(RuntimeSnafu)
}

fn global_runtime() -> SeriesResult<Arc<Runtime>> {
    if let Some(rt) = GLOBAL_RUNTIME.get() {
        return Ok(Arc::clone(rt));
    }

    let rt = Arc::new(new_runtime()?);

    // If we lose the race, the already-installed runtime wins.
    Ok(Arc::clone(GLOBAL_RUNTIME.get_or_init(|| rt)))
}

/// Drive a DataFusion future to completion.
pub fn run_blocking<T, F>(fut: F) -> SeriesResult<T>
where
    F: Future<Output = DFResult<T>>,
{
    global_runtime()?.block_on(fut).context(DataFusionSnafu)
}

/// Register a local table with the shared session.
pub fn from_local(batch: RecordBatch) -> SeriesResult<DistributedTable> {
    require_distributed("converting a local table")?;
    let frame = session().read_batch(batch).context(DataFusionSnafu)?;
    Ok(DistributedTable::new(frame))
}

#[derive(Default)]
struct PinState {
    pinned: AtomicBool,
    cached: Mutex<Option<DataFrame>>,
}

/// A lazily evaluated DataFusion table with a pinning capability.
///
/// Clones share pin state: pinning one handle pins every clone. While pinned,
/// the first read runs `DataFrame::cache` once and later reads (and tables
/// derived from them) scan the cached rows instead of re-running the plan.
#[derive(Clone)]
pub struct DistributedTable {
    frame: DataFrame,
    pin: Arc<PinState>,
}

impl fmt::Debug for DistributedTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistributedTable")
            .field("schema", self.frame.schema().as_arrow())
            .field("pinned", &self.is_pinned())
            .finish()
    }
}

impl From<DataFrame> for DistributedTable {
    fn from(frame: DataFrame) -> Self {
        Self::new(frame)
    }
}

impl DistributedTable {
    /// Wrap a DataFrame. The new table is not pinned.
    pub fn new(frame: DataFrame) -> Self {
        Self {
            frame,
            pin: Arc::new(PinState::default()),
        }
    }

    /// Arrow schema of the table.
    pub fn schema(&self) -> Schema {
        self.frame.schema().as_arrow().clone()
    }

    /// The DataFrame to read from: the cached one while pinned.
    pub fn frame(&self) -> SeriesResult<DataFrame> {
        if !self.is_pinned() {
            return Ok(self.frame.clone());
        }

        let mut cached = self
            .pin
            .cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(frame) = cached.as_ref() {
            return Ok(frame.clone());
        }

        debug!("materializing pinned distributed table");
        let frame = run_blocking(self.frame.clone().cache())?;
        *cached = Some(frame.clone());
        Ok(frame)
    }

    /// Build a new (unpinned) table from this one's plan.
    pub fn derive(
        &self,
        f: impl FnOnce(DataFrame) -> DFResult<DataFrame>,
    ) -> SeriesResult<DistributedTable> {
        let frame = f(self.frame()?).context(DataFusionSnafu)?;
        Ok(DistributedTable::new(frame))
    }

    /// Keep the columns accepted by `keep`, in table order.
    ///
    /// Columns are referenced as quoted identifiers, so names containing dots
    /// or upper-case letters are matched literally.
    pub fn project(&self, keep: impl Fn(&str) -> bool) -> SeriesResult<DistributedTable> {
        let exprs: Vec<Expr> = self
            .frame
            .schema()
            .fields()
            .iter()
            .filter(|f| keep(f.name()))
            .map(|f| ident(f.name()))
            .collect();
        self.derive(|f| f.select(exprs))
    }

    /// Drop every column named in `names`; unknown names are ignored.
    pub fn drop_columns(&self, names: &[&str]) -> SeriesResult<DistributedTable> {
        self.project(|name| !names.contains(&name))
    }

    /// Keep only the columns named in `names`, in table order.
    pub fn retain_columns(&self, names: &[&str]) -> SeriesResult<DistributedTable> {
        self.project(|name| names.contains(&name))
    }

    /// Materialize every row as one local table.
    pub fn collect(&self) -> SeriesResult<RecordBatch> {
        let frame = self.frame()?;
        let logical: SchemaRef = Arc::new(frame.schema().as_arrow().clone());
        let batches = run_blocking(frame.collect())?;
        let schema = batches
            .first()
            .map(|b| b.schema())
            .unwrap_or(logical);
        concat_batches(&schema, &batches).context(ArrowSnafu)
    }

    /// Number of rows.
    pub fn count(&self) -> SeriesResult<usize> {
        run_blocking(self.frame()?.count())
    }

    /// Unwrap the plan this table was built from.
    pub fn into_frame(self) -> DataFrame {
        self.frame
    }
}

impl Pinnable for DistributedTable {
    fn is_pinned(&self) -> bool {
        self.pin.pinned.load(Ordering::Acquire)
    }

    fn pin(&self) {
        self.pin.pinned.store(true, Ordering::Release);
    }

    fn unpin(&self) {
        self.pin.pinned.store(false, Ordering::Release);
        self.pin
            .cached
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

impl CacheCapability for DistributedTable {
    fn pinning(&self) -> Option<&dyn Pinnable> {
        Some(self)
    }
}

/// Columns of a distributed table are fetched one projection at a time.
impl ColumnAccessor for DistributedTable {
    fn column(&self, name: &str) -> SeriesResult<ArrayRef> {
        ensure!(
            self.frame.schema().as_arrow().index_of(name).is_ok(),
            UnknownColumnSnafu {
                column: name,
                role: "value"
            }
        );
        let batch = self.derive(|f| f.select_columns(&[name]))?.collect()?;
        Ok(batch.column(0).clone())
    }

    fn row_count(&self) -> SeriesResult<usize> {
        self.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ScopedCache;
    use crate::test_util::*;
    use arrow::array::{Array, Int64Array};

    #[test]
    fn env_parsing() {
        let cfg = DistributedConfig::from_lookup(|key| match key {
            ENV_ENABLED => Some("off".to_string()),
            ENV_TARGET_PARTITIONS => Some("4".to_string()),
            ENV_BATCH_SIZE => Some("zero".to_string()),
            _ => None,
        });
        assert!(!cfg.enabled);
        assert_eq!(cfg.target_partitions, Some(4));
        assert_eq!(cfg.batch_size, None);

        assert_eq!(DistributedConfig::from_lookup(|_| None), DistributedConfig::default());
    }

    #[test]
    fn reads_columns_and_counts() -> TestResult {
        let table = from_local(id_ts_val_batch()?)?;
        assert_eq!(table.count()?, 3);
        let val = table.column("val")?;
        assert_eq!(
            val.as_any().downcast_ref::<Int64Array>(),
            Some(&Int64Array::from(vec![10, 11, 20]))
        );
        assert!(table.column("missing").is_err());
        Ok(())
    }

    #[test]
    fn pinning_is_shared_by_clones_and_cleared_on_unpin() -> TestResult {
        let table = from_local(id_ts_val_batch()?)?;
        let other = table.clone();
        {
            let guard = ScopedCache::acquire(&table);
            assert!(guard.did_pin());
            assert!(other.is_pinned());
            assert_eq!(other.collect()?.num_rows(), 3);
        }
        assert!(!other.is_pinned());
        assert_eq!(table.collect()?, id_ts_val_batch()?);
        Ok(())
    }

    #[test]
    fn projections_keep_table_order() -> TestResult {
        let table = from_local(id_ts_val_batch()?)?;
        let kept = table.retain_columns(&["val", "id"])?.collect()?;
        assert_eq!(kept.schema().field(0).name(), "id");
        assert_eq!(kept.num_columns(), 2);

        let dropped = table.drop_columns(&["ts"])?.collect()?;
        assert_eq!(dropped.schema().field(1).name(), "val");
        Ok(())
    }
}
