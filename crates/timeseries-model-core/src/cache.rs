//! Scoped pinning of deferred tables.
//!
//! Reading several attributes of a lazily evaluated table would otherwise
//! re-run its plan for every read. [`ScopedCache`] pins the table for the
//! lifetime of the guard and unpins it on drop, but only if the guard itself
//! performed the pin: a table that was already pinned by an outer caller is
//! left exactly as it was found. Dropping happens on every exit path,
//! including early returns through `?`.
//!
//! ```ignore
//! let _cache = ScopedCache::acquire(&table);
//! let ts = layout.resolve(SeriesAttribute::Timestamps, &accessor)?;
//! let values = layout.resolve(SeriesAttribute::Values, &accessor)?;
//! // `table` is unpinned here unless it was pinned before `acquire`.
//! ```

use arrow::array::RecordBatch;
use log::debug;

/// The pin/unpin capability of a physical table.
///
/// Implementations use interior mutability: pin state is shared by every
/// handle to the same table.
pub trait Pinnable {
    /// Whether the table is currently pinned.
    fn is_pinned(&self) -> bool;
    /// Ask the engine to retain the table's computed rows.
    fn pin(&self);
    /// Release a previous [`Pinnable::pin`].
    fn unpin(&self);
}

/// Exposes the pinning capability of a table, if its engine has one.
pub trait CacheCapability {
    /// The pinning capability, or `None` for engines without one.
    fn pinning(&self) -> Option<&dyn Pinnable> {
        None
    }
}

/// In-memory tables are already materialized.
impl CacheCapability for RecordBatch {}

/// Guard that keeps a table pinned for its own lifetime.
#[must_use = "the table is unpinned as soon as the guard is dropped"]
pub struct ScopedCache<'a> {
    target: Option<&'a dyn Pinnable>,
    did_pin: bool,
}

impl<'a> ScopedCache<'a> {
    /// Pin `table` unless it is already pinned or cannot be pinned.
    pub fn acquire<T: CacheCapability + ?Sized>(table: &'a T) -> Self {
        let target = table.pinning();
        let mut did_pin = false;

        if let Some(pinnable) = target {
            if !pinnable.is_pinned() {
                pinnable.pin();
                did_pin = true;
                debug!("scoped cache pinned table");
            }
        }

        Self { target, did_pin }
    }

    /// Whether this guard performed the pin (and will therefore unpin).
    pub fn did_pin(&self) -> bool {
        self.did_pin
    }
}

impl Drop for ScopedCache<'_> {
    fn drop(&mut self) {
        if !self.did_pin {
            return;
        }
        if let Some(pinnable) = self.target {
            pinnable.unpin();
            debug!("scoped cache unpinned table");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct FakeTable {
        pinned: Cell<bool>,
        pins: Cell<usize>,
        unpins: Cell<usize>,
    }

    impl Pinnable for FakeTable {
        fn is_pinned(&self) -> bool {
            self.pinned.get()
        }

        fn pin(&self) {
            self.pinned.set(true);
            self.pins.set(self.pins.get() + 1);
        }

        fn unpin(&self) {
            self.pinned.set(false);
            self.unpins.set(self.unpins.get() + 1);
        }
    }

    impl CacheCapability for FakeTable {
        fn pinning(&self) -> Option<&dyn Pinnable> {
            Some(self)
        }
    }

    #[test]
    fn pins_and_releases_unpinned_table() {
        let table = FakeTable::default();
        {
            let guard = ScopedCache::acquire(&table);
            assert!(guard.did_pin());
            assert!(table.is_pinned());
        }
        assert!(!table.is_pinned());
        assert_eq!((table.pins.get(), table.unpins.get()), (1, 1));
    }

    #[test]
    fn leaves_pre_pinned_table_alone() {
        let table = FakeTable::default();
        table.pin();
        {
            let guard = ScopedCache::acquire(&table);
            assert!(!guard.did_pin());
        }
        assert!(table.is_pinned());
        assert_eq!(table.unpins.get(), 0);
    }

    #[test]
    fn nested_guards_unpin_once() {
        let table = FakeTable::default();
        {
            let _outer = ScopedCache::acquire(&table);
            {
                let inner = ScopedCache::acquire(&table);
                assert!(!inner.did_pin());
            }
            assert!(table.is_pinned());
        }
        assert!(!table.is_pinned());
        assert_eq!(table.unpins.get(), 1);
    }

    #[test]
    fn releases_on_error_path() {
        fn failing(table: &FakeTable) -> Result<(), &'static str> {
            let _cache = ScopedCache::acquire(table);
            Err("boom")
        }

        let table = FakeTable::default();
        assert!(failing(&table).is_err());
        assert!(!table.is_pinned());
    }

    #[test]
    fn record_batches_are_a_no_op() {
        let batch = RecordBatch::new_empty(std::sync::Arc::new(arrow::datatypes::Schema::empty()));
        let guard = ScopedCache::acquire(&batch);
        assert!(!guard.did_pin());
    }
}
