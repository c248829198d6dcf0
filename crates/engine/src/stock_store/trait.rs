use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use maristock_core::{ExpectedVersion, ProductId, Quantity, WarehouseId};

/// Key of a derived stock entry: one product in one warehouse.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct StockKey {
    pub product_id: ProductId,
    pub warehouse_id: WarehouseId,
}

impl core::fmt::Display for StockKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{}", self.product_id, self.warehouse_id)
    }
}

/// One row of the materialized stock table.
///
/// An entry is created on the first movement touching its key and never
/// spontaneously deleted: a key at quantity zero stays a row, so "stocked
/// out" remains distinguishable from "never existed".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    pub key: StockKey,
    pub quantity_available: Quantity,
    /// Optimistic-concurrency token, incremented on every committed write.
    pub version: u64,
}

/// One write of an atomic commit batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockWrite {
    pub key: StockKey,
    /// Version the writer read; `Exact(0)` asserts the entry does not exist.
    pub expected_version: ExpectedVersion,
    pub quantity_available: Quantity,
}

/// Stock store operation error.
#[derive(Debug, Error)]
pub enum StockStoreError {
    /// Another writer committed the key between read and write.
    #[error("optimistic version check failed for {key} (expected {expected:?}, found {found})")]
    VersionConflict {
        key: StockKey,
        expected: ExpectedVersion,
        found: u64,
    },

    #[error("stock storage failure: {0}")]
    Storage(String),
}

/// Keyed, versioned store for the materialized stock table.
///
/// ## Commit semantics
///
/// `commit()` is **all-or-nothing**: every write's version expectation is
/// checked against the current table before any write is applied, and on
/// success each touched entry's version advances by one. A movement's
/// effects (one write for a receipt or an issue, two for a transfer) are
/// handed to a single `commit` call, which is what keeps a transfer from
/// ever being half-applied.
///
/// ## Rebuild semantics
///
/// `replace_all()` swaps the entire table wholesale (versions restart at
/// the values provided). The reconciliation engine guards it with its
/// exclusive gate so a rebuild never interleaves with incremental commits.
pub trait StockStore: Send + Sync {
    fn get(&self, key: &StockKey) -> Result<Option<StockEntry>, StockStoreError>;

    /// Entries in key order, optionally restricted to one warehouse.
    fn list(&self, warehouse_id: Option<WarehouseId>) -> Result<Vec<StockEntry>, StockStoreError>;

    /// Apply a batch of versioned writes atomically.
    fn commit(&self, writes: Vec<StockWrite>) -> Result<(), StockStoreError>;

    /// Replace the whole table (rebuild support).
    fn replace_all(&self, entries: Vec<StockEntry>) -> Result<(), StockStoreError>;
}

impl<S> StockStore for Arc<S>
where
    S: StockStore + ?Sized,
{
    fn get(&self, key: &StockKey) -> Result<Option<StockEntry>, StockStoreError> {
        (**self).get(key)
    }

    fn list(&self, warehouse_id: Option<WarehouseId>) -> Result<Vec<StockEntry>, StockStoreError> {
        (**self).list(warehouse_id)
    }

    fn commit(&self, writes: Vec<StockWrite>) -> Result<(), StockStoreError> {
        (**self).commit(writes)
    }

    fn replace_all(&self, entries: Vec<StockEntry>) -> Result<(), StockStoreError> {
        (**self).replace_all(entries)
    }
}
