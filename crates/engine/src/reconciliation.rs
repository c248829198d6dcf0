//! Reconciliation between the movement ledger and the materialized stock.
//!
//! Two operating modes keep the derived table in sync with the ledger:
//! incremental apply (one movement at a time, optimistic per-key
//! concurrency) and full rebuild (replay the whole ledger through the
//! aggregator behind an exclusive gate). `verify()` recomputes without
//! mutating, for drift detection.

use std::collections::BTreeMap;
use std::sync::RwLock;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use maristock_core::{ExpectedVersion, Quantity};
use maristock_movements::{MovementRecord, StockDelta};

use crate::aggregator::aggregate;
use crate::ledger_store::{LedgerStore, LedgerStoreError};
use crate::stock_store::{StockEntry, StockKey, StockStore, StockStoreError, StockWrite};

/// Attempts before an incremental apply gives up on a contended key.
const MAX_APPLY_ATTEMPTS: u32 = 8;

/// Outcome of a full rebuild.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Derived entries written by the rebuild.
    pub entries_processed: usize,
    /// Keys whose floored quantity differs from the pre-rebuild table
    /// (created and dropped keys included).
    pub entries_changed: usize,
    /// Ledger records replayed.
    pub movements_replayed: usize,
}

/// One key where the materialized table disagrees with the recomputation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftEntry {
    pub key: StockKey,
    /// The table's value; `None` when the row is missing entirely.
    pub materialized: Option<Quantity>,
    pub recomputed: Quantity,
    /// `recomputed − materialized` (missing rows count as zero).
    pub delta: Decimal,
}

/// Reconciliation failure.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("ledger store: {0}")]
    Ledger(#[from] LedgerStoreError),

    #[error("stock store: {0}")]
    Stock(StockStoreError),

    #[error("contention on {key} persisted across {attempts} attempts")]
    Contention { key: StockKey, attempts: u32 },
}

/// Keeps the derived stock table consistent with the movement ledger.
///
/// ## Concurrency
///
/// Incremental applies on distinct keys proceed in parallel; applies that
/// race on the same key serialize through the stock store's versioned
/// commit, with a bounded retry here. Rebuild takes the write side of the
/// gate, so it never interleaves with a partially committed apply — and an
/// apply never observes a half-swapped table.
pub struct ReconciliationEngine<L, S> {
    ledger: L,
    stock: S,
    /// Applies hold the read side; rebuild holds the write side.
    gate: RwLock<()>,
}

impl<L, S> ReconciliationEngine<L, S>
where
    L: LedgerStore,
    S: StockStore,
{
    pub fn new(ledger: L, stock: S) -> Self {
        Self { ledger, stock, gate: RwLock::new(()) }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn stock(&self) -> &S {
        &self.stock
    }

    /// Incrementally apply one persisted movement to the derived table.
    ///
    /// Reads the affected entries, computes the new floored quantities, and
    /// commits every effect of the movement as a single atomic batch. A
    /// version conflict means a concurrent writer got to one of the keys
    /// first; the whole read-compute-commit cycle retries against the fresh
    /// state.
    pub fn apply(&self, record: &MovementRecord) -> Result<(), ReconcileError> {
        let _shared = self
            .gate
            .read()
            .map_err(|_| ReconcileError::Stock(StockStoreError::Storage("gate poisoned".into())))?;

        let mut attempts = 0;
        loop {
            attempts += 1;

            let mut writes = Vec::with_capacity(2);
            for effect in record.effects() {
                let key = StockKey {
                    product_id: record.product_id(),
                    warehouse_id: effect.warehouse_id,
                };
                let current = self.stock.get(&key).map_err(ReconcileError::Stock)?;
                let (found_version, available) = current
                    .map(|e| (e.version, e.quantity_available))
                    .unwrap_or((0, Quantity::ZERO));

                let next = match effect.delta {
                    StockDelta::Increase(quantity) => available + quantity,
                    StockDelta::Decrease(quantity) => {
                        if quantity > available {
                            // Overdraft is recorded in full in the ledger but
                            // the visible stock floors at zero.
                            warn!(
                                movement_id = %record.id(),
                                %key,
                                requested = %quantity,
                                %available,
                                "decrement exceeds available stock, flooring at zero"
                            );
                        }
                        available.saturating_sub(quantity)
                    }
                };

                writes.push(StockWrite {
                    key,
                    expected_version: ExpectedVersion::Exact(found_version),
                    quantity_available: next,
                });
            }

            match self.stock.commit(writes) {
                Ok(()) => return Ok(()),
                Err(StockStoreError::VersionConflict { key, .. }) => {
                    if attempts >= MAX_APPLY_ATTEMPTS {
                        return Err(ReconcileError::Contention { key, attempts });
                    }
                    // Raced with a concurrent apply; re-read and retry.
                }
                Err(other) => return Err(ReconcileError::Stock(other)),
            }
        }
    }

    /// Discard the derived table and recompute it from the full ledger.
    ///
    /// Safe to invoke repeatedly: replaying an unchanged ledger writes an
    /// identical table. Incremental applies are blocked for the duration.
    pub fn rebuild(&self) -> Result<RebuildReport, ReconcileError> {
        let _exclusive = self
            .gate
            .write()
            .map_err(|_| ReconcileError::Stock(StockStoreError::Storage("gate poisoned".into())))?;

        let movements = self.ledger.load_all()?;
        let totals = aggregate(&movements);

        let before: BTreeMap<StockKey, Quantity> = self
            .stock
            .list(None)
            .map_err(ReconcileError::Stock)?
            .into_iter()
            .map(|e| (e.key, e.quantity_available))
            .collect();

        let mut entries_changed = 0;
        for (key, total) in &totals {
            if before.get(key).copied() != Some(total.available) {
                entries_changed += 1;
            }
        }
        // Rows the ledger never produced (tampering, stale imports) get
        // dropped by the swap; count them as changes too.
        entries_changed += before.keys().filter(|k| !totals.contains_key(k)).count();

        let entries: Vec<StockEntry> = totals
            .iter()
            .map(|(key, total)| StockEntry {
                key: *key,
                quantity_available: total.available,
                version: 1,
            })
            .collect();
        let report = RebuildReport {
            entries_processed: entries.len(),
            entries_changed,
            movements_replayed: movements.len(),
        };

        self.stock.replace_all(entries).map_err(ReconcileError::Stock)?;

        info!(
            entries_processed = report.entries_processed,
            entries_changed = report.entries_changed,
            movements_replayed = report.movements_replayed,
            "derived stock rebuilt from ledger"
        );
        Ok(report)
    }

    /// Recompute from the ledger and report every key where the table
    /// disagrees, without mutating anything.
    ///
    /// Drift is surfaced, never auto-corrected: healing it is an explicit,
    /// logged rebuild decision left to operators.
    pub fn verify(&self) -> Result<Vec<DriftEntry>, ReconcileError> {
        let _shared = self
            .gate
            .read()
            .map_err(|_| ReconcileError::Stock(StockStoreError::Storage("gate poisoned".into())))?;

        let movements = self.ledger.load_all()?;
        let totals = aggregate(&movements);

        let materialized: BTreeMap<StockKey, Quantity> = self
            .stock
            .list(None)
            .map_err(ReconcileError::Stock)?
            .into_iter()
            .map(|e| (e.key, e.quantity_available))
            .collect();

        let mut drift = Vec::new();
        for (key, total) in &totals {
            let found = materialized.get(key).copied();
            if found != Some(total.available) {
                drift.push(DriftEntry {
                    key: *key,
                    materialized: found,
                    recomputed: total.available,
                    delta: total.available.value() - found.unwrap_or(Quantity::ZERO).value(),
                });
            }
        }
        for (key, quantity) in &materialized {
            if !totals.contains_key(key) && !quantity.is_zero() {
                drift.push(DriftEntry {
                    key: *key,
                    materialized: Some(*quantity),
                    recomputed: Quantity::ZERO,
                    delta: -quantity.value(),
                });
            }
        }
        drift.sort_by_key(|d| d.key);

        if !drift.is_empty() {
            warn!(keys = drift.len(), "derived stock drift detected");
        }
        Ok(drift)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maristock_core::{ProductId, UserId, WarehouseId};
    use maristock_movements::NewMovement;
    use rust_decimal_macros::dec;

    use crate::ledger_store::InMemoryLedgerStore;
    use crate::stock_store::InMemoryStockStore;

    fn qty(value: Decimal) -> Quantity {
        Quantity::new(value).unwrap()
    }

    fn engine() -> ReconciliationEngine<InMemoryLedgerStore, InMemoryStockStore> {
        ReconciliationEngine::new(InMemoryLedgerStore::new(), InMemoryStockStore::new())
    }

    fn submit_receipt(
        engine: &ReconciliationEngine<InMemoryLedgerStore, InMemoryStockStore>,
        product: ProductId,
        warehouse: WarehouseId,
        quantity: Decimal,
    ) -> MovementRecord {
        let draft = NewMovement::receipt(
            product,
            warehouse,
            qty(quantity),
            Utc::now(),
            None,
            UserId::new(),
        )
        .unwrap();
        let record = engine.ledger().append(draft).unwrap();
        engine.apply(&record).unwrap();
        record
    }

    #[test]
    fn apply_upserts_missing_entries() {
        let engine = engine();
        let product = ProductId::new();
        let warehouse = WarehouseId::new();

        submit_receipt(&engine, product, warehouse, dec!(500.00));

        let key = StockKey { product_id: product, warehouse_id: warehouse };
        let entry = engine.stock().get(&key).unwrap().unwrap();
        assert_eq!(entry.quantity_available, qty(dec!(500.00)));
        assert_eq!(entry.version, 1);
    }

    #[test]
    fn rebuild_reports_counts_and_is_idempotent() {
        let engine = engine();
        let product = ProductId::new();
        let w1 = WarehouseId::new();
        let w2 = WarehouseId::new();

        submit_receipt(&engine, product, w1, dec!(500));
        submit_receipt(&engine, product, w2, dec!(80));

        let first = engine.rebuild().unwrap();
        assert_eq!(first.entries_processed, 2);
        assert_eq!(first.movements_replayed, 2);
        // The table already matched the ledger.
        assert_eq!(first.entries_changed, 0);

        let snapshot = engine.stock().list(None).unwrap();
        let second = engine.rebuild().unwrap();
        assert_eq!(second.entries_changed, 0);
        assert_eq!(engine.stock().list(None).unwrap(), snapshot);
    }

    #[test]
    fn verify_is_quiet_when_in_sync_and_reports_tampering() {
        let engine = engine();
        let product = ProductId::new();
        let warehouse = WarehouseId::new();

        submit_receipt(&engine, product, warehouse, dec!(120));
        assert!(engine.verify().unwrap().is_empty());

        // Tamper with the table behind the engine's back.
        let key = StockKey { product_id: product, warehouse_id: warehouse };
        engine
            .stock()
            .replace_all(vec![StockEntry {
                key,
                quantity_available: qty(dec!(90)),
                version: 1,
            }])
            .unwrap();

        let drift = engine.verify().unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].key, key);
        assert_eq!(drift[0].materialized, Some(qty(dec!(90))));
        assert_eq!(drift[0].recomputed, qty(dec!(120)));
        assert_eq!(drift[0].delta, dec!(30));

        // Verify never heals; the table is still wrong until a rebuild.
        assert_eq!(engine.verify().unwrap().len(), 1);
        engine.rebuild().unwrap();
        assert!(engine.verify().unwrap().is_empty());
    }

    #[test]
    fn verify_reports_missing_rows() {
        let engine = engine();
        let product = ProductId::new();
        let warehouse = WarehouseId::new();

        submit_receipt(&engine, product, warehouse, dec!(75));
        engine.stock().replace_all(vec![]).unwrap();

        let drift = engine.verify().unwrap();
        assert_eq!(drift.len(), 1);
        assert_eq!(drift[0].materialized, None);
        assert_eq!(drift[0].recomputed, qty(dec!(75)));
        assert_eq!(drift[0].delta, dec!(75));
    }
}
