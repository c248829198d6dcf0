//! Boundary façade over the ledger, the reconciliation engine and the
//! derived stock reads.
//!
//! External collaborators (HTTP handlers, dashboards, export jobs) call
//! these operations; nothing else in the workspace knows them. The façade
//! owns the submission pipeline — dedupe guard, ledger append, incremental
//! apply — and maps store/engine failures onto the caller-facing error
//! taxonomy.

use thiserror::Error;
use tracing::{info, instrument, warn};

use maristock_core::{DomainError, ProductId, Quantity, WarehouseId};
use maristock_movements::{MovementId, MovementRecord, NewMovement};

use crate::ledger_store::{LedgerStore, LedgerStoreError};
use crate::reconciliation::{DriftEntry, RebuildReport, ReconcileError, ReconciliationEngine};
use crate::stock_store::{StockEntry, StockKey, StockStore, StockStoreError};

/// Idempotent-submission policy.
///
/// Callers whose `submit` timed out cannot know whether the movement
/// landed. With `ByReference`, re-submitting the same movement (same
/// reference document, business time and quantity) is rejected with the
/// already-assigned id instead of double-counting stock.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum DedupePolicy {
    /// No guard; every submission appends.
    #[default]
    Off,
    /// Reject resubmissions that match a ledger record on
    /// (reference_document, occurred_at, quantity).
    ByReference,
}

/// Caller-facing failure of a stock operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed movement; nothing was persisted. Fix the input and resubmit.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// Ledger or stock-table write failed; the movement is NOT applied.
    #[error("persistence failure: {0}")]
    Persistence(String),

    /// Contention on a derived entry outlived the bounded retries. Retry
    /// the submission; a rebuild is not the remedy for this.
    #[error("concurrency conflict: {0}")]
    Concurrency(String),

    /// The idempotency guard matched an existing ledger record.
    #[error("duplicate submission of movement {existing} (reference {reference})")]
    Duplicate {
        existing: MovementId,
        reference: String,
    },
}

impl From<LedgerStoreError> for ServiceError {
    fn from(value: LedgerStoreError) -> Self {
        ServiceError::Persistence(value.to_string())
    }
}

impl From<StockStoreError> for ServiceError {
    fn from(value: StockStoreError) -> Self {
        match value {
            StockStoreError::VersionConflict { .. } => ServiceError::Concurrency(value.to_string()),
            StockStoreError::Storage(_) => ServiceError::Persistence(value.to_string()),
        }
    }
}

impl From<ReconcileError> for ServiceError {
    fn from(value: ReconcileError) -> Self {
        match value {
            ReconcileError::Contention { .. } => ServiceError::Concurrency(value.to_string()),
            ReconcileError::Ledger(e) => e.into(),
            ReconcileError::Stock(e) => e.into(),
        }
    }
}

/// The stock core's external contract.
pub struct StockService<L, S> {
    engine: ReconciliationEngine<L, S>,
    dedupe: DedupePolicy,
}

impl<L, S> StockService<L, S>
where
    L: LedgerStore,
    S: StockStore,
{
    pub fn new(ledger: L, stock: S) -> Self {
        Self::with_dedupe(ledger, stock, DedupePolicy::default())
    }

    pub fn with_dedupe(ledger: L, stock: S, dedupe: DedupePolicy) -> Self {
        Self {
            engine: ReconciliationEngine::new(ledger, stock),
            dedupe,
        }
    }

    pub fn engine(&self) -> &ReconciliationEngine<L, S> {
        &self.engine
    }

    /// Validate, persist and apply one movement; returns its ledger id.
    ///
    /// Ordering: the ledger append is the durable step, the incremental
    /// apply follows. If the apply fails the ledger still holds the record —
    /// the table lags until a retried apply or a rebuild catches it up, and
    /// `verify_stock` will show the gap — but stock is never updated for a
    /// movement that was not durably recorded.
    #[instrument(
        skip(self, draft),
        fields(
            kind = draft.kind().as_str(),
            product_id = %draft.product_id(),
            quantity = %draft.quantity(),
        )
    )]
    pub fn submit_movement(&self, draft: NewMovement) -> Result<MovementId, ServiceError> {
        if self.dedupe == DedupePolicy::ByReference {
            if let Some(reference) = draft.reference_document() {
                let prior = self.engine.ledger().find_by_reference(reference)?;
                if let Some(existing) = prior.iter().find(|m| {
                    m.occurred_at() == draft.occurred_at() && m.quantity() == draft.quantity()
                }) {
                    warn!(existing = %existing.id(), reference, "duplicate submission rejected");
                    return Err(ServiceError::Duplicate {
                        existing: existing.id(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        let record = self.engine.ledger().append(draft)?;
        self.engine.apply(&record)?;

        info!(movement_id = %record.id(), "movement applied");
        Ok(record.id())
    }

    /// Current available quantity for one key; zero when the key has no row.
    pub fn get_stock(
        &self,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Quantity, ServiceError> {
        let key = StockKey { product_id, warehouse_id };
        Ok(self
            .engine
            .stock()
            .get(&key)?
            .map(|e| e.quantity_available)
            .unwrap_or(Quantity::ZERO))
    }

    /// Stock entries in key order, optionally restricted to one warehouse.
    pub fn list_stock(
        &self,
        warehouse_id: Option<WarehouseId>,
    ) -> Result<Vec<StockEntry>, ServiceError> {
        Ok(self.engine.stock().list(warehouse_id)?)
    }

    /// Administrative: discard the derived table and recompute from history.
    #[instrument(skip(self))]
    pub fn rebuild_stock(&self) -> Result<RebuildReport, ServiceError> {
        Ok(self.engine.rebuild()?)
    }

    /// Read-only consistency check of the derived table against the ledger.
    pub fn verify_stock(&self) -> Result<Vec<DriftEntry>, ServiceError> {
        Ok(self.engine.verify()?)
    }

    /// Administrative escape hatch: drop a ledger record, then rebuild.
    ///
    /// Floor clamping makes an inverse incremental application inexact
    /// (removing an issue that was clamped would re-add stock that was
    /// never subtracted), so the derived table is always recomputed from
    /// the remaining history. Never a silent stock edit.
    #[instrument(skip(self), fields(movement_id = %id))]
    pub fn remove_movement(&self, id: MovementId) -> Result<RebuildReport, ServiceError> {
        let removed = self.engine.ledger().remove(id)?;
        warn!(
            kind = removed.kind().as_str(),
            quantity = %removed.quantity(),
            "movement removed from ledger, rebuilding derived stock"
        );
        Ok(self.engine.rebuild()?)
    }

    /// Movements carrying a reference document (unknown-outcome recovery).
    pub fn find_movements_by_reference(
        &self,
        reference: &str,
    ) -> Result<Vec<MovementRecord>, ServiceError> {
        Ok(self.engine.ledger().find_by_reference(reference)?)
    }

    /// Ledger records filtered by warehouse and/or product, most recent
    /// business time first.
    pub fn movement_history(
        &self,
        warehouse_id: Option<WarehouseId>,
        product_id: Option<ProductId>,
    ) -> Result<Vec<MovementRecord>, ServiceError> {
        let mut movements = self.engine.ledger().load_all()?;
        movements.retain(|m| {
            let warehouse_matches = warehouse_id.is_none_or(|w| {
                m.source_warehouse_id() == Some(w) || m.destination_warehouse_id() == Some(w)
            });
            let product_matches = product_id.is_none_or(|p| m.product_id() == p);
            warehouse_matches && product_matches
        });
        movements.sort_by(|a, b| b.occurred_at().cmp(&a.occurred_at()).then(b.id().cmp(&a.id())));
        Ok(movements)
    }
}
