use std::sync::Arc;

use thiserror::Error;

use maristock_movements::{MovementId, MovementRecord, NewMovement};

/// Ledger store operation error.
///
/// These are **infrastructure errors** (storage, missing rows) as opposed to
/// the domain validation errors raised before a draft ever reaches the
/// store.
#[derive(Debug, Error)]
pub enum LedgerStoreError {
    #[error("ledger storage failure: {0}")]
    Storage(String),

    #[error("movement {0} not found")]
    NotFound(MovementId),
}

/// Append-only store for movement facts; the source of truth.
///
/// ## Append semantics
///
/// `append()` assigns the next monotonic [`MovementId`] and persists the
/// sealed record. Ids are never reused, including after an administrative
/// removal — the ledger is a sequence, and holes left by removals stay
/// holes.
///
/// ## Immutability
///
/// There is no update operation. Corrections are compensating movements.
/// `remove()` exists solely for the operator-initiated cleanup of test or
/// erroneous entries; callers are required to rebuild the derived stock
/// afterwards, which the service layer does.
pub trait LedgerStore: Send + Sync {
    /// Persist a validated draft, assigning its ledger position.
    fn append(&self, draft: NewMovement) -> Result<MovementRecord, LedgerStoreError>;

    /// Replay the full ledger in id order.
    fn load_all(&self) -> Result<Vec<MovementRecord>, LedgerStoreError>;

    /// Look up one movement by id.
    fn get(&self, id: MovementId) -> Result<Option<MovementRecord>, LedgerStoreError>;

    /// All movements carrying the given reference document, in id order.
    ///
    /// This is the recovery path for unknown-outcome submissions: a caller
    /// whose `append` timed out queries by reference before retrying.
    fn find_by_reference(&self, reference: &str) -> Result<Vec<MovementRecord>, LedgerStoreError>;

    /// Administrative removal. Returns the removed record.
    fn remove(&self, id: MovementId) -> Result<MovementRecord, LedgerStoreError>;
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn append(&self, draft: NewMovement) -> Result<MovementRecord, LedgerStoreError> {
        (**self).append(draft)
    }

    fn load_all(&self) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        (**self).load_all()
    }

    fn get(&self, id: MovementId) -> Result<Option<MovementRecord>, LedgerStoreError> {
        (**self).get(id)
    }

    fn find_by_reference(&self, reference: &str) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        (**self).find_by_reference(reference)
    }

    fn remove(&self, id: MovementId) -> Result<MovementRecord, LedgerStoreError> {
        (**self).remove(id)
    }
}
