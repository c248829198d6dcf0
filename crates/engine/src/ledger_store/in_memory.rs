use std::sync::RwLock;

use maristock_movements::{MovementId, MovementRecord, NewMovement};

use super::r#trait::{LedgerStore, LedgerStoreError};

#[derive(Debug)]
struct Inner {
    /// Next id to assign. Never rewinds, so removed ids are not reused.
    next_id: u64,
    movements: Vec<MovementRecord>,
}

/// In-memory append-only ledger.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug)]
pub struct InMemoryLedgerStore {
    inner: RwLock<Inner>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InMemoryLedgerStore {
    fn default() -> Self {
        Self {
            inner: RwLock::new(Inner { next_id: 1, movements: Vec::new() }),
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    fn append(&self, draft: NewMovement) -> Result<MovementRecord, LedgerStoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerStoreError::Storage("lock poisoned".to_string()))?;

        let record = MovementRecord::new(MovementId(inner.next_id), draft);
        inner.next_id += 1;
        inner.movements.push(record.clone());
        Ok(record)
    }

    fn load_all(&self) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Storage("lock poisoned".to_string()))?;

        Ok(inner.movements.clone())
    }

    fn get(&self, id: MovementId) -> Result<Option<MovementRecord>, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Storage("lock poisoned".to_string()))?;

        Ok(inner.movements.iter().find(|m| m.id() == id).cloned())
    }

    fn find_by_reference(&self, reference: &str) -> Result<Vec<MovementRecord>, LedgerStoreError> {
        let inner = self
            .inner
            .read()
            .map_err(|_| LedgerStoreError::Storage("lock poisoned".to_string()))?;

        Ok(inner
            .movements
            .iter()
            .filter(|m| m.reference_document() == Some(reference))
            .cloned()
            .collect())
    }

    fn remove(&self, id: MovementId) -> Result<MovementRecord, LedgerStoreError> {
        let mut inner = self
            .inner
            .write()
            .map_err(|_| LedgerStoreError::Storage("lock poisoned".to_string()))?;

        let position = inner
            .movements
            .iter()
            .position(|m| m.id() == id)
            .ok_or(LedgerStoreError::NotFound(id))?;
        Ok(inner.movements.remove(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use maristock_core::{ProductId, Quantity, UserId, WarehouseId};
    use rust_decimal_macros::dec;

    fn draft(reference: Option<&str>) -> NewMovement {
        NewMovement::receipt(
            ProductId::new(),
            WarehouseId::new(),
            Quantity::new(dec!(10)).unwrap(),
            Utc::now(),
            reference.map(str::to_string),
            UserId::new(),
        )
        .unwrap()
    }

    #[test]
    fn assigns_monotonic_ids() {
        let store = InMemoryLedgerStore::new();
        let first = store.append(draft(None)).unwrap();
        let second = store.append(draft(None)).unwrap();

        assert_eq!(first.id(), MovementId(1));
        assert_eq!(second.id(), MovementId(2));
        assert_eq!(store.load_all().unwrap().len(), 2);
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let store = InMemoryLedgerStore::new();
        store.append(draft(None)).unwrap();
        let second = store.append(draft(None)).unwrap();

        store.remove(second.id()).unwrap();
        let third = store.append(draft(None)).unwrap();

        assert_eq!(third.id(), MovementId(3));
        assert!(store.get(second.id()).unwrap().is_none());
    }

    #[test]
    fn finds_movements_by_reference_document() {
        let store = InMemoryLedgerStore::new();
        store.append(draft(Some("BL-7001"))).unwrap();
        store.append(draft(None)).unwrap();
        store.append(draft(Some("BL-7001"))).unwrap();

        let found = store.find_by_reference("BL-7001").unwrap();
        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|m| m.reference_document() == Some("BL-7001")));
    }

    #[test]
    fn remove_of_unknown_id_is_an_error() {
        let store = InMemoryLedgerStore::new();
        assert!(matches!(
            store.remove(MovementId(42)),
            Err(LedgerStoreError::NotFound(MovementId(42)))
        ));
    }
}
