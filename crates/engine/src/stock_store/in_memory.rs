use std::collections::BTreeMap;
use std::sync::RwLock;

use maristock_core::WarehouseId;

use super::r#trait::{StockEntry, StockKey, StockStore, StockStoreError, StockWrite};

/// In-memory materialized stock table.
///
/// Intended for tests/dev. A `BTreeMap` keeps listings in key order.
#[derive(Debug, Default)]
pub struct InMemoryStockStore {
    entries: RwLock<BTreeMap<StockKey, StockEntry>>,
}

impl InMemoryStockStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StockStore for InMemoryStockStore {
    fn get(&self, key: &StockKey) -> Result<Option<StockEntry>, StockStoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        Ok(entries.get(key).cloned())
    }

    fn list(&self, warehouse_id: Option<WarehouseId>) -> Result<Vec<StockEntry>, StockStoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        Ok(entries
            .values()
            .filter(|e| warehouse_id.is_none_or(|w| e.key.warehouse_id == w))
            .cloned()
            .collect())
    }

    fn commit(&self, writes: Vec<StockWrite>) -> Result<(), StockStoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        // Check every expectation before mutating anything: the batch lands
        // whole or not at all.
        let mut found_versions = Vec::with_capacity(writes.len());
        for write in &writes {
            let found = entries.get(&write.key).map(|e| e.version).unwrap_or(0);
            if !write.expected_version.matches(found) {
                return Err(StockStoreError::VersionConflict {
                    key: write.key,
                    expected: write.expected_version,
                    found,
                });
            }
            found_versions.push(found);
        }

        for (write, found) in writes.into_iter().zip(found_versions) {
            entries.insert(
                write.key,
                StockEntry {
                    key: write.key,
                    quantity_available: write.quantity_available,
                    version: found + 1,
                },
            );
        }

        Ok(())
    }

    fn replace_all(&self, new_entries: Vec<StockEntry>) -> Result<(), StockStoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StockStoreError::Storage("lock poisoned".to_string()))?;

        *entries = new_entries.into_iter().map(|e| (e.key, e)).collect();
        Ok(())
    }
}
