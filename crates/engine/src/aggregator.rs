//! Pure aggregation of movement facts into per-key stock totals.
//!
//! This is the reference computation the materialized table must agree
//! with: `verify()` compares against it and `rebuild()` writes its output
//! wholesale. No IO happens here.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use maristock_core::Quantity;
use maristock_movements::{MovementRecord, StockDelta};

use crate::stock_store::StockKey;

/// Aggregated totals for one (product, warehouse) key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StockTotals {
    /// The floored quantity the materialized table carries.
    pub available: Quantity,
    /// The true arithmetic sum, for audit/export consumers. May be negative
    /// when issues overdraw a key.
    pub signed: Decimal,
}

/// Fold a set of movements into per-key totals.
///
/// Movements are replayed in ledger-id order and every decrement saturates
/// at zero — the same arithmetic the incremental path performs — so a
/// rebuild reproduces exactly what incremental maintenance would have left
/// behind. The `signed` total is a plain commutative sum and does not
/// depend on the ordering.
///
/// Every key a movement ever touched gets an entry, including keys whose
/// total floors to zero: stocked-out rows must survive a rebuild.
pub fn aggregate(movements: &[MovementRecord]) -> BTreeMap<StockKey, StockTotals> {
    let mut ordered: Vec<&MovementRecord> = movements.iter().collect();
    ordered.sort_by_key(|m| m.id());

    let mut totals: BTreeMap<StockKey, StockTotals> = BTreeMap::new();
    for movement in ordered {
        for effect in movement.effects() {
            let key = StockKey {
                product_id: movement.product_id(),
                warehouse_id: effect.warehouse_id,
            };
            let entry = totals.entry(key).or_default();
            match effect.delta {
                StockDelta::Increase(quantity) => {
                    entry.available = entry.available + quantity;
                    entry.signed += quantity.value();
                }
                StockDelta::Decrease(quantity) => {
                    entry.available = entry.available.saturating_sub(quantity);
                    entry.signed -= quantity.value();
                }
            }
        }
    }

    totals
}
