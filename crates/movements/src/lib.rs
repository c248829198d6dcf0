//! Stock movement domain module.
//!
//! This crate contains the business rules for the movement ledger's write
//! side, implemented purely as deterministic domain logic (no IO, no HTTP,
//! no storage): the three movement kinds, draft validation, the immutable
//! persisted record, and the mapping from a record to its per-warehouse
//! stock effects.

pub mod movement;

pub use movement::{
    MovementId, MovementKind, MovementRecord, MovementRoute, NewMovement, StockDelta, StockEffect,
};
