use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use maristock_core::{DomainError, DomainResult, ProductId, Quantity, UserId, WarehouseId};

/// Position of a movement in the append-only ledger.
///
/// Assigned monotonically by the ledger store at append time, never reused.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MovementId(pub u64);

impl core::fmt::Display for MovementId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// The three inventory event kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Receipt,
    Issue,
    Transfer,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Receipt => "receipt",
            MovementKind::Issue => "issue",
            MovementKind::Transfer => "transfer",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind plus the warehouse endpoints that kind requires.
///
/// A receipt without a destination or an issue without a source is
/// unrepresentable; the per-kind endpoint rules of the data model live in
/// the type rather than in runtime checks.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum MovementRoute {
    /// Incoming goods into a warehouse.
    Receipt { destination_warehouse_id: WarehouseId },
    /// Outgoing goods from a warehouse (e.g. delivery to a client).
    Issue { source_warehouse_id: WarehouseId },
    /// Quantity moved from one warehouse to another.
    Transfer {
        source_warehouse_id: WarehouseId,
        destination_warehouse_id: WarehouseId,
    },
}

impl MovementRoute {
    pub fn kind(&self) -> MovementKind {
        match self {
            MovementRoute::Receipt { .. } => MovementKind::Receipt,
            MovementRoute::Issue { .. } => MovementKind::Issue,
            MovementRoute::Transfer { .. } => MovementKind::Transfer,
        }
    }

    pub fn source_warehouse_id(&self) -> Option<WarehouseId> {
        match self {
            MovementRoute::Receipt { .. } => None,
            MovementRoute::Issue { source_warehouse_id }
            | MovementRoute::Transfer { source_warehouse_id, .. } => Some(*source_warehouse_id),
        }
    }

    pub fn destination_warehouse_id(&self) -> Option<WarehouseId> {
        match self {
            MovementRoute::Issue { .. } => None,
            MovementRoute::Receipt { destination_warehouse_id }
            | MovementRoute::Transfer { destination_warehouse_id, .. } => {
                Some(*destination_warehouse_id)
            }
        }
    }

    /// Build a route from the loose boundary shape (kind + optional endpoints).
    ///
    /// External callers submit `(kind, source?, destination?)`; this is where
    /// the per-kind endpoint rules are enforced for them. A stray endpoint is
    /// rejected rather than ignored so the ledger never records ambiguous
    /// facts.
    pub fn from_parts(
        kind: MovementKind,
        source_warehouse_id: Option<WarehouseId>,
        destination_warehouse_id: Option<WarehouseId>,
    ) -> DomainResult<Self> {
        match kind {
            MovementKind::Receipt => {
                if source_warehouse_id.is_some() {
                    return Err(DomainError::validation(
                        "a receipt does not take a source warehouse",
                    ));
                }
                let destination_warehouse_id = destination_warehouse_id.ok_or_else(|| {
                    DomainError::validation("a receipt requires a destination warehouse")
                })?;
                Ok(MovementRoute::Receipt { destination_warehouse_id })
            }
            MovementKind::Issue => {
                if destination_warehouse_id.is_some() {
                    return Err(DomainError::validation(
                        "an issue does not take a destination warehouse",
                    ));
                }
                let source_warehouse_id = source_warehouse_id.ok_or_else(|| {
                    DomainError::validation("an issue requires a source warehouse")
                })?;
                Ok(MovementRoute::Issue { source_warehouse_id })
            }
            MovementKind::Transfer => {
                let source_warehouse_id = source_warehouse_id.ok_or_else(|| {
                    DomainError::validation("a transfer requires a source warehouse")
                })?;
                let destination_warehouse_id = destination_warehouse_id.ok_or_else(|| {
                    DomainError::validation("a transfer requires a destination warehouse")
                })?;
                Ok(MovementRoute::Transfer { source_warehouse_id, destination_warehouse_id })
            }
        }
    }
}

/// A validated movement draft, ready to be appended to the ledger.
///
/// Construction enforces the validation contract; an instance cannot exist
/// in an invalid state. The ledger store assigns the id and turns the draft
/// into a [`MovementRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMovement {
    #[serde(flatten)]
    route: MovementRoute,
    product_id: ProductId,
    quantity: Quantity,
    /// When the physical event happened (not when it was recorded).
    occurred_at: DateTime<Utc>,
    /// Free-text correlation id (delivery note, bill of lading, ...).
    reference_document: Option<String>,
    created_by: UserId,
}

impl NewMovement {
    /// Validate and build a draft.
    ///
    /// Rejects a zero quantity (negative quantities are unrepresentable) and
    /// a transfer whose source and destination are the same warehouse.
    /// Deliberately does NOT check current stock levels: the ledger records
    /// physical events, it is not a gatekeeper. Overdraft is reported at
    /// apply time and floored, not blocked.
    pub fn new(
        route: MovementRoute,
        product_id: ProductId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
        reference_document: Option<String>,
        created_by: UserId,
    ) -> DomainResult<Self> {
        if quantity.is_zero() {
            return Err(DomainError::validation("quantity must be greater than zero"));
        }
        if let MovementRoute::Transfer { source_warehouse_id, destination_warehouse_id } = route {
            if source_warehouse_id == destination_warehouse_id {
                return Err(DomainError::validation(
                    "a transfer requires two distinct warehouses",
                ));
            }
        }
        Ok(Self {
            route,
            product_id,
            quantity,
            occurred_at,
            reference_document,
            created_by,
        })
    }

    pub fn receipt(
        product_id: ProductId,
        destination_warehouse_id: WarehouseId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
        reference_document: Option<String>,
        created_by: UserId,
    ) -> DomainResult<Self> {
        Self::new(
            MovementRoute::Receipt { destination_warehouse_id },
            product_id,
            quantity,
            occurred_at,
            reference_document,
            created_by,
        )
    }

    pub fn issue(
        product_id: ProductId,
        source_warehouse_id: WarehouseId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
        reference_document: Option<String>,
        created_by: UserId,
    ) -> DomainResult<Self> {
        Self::new(
            MovementRoute::Issue { source_warehouse_id },
            product_id,
            quantity,
            occurred_at,
            reference_document,
            created_by,
        )
    }

    pub fn transfer(
        product_id: ProductId,
        source_warehouse_id: WarehouseId,
        destination_warehouse_id: WarehouseId,
        quantity: Quantity,
        occurred_at: DateTime<Utc>,
        reference_document: Option<String>,
        created_by: UserId,
    ) -> DomainResult<Self> {
        Self::new(
            MovementRoute::Transfer { source_warehouse_id, destination_warehouse_id },
            product_id,
            quantity,
            occurred_at,
            reference_document,
            created_by,
        )
    }

    pub fn kind(&self) -> MovementKind {
        self.route.kind()
    }

    pub fn route(&self) -> MovementRoute {
        self.route
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn reference_document(&self) -> Option<&str> {
        self.reference_document.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }
}

/// An immutable movement fact in the ledger.
///
/// Once persisted, a record is never mutated or deleted; corrections are
/// made by appending a compensating movement. The only bypass is the
/// operator-initiated administrative removal, which forces a rebuild of the
/// derived stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementRecord {
    id: MovementId,
    #[serde(flatten)]
    route: MovementRoute,
    product_id: ProductId,
    quantity: Quantity,
    occurred_at: DateTime<Utc>,
    reference_document: Option<String>,
    created_by: UserId,
}

impl MovementRecord {
    /// Seal a draft with its ledger-assigned id.
    pub fn new(id: MovementId, draft: NewMovement) -> Self {
        let NewMovement {
            route,
            product_id,
            quantity,
            occurred_at,
            reference_document,
            created_by,
        } = draft;
        Self {
            id,
            route,
            product_id,
            quantity,
            occurred_at,
            reference_document,
            created_by,
        }
    }

    pub fn id(&self) -> MovementId {
        self.id
    }

    pub fn kind(&self) -> MovementKind {
        self.route.kind()
    }

    pub fn route(&self) -> MovementRoute {
        self.route
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn source_warehouse_id(&self) -> Option<WarehouseId> {
        self.route.source_warehouse_id()
    }

    pub fn destination_warehouse_id(&self) -> Option<WarehouseId> {
        self.route.destination_warehouse_id()
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn reference_document(&self) -> Option<&str> {
        self.reference_document.as_deref()
    }

    pub fn created_by(&self) -> UserId {
        self.created_by
    }

    /// The per-warehouse stock updates this movement implies.
    ///
    /// Receipt: one increase at the destination. Issue: one decrease at the
    /// source. Transfer: a decrease at the source and an increase at the
    /// destination, which the reconciliation engine must land atomically.
    pub fn effects(&self) -> Vec<StockEffect> {
        match self.route {
            MovementRoute::Receipt { destination_warehouse_id } => vec![StockEffect {
                warehouse_id: destination_warehouse_id,
                delta: StockDelta::Increase(self.quantity),
            }],
            MovementRoute::Issue { source_warehouse_id } => vec![StockEffect {
                warehouse_id: source_warehouse_id,
                delta: StockDelta::Decrease(self.quantity),
            }],
            MovementRoute::Transfer { source_warehouse_id, destination_warehouse_id } => vec![
                StockEffect {
                    warehouse_id: source_warehouse_id,
                    delta: StockDelta::Decrease(self.quantity),
                },
                StockEffect {
                    warehouse_id: destination_warehouse_id,
                    delta: StockDelta::Increase(self.quantity),
                },
            ],
        }
    }
}

/// One stock update implied by a movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StockEffect {
    pub warehouse_id: WarehouseId,
    pub delta: StockDelta,
}

/// Direction and magnitude of a stock update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockDelta {
    Increase(Quantity),
    Decrease(Quantity),
}

#[cfg(test)]
mod tests {
    use super::*;
    use maristock_core::Quantity;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn qty(value: Decimal) -> Quantity {
        Quantity::new(value).unwrap()
    }

    fn draft_receipt(quantity: Decimal) -> DomainResult<NewMovement> {
        NewMovement::receipt(
            ProductId::new(),
            WarehouseId::new(),
            qty(quantity),
            Utc::now(),
            Some("BL-2024-001".to_string()),
            UserId::new(),
        )
    }

    #[test]
    fn receipt_requires_positive_quantity() {
        assert!(matches!(draft_receipt(dec!(0)), Err(DomainError::Validation(_))));
        assert!(draft_receipt(dec!(500.00)).is_ok());
    }

    #[test]
    fn transfer_rejects_same_warehouse() {
        let warehouse = WarehouseId::new();
        let result = NewMovement::transfer(
            ProductId::new(),
            warehouse,
            warehouse,
            qty(dec!(100)),
            Utc::now(),
            None,
            UserId::new(),
        );
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }

    #[test]
    fn from_parts_enforces_per_kind_endpoints() {
        let warehouse = WarehouseId::new();

        // Receipt without destination.
        assert!(MovementRoute::from_parts(MovementKind::Receipt, None, None).is_err());
        // Receipt with a stray source.
        assert!(
            MovementRoute::from_parts(MovementKind::Receipt, Some(warehouse), Some(warehouse))
                .is_err()
        );
        // Issue without source.
        assert!(MovementRoute::from_parts(MovementKind::Issue, None, Some(warehouse)).is_err());
        // Transfer missing either endpoint.
        assert!(MovementRoute::from_parts(MovementKind::Transfer, Some(warehouse), None).is_err());
        assert!(MovementRoute::from_parts(MovementKind::Transfer, None, Some(warehouse)).is_err());

        let route = MovementRoute::from_parts(MovementKind::Issue, Some(warehouse), None).unwrap();
        assert_eq!(route.kind(), MovementKind::Issue);
        assert_eq!(route.source_warehouse_id(), Some(warehouse));
        assert_eq!(route.destination_warehouse_id(), None);
    }

    #[test]
    fn receipt_effects_increase_destination() {
        let destination = WarehouseId::new();
        let draft = NewMovement::receipt(
            ProductId::new(),
            destination,
            qty(dec!(500.00)),
            Utc::now(),
            None,
            UserId::new(),
        )
        .unwrap();
        let record = MovementRecord::new(MovementId(1), draft);

        let effects = record.effects();
        assert_eq!(effects.len(), 1);
        assert_eq!(effects[0].warehouse_id, destination);
        assert_eq!(effects[0].delta, StockDelta::Increase(qty(dec!(500.00))));
    }

    #[test]
    fn transfer_effects_decrease_source_and_increase_destination() {
        let source = WarehouseId::new();
        let destination = WarehouseId::new();
        let draft = NewMovement::transfer(
            ProductId::new(),
            source,
            destination,
            qty(dec!(100)),
            Utc::now(),
            None,
            UserId::new(),
        )
        .unwrap();
        let record = MovementRecord::new(MovementId(7), draft);

        let effects = record.effects();
        assert_eq!(effects.len(), 2);
        assert_eq!(effects[0].warehouse_id, source);
        assert_eq!(effects[0].delta, StockDelta::Decrease(qty(dec!(100))));
        assert_eq!(effects[1].warehouse_id, destination);
        assert_eq!(effects[1].delta, StockDelta::Increase(qty(dec!(100))));
    }

    #[test]
    fn kinds_serialize_lowercase() {
        let draft = draft_receipt(dec!(10)).unwrap();
        let record = MovementRecord::new(MovementId(1), draft);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["kind"], "receipt");
        assert_eq!(json["id"], 1);
        assert!(json.get("destination_warehouse_id").is_some());
        assert!(json.get("source_warehouse_id").is_none());

        let back: MovementRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    proptest! {
        #[test]
        fn issue_effect_carries_full_quantity(centitons in 1i64..1_000_000) {
            let quantity = qty(Decimal::new(centitons, 2));
            let source = WarehouseId::new();
            let draft = NewMovement::issue(
                ProductId::new(),
                source,
                quantity,
                Utc::now(),
                None,
                UserId::new(),
            ).unwrap();
            let record = MovementRecord::new(MovementId(1), draft);

            let effects = record.effects();
            prop_assert_eq!(effects.len(), 1);
            prop_assert_eq!(effects[0].delta, StockDelta::Decrease(quantity));
        }

        #[test]
        fn transfer_effects_conserve_signed_total(centitons in 1i64..1_000_000) {
            let quantity = qty(Decimal::new(centitons, 2));
            let draft = NewMovement::transfer(
                ProductId::new(),
                WarehouseId::new(),
                WarehouseId::new(),
                quantity,
                Utc::now(),
                None,
                UserId::new(),
            ).unwrap();
            let record = MovementRecord::new(MovementId(1), draft);

            let signed: Decimal = record
                .effects()
                .iter()
                .map(|e| match e.delta {
                    StockDelta::Increase(q) => q.value(),
                    StockDelta::Decrease(q) => -q.value(),
                })
                .sum();
            prop_assert_eq!(signed, Decimal::ZERO);
        }
    }
}
