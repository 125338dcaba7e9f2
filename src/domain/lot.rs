//! Inventory lot and batch types.

use crate::domain::{Money, PartyId, ProductId, TimeMs};
use serde::{Deserialize, Serialize};

/// A trackable slice of on-hand inventory backed by a batch.
///
/// Invariant at all times: `quantity_on_hand = quantity_allocated +
/// quantity_available`, all three non-negative. Lots are never deleted, only
/// drained to zero. Quantity columns are mutated exclusively through the
/// `engine::ledger` primitives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    pub id: String,
    pub batch_id: String,
    pub variety_id: Option<String>,
    pub quantity_on_hand: i64,
    pub quantity_allocated: i64,
    pub quantity_available: i64,
    pub last_movement_ms: TimeMs,
    pub created_ms: TimeMs,
}

impl Lot {
    /// Check the on-hand = allocated + available invariant.
    pub fn is_balanced(&self) -> bool {
        self.quantity_on_hand == self.quantity_allocated + self.quantity_available
            && self.quantity_on_hand >= 0
            && self.quantity_allocated >= 0
            && self.quantity_available >= 0
    }
}

/// The receipt record backing a lot, carrying vendor/cost provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub product_id: ProductId,
    pub vendor_id: PartyId,
    pub lot_number: String,
    pub received_ms: TimeMs,
    pub quantity_received: i64,
}

/// One entry in a batch's cost history.
///
/// The unit cost in effect at time T is the newest entry with
/// `effective_from_ms <= T`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchCost {
    pub id: String,
    pub batch_id: String,
    pub effective_from_ms: TimeMs,
    pub unit_cost: Money,
}

/// A (lot, quantity) pair produced by allocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub lot_id: String,
    pub quantity: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lot(on_hand: i64, allocated: i64, available: i64) -> Lot {
        Lot {
            id: "lot-1".to_string(),
            batch_id: "batch-1".to_string(),
            variety_id: None,
            quantity_on_hand: on_hand,
            quantity_allocated: allocated,
            quantity_available: available,
            last_movement_ms: TimeMs::new(0),
            created_ms: TimeMs::new(0),
        }
    }

    #[test]
    fn test_balanced_lot() {
        assert!(lot(10, 4, 6).is_balanced());
        assert!(lot(0, 0, 0).is_balanced());
    }

    #[test]
    fn test_unbalanced_lot() {
        assert!(!lot(10, 4, 5).is_balanced());
        assert!(!lot(-1, 0, -1).is_balanced());
    }

    #[test]
    fn test_allocation_serialization() {
        let alloc = Allocation {
            lot_id: "lot-9".to_string(),
            quantity: 20,
        };
        let json = serde_json::to_value(&alloc).unwrap();
        assert_eq!(json["lotId"], "lot-9");
        assert_eq!(json["quantity"], 20);
    }
}
