//! The trade engine: lot ledger, FIFO allocator, and the trade state
//! machine with its side-effect handlers.

pub mod allocator;
pub mod ledger;
pub mod lifecycle;

pub use allocator::{allocate_fifo, allocate_from_lot};
pub use ledger::ReceiveSpec;
pub use lifecycle::{is_legal_transition, TradeEngine};

/// Inputs for bringing pre-existing stock into inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntakeRequest {
    pub product_id: String,
    pub vendor_id: String,
    pub lot_number: String,
    pub quantity: i64,
    /// Unit cost in cents; negative values are clamped to zero.
    pub unit_cost: i64,
    pub variety_id: Option<String>,
}
