//! Domain types for the inter-business trade engine.
//!
//! This module provides:
//! - Primitives: TimeMs, Money (integer cents), ProductId, PartyId
//! - Trade, TradeItem and the direction/status enums
//! - Lot, Batch and cost-history types
//! - Invoice types and invoice-number formatting
//! - The typed, append-only trade event log

pub mod event;
pub mod invoice;
pub mod lot;
pub mod primitives;
pub mod trade;

pub use event::{
    AllocatedPayload, CreatedPayload, DepartedItemPayload, EventDecodeError, EventPayload,
    InvoicePayload, ReceivedItemPayload, StatusPayload, TradeEvent,
};
pub use invoice::{invoice_number, Invoice, InvoiceKind};
pub use lot::{Allocation, Batch, BatchCost, Lot};
pub use primitives::{Money, PartyId, ProductId, TimeMs};
pub use trade::{NewTrade, NewTradeItem, Trade, TradeDirection, TradeItem, TradeStatus};
