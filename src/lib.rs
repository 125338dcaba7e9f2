pub mod api;
pub mod config;
pub mod db;
pub mod domain;
pub mod engine;
pub mod error;

pub use config::Config;
pub use db::{init_db, Repository};
pub use domain::{
    Allocation, Batch, Invoice, InvoiceKind, Lot, Money, NewTrade, NewTradeItem, PartyId,
    ProductId, TimeMs, Trade, TradeDirection, TradeEvent, TradeItem, TradeStatus,
};
pub use engine::{IntakeRequest, TradeEngine};
pub use error::{AppError, EngineError};
