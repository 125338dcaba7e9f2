//! Repository layer for database operations.
//!
//! This module provides the `Repository` struct for all database operations.
//! Methods are organized across submodules by domain:
//! - `trades.rs` - Trade and line-item operations
//! - `lots.rs` - Lot and batch reads
//! - `events.rs` - Event log append/list
//! - `invoices.rs` - Invoice operations
//!
//! Reads go through the pool; writes that belong to a state transition take
//! an explicit `&mut SqliteConnection` so they run inside the transition's
//! transaction.

pub mod events;
pub mod invoices;
pub mod lots;
pub mod trades;

use crate::domain::TimeMs;
use sqlx::sqlite::SqlitePool;
use sqlx::{Sqlite, Transaction};

/// Lot listing row joined with its batch's product and lot number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotStockRow {
    pub id: String,
    pub batch_id: String,
    pub product_id: String,
    pub lot_number: String,
    pub quantity_on_hand: i64,
    pub quantity_allocated: i64,
    pub quantity_available: i64,
    pub last_movement_ms: TimeMs,
}

/// Repository for database operations.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Repository { pool }
    }

    /// The underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction for a multi-statement unit of work.
    pub async fn begin(&self) -> Result<Transaction<'_, Sqlite>, sqlx::Error> {
        self.pool.begin().await
    }
}
