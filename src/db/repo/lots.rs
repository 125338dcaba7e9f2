//! Lot and batch read operations.
//!
//! Quantity columns are never written here; every mutation goes through the
//! `engine::ledger` primitives.

use crate::domain::{Lot, TimeMs};
use crate::error::EngineError;
use sqlx::{Row, SqliteConnection};

use super::{LotStockRow, Repository};

/// Fetch a lot by id.
pub async fn fetch_lot(
    conn: &mut SqliteConnection,
    lot_id: &str,
) -> Result<Option<Lot>, EngineError> {
    let row = sqlx::query("SELECT * FROM lots WHERE id = ?")
        .bind(lot_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| Lot {
        id: row.get("id"),
        batch_id: row.get("batch_id"),
        variety_id: row.get("variety_id"),
        quantity_on_hand: row.get("quantity_on_hand"),
        quantity_allocated: row.get("quantity_allocated"),
        quantity_available: row.get("quantity_available"),
        last_movement_ms: TimeMs::new(row.get("last_movement_ms")),
        created_ms: TimeMs::new(row.get("created_ms")),
    }))
}

impl Repository {
    /// Get a single lot by id.
    pub async fn get_lot(&self, lot_id: &str) -> Result<Option<Lot>, EngineError> {
        let mut conn = self.pool().acquire().await?;
        fetch_lot(&mut conn, lot_id).await
    }

    /// List lots with their batch's product and lot number, oldest movement
    /// first (the same order the FIFO allocator walks them in), optionally
    /// filtered by product.
    pub async fn list_lots(
        &self,
        product_id: Option<&str>,
    ) -> Result<Vec<LotStockRow>, EngineError> {
        let base = r#"
            SELECT l.id, l.batch_id, b.product_id, b.lot_number,
                   l.quantity_on_hand, l.quantity_allocated, l.quantity_available,
                   l.last_movement_ms
            FROM lots l
            JOIN batches b ON b.id = l.batch_id
        "#;

        let rows = match product_id {
            Some(product_id) => {
                sqlx::query(&format!(
                    "{} WHERE b.product_id = ? ORDER BY l.last_movement_ms ASC, l.created_ms ASC, l.id ASC",
                    base
                ))
                .bind(product_id)
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "{} ORDER BY l.last_movement_ms ASC, l.created_ms ASC, l.id ASC",
                    base
                ))
                .fetch_all(self.pool())
                .await?
            }
        };

        Ok(rows
            .iter()
            .map(|row| LotStockRow {
                id: row.get("id"),
                batch_id: row.get("batch_id"),
                product_id: row.get("product_id"),
                lot_number: row.get("lot_number"),
                quantity_on_hand: row.get("quantity_on_hand"),
                quantity_allocated: row.get("quantity_allocated"),
                quantity_available: row.get("quantity_available"),
                last_movement_ms: TimeMs::new(row.get("last_movement_ms")),
            })
            .collect())
    }
}
