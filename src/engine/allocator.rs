//! FIFO inventory allocator.
//!
//! Selects lots oldest-movement-first and reserves partial quantities across
//! as many lots as needed. Reservations made here are only durable if the
//! caller commits the enclosing transaction; on a shortfall the error
//! propagates, the transaction rolls back, and no partial reservation is
//! ever visible.

use crate::domain::{Allocation, ProductId, TimeMs};
use crate::engine::ledger;
use crate::error::EngineError;
use sqlx::{Row, SqliteConnection};

/// Reserve `quantity` units of a product across one or more lots,
/// oldest-moved and oldest-created lots first (lot id as the final
/// tie-break, for determinism).
///
/// Returns the ordered list of (lot, quantity) pairs reserved. Fails with
/// `InsufficientStock` when the product's total available quantity cannot
/// cover the request.
pub async fn allocate_fifo(
    conn: &mut SqliteConnection,
    product_id: &ProductId,
    quantity: i64,
    now: TimeMs,
) -> Result<Vec<Allocation>, EngineError> {
    let candidates = sqlx::query(
        r#"
        SELECT l.id, l.quantity_available
        FROM lots l
        JOIN batches b ON b.id = l.batch_id
        WHERE b.product_id = ? AND l.quantity_available > 0
        ORDER BY l.last_movement_ms ASC, l.created_ms ASC, l.id ASC
        "#,
    )
    .bind(product_id.as_str())
    .fetch_all(&mut *conn)
    .await?;

    let mut remaining = quantity;
    let mut allocations = Vec::new();

    for row in &candidates {
        if remaining == 0 {
            break;
        }
        let lot_id: String = row.get("id");
        let available: i64 = row.get("quantity_available");
        let take = remaining.min(available);

        ledger::reserve(conn, &lot_id, take, now).await?;
        allocations.push(Allocation {
            lot_id,
            quantity: take,
        });
        remaining -= take;
    }

    if remaining > 0 {
        return Err(EngineError::InsufficientStock {
            scope: format!("product {}", product_id),
            requested: quantity,
        });
    }

    Ok(allocations)
}

/// Reserve the full quantity from one specific lot (item pinned to a lot).
pub async fn allocate_from_lot(
    conn: &mut SqliteConnection,
    lot_id: &str,
    quantity: i64,
    now: TimeMs,
) -> Result<Allocation, EngineError> {
    ledger::reserve(conn, lot_id, quantity, now).await?;
    Ok(Allocation {
        lot_id: lot_id.to_string(),
        quantity,
    })
}
