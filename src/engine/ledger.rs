//! Lot Ledger: the only code path that mutates lot quantity columns.
//!
//! Every primitive is a single conditional UPDATE whose WHERE clause
//! re-checks the guard against the persisted row, so two concurrent
//! reservations can never both win quantity that together exceeds what the
//! lot has available. Callers thread the ambient transaction in as
//! `&mut SqliteConnection`; nothing here commits.

use crate::domain::{Batch, BatchCost, Lot, Money, PartyId, ProductId, TimeMs};
use crate::error::EngineError;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

/// Inputs for creating a batch + lot pair on receipt or intake.
#[derive(Debug, Clone)]
pub struct ReceiveSpec {
    pub product_id: ProductId,
    pub vendor_id: PartyId,
    pub lot_number: String,
    pub variety_id: Option<String>,
}

/// Earmark `qty` units of a lot: available -> allocated.
///
/// Fails with `InsufficientStock` when the lot's available quantity is below
/// `qty` at the moment the update executes.
pub async fn reserve(
    conn: &mut SqliteConnection,
    lot_id: &str,
    qty: i64,
    now: TimeMs,
) -> Result<(), EngineError> {
    let result = sqlx::query(
        r#"
        UPDATE lots
        SET quantity_allocated = quantity_allocated + ?1,
            quantity_available = quantity_available - ?1,
            last_movement_ms = ?2
        WHERE id = ?3 AND quantity_available >= ?1
        "#,
    )
    .bind(qty)
    .bind(now.as_i64())
    .bind(lot_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(guard_failure(conn, lot_id, || EngineError::InsufficientStock {
            scope: format!("lot {}", lot_id),
            requested: qty,
        })
        .await);
    }
    Ok(())
}

/// Remove `qty` earmarked units from a lot entirely: on-hand and allocated
/// both drop. Fails with `InsufficientAllocated` when the lot does not hold
/// that much allocated quantity.
pub async fn consume(
    conn: &mut SqliteConnection,
    lot_id: &str,
    qty: i64,
) -> Result<(), EngineError> {
    let result = sqlx::query(
        r#"
        UPDATE lots
        SET quantity_on_hand = quantity_on_hand - ?1,
            quantity_allocated = quantity_allocated - ?1
        WHERE id = ?2 AND quantity_on_hand >= ?1 AND quantity_allocated >= ?1
        "#,
    )
    .bind(qty)
    .bind(lot_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(guard_failure(conn, lot_id, || {
            EngineError::InsufficientAllocated {
                lot_id: lot_id.to_string(),
                requested: qty,
            }
        })
        .await);
    }
    Ok(())
}

/// Undo a reservation: allocated -> available. Inverse of `reserve`.
pub async fn release(
    conn: &mut SqliteConnection,
    lot_id: &str,
    qty: i64,
    now: TimeMs,
) -> Result<(), EngineError> {
    let result = sqlx::query(
        r#"
        UPDATE lots
        SET quantity_allocated = quantity_allocated - ?1,
            quantity_available = quantity_available + ?1,
            last_movement_ms = ?2
        WHERE id = ?3 AND quantity_allocated >= ?1
        "#,
    )
    .bind(qty)
    .bind(now.as_i64())
    .bind(lot_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(guard_failure(conn, lot_id, || {
            EngineError::InsufficientAllocated {
                lot_id: lot_id.to_string(),
                requested: qty,
            }
        })
        .await);
    }
    Ok(())
}

/// Create a batch with one cost-history entry and a fully-available lot.
pub async fn receive(
    conn: &mut SqliteConnection,
    spec: &ReceiveSpec,
    qty: i64,
    unit_cost: Money,
    now: TimeMs,
) -> Result<(Batch, Lot), EngineError> {
    let batch = Batch {
        id: Uuid::new_v4().to_string(),
        product_id: spec.product_id.clone(),
        vendor_id: spec.vendor_id.clone(),
        lot_number: spec.lot_number.clone(),
        received_ms: now,
        quantity_received: qty,
    };
    sqlx::query(
        r#"
        INSERT INTO batches (id, product_id, vendor_id, lot_number, received_ms, quantity_received)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&batch.id)
    .bind(batch.product_id.as_str())
    .bind(batch.vendor_id.as_str())
    .bind(&batch.lot_number)
    .bind(batch.received_ms.as_i64())
    .bind(batch.quantity_received)
    .execute(&mut *conn)
    .await?;

    let cost = BatchCost {
        id: Uuid::new_v4().to_string(),
        batch_id: batch.id.clone(),
        effective_from_ms: now,
        unit_cost,
    };
    sqlx::query(
        "INSERT INTO batch_costs (id, batch_id, effective_from_ms, unit_cost) VALUES (?, ?, ?, ?)",
    )
    .bind(&cost.id)
    .bind(&cost.batch_id)
    .bind(cost.effective_from_ms.as_i64())
    .bind(cost.unit_cost.as_cents())
    .execute(&mut *conn)
    .await?;

    let lot = Lot {
        id: Uuid::new_v4().to_string(),
        batch_id: batch.id.clone(),
        variety_id: spec.variety_id.clone(),
        quantity_on_hand: qty,
        quantity_allocated: 0,
        quantity_available: qty,
        last_movement_ms: now,
        created_ms: now,
    };
    sqlx::query(
        r#"
        INSERT INTO lots (id, batch_id, variety_id, quantity_on_hand, quantity_allocated, quantity_available, last_movement_ms, created_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&lot.id)
    .bind(&lot.batch_id)
    .bind(lot.variety_id.as_deref())
    .bind(lot.quantity_on_hand)
    .bind(lot.quantity_allocated)
    .bind(lot.quantity_available)
    .bind(lot.last_movement_ms.as_i64())
    .bind(lot.created_ms.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok((batch, lot))
}

/// Unit cost in effect for a batch at time `at`: the newest cost-history
/// entry with `effective_from_ms <= at`, or None if the batch has no
/// applicable entry.
pub async fn active_unit_cost(
    conn: &mut SqliteConnection,
    batch_id: &str,
    at: TimeMs,
) -> Result<Option<Money>, EngineError> {
    let row = sqlx::query(
        r#"
        SELECT unit_cost FROM batch_costs
        WHERE batch_id = ? AND effective_from_ms <= ?
        ORDER BY effective_from_ms DESC, id DESC
        LIMIT 1
        "#,
    )
    .bind(batch_id)
    .bind(at.as_i64())
    .fetch_optional(&mut *conn)
    .await?;

    Ok(row.map(|r| Money::from_cents(r.get("unit_cost"))))
}

/// A zero-rows conditional update is either a missing lot or a guard miss;
/// tell them apart for the caller.
async fn guard_failure<F>(conn: &mut SqliteConnection, lot_id: &str, shortfall: F) -> EngineError
where
    F: FnOnce() -> EngineError,
{
    let exists = sqlx::query("SELECT 1 FROM lots WHERE id = ?")
        .bind(lot_id)
        .fetch_optional(&mut *conn)
        .await;
    match exists {
        Ok(Some(_)) => shortfall(),
        Ok(None) => EngineError::NotFound(format!("lot {}", lot_id)),
        Err(e) => EngineError::Db(e),
    }
}
