//! Trade and line-item database operations.

use crate::domain::{Money, PartyId, ProductId, TimeMs, Trade, TradeItem, TradeStatus};
use crate::error::EngineError;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;
use std::str::FromStr;

use super::Repository;

fn trade_from_row(row: &SqliteRow) -> Result<Trade, EngineError> {
    let direction: String = row.get("direction");
    let status: String = row.get("status");
    Ok(Trade {
        id: row.get("id"),
        direction: FromStr::from_str(&direction).map_err(EngineError::Internal)?,
        source_id: PartyId::new(row.get("source_id")),
        target_id: PartyId::new(row.get("target_id")),
        status: FromStr::from_str(&status).map_err(EngineError::Internal)?,
        depart_at_ms: row.get::<Option<i64>, _>("depart_at_ms").map(TimeMs::new),
        arrive_at_ms: row.get::<Option<i64>, _>("arrive_at_ms").map(TimeMs::new),
        created_ms: TimeMs::new(row.get("created_ms")),
        items: Vec::new(),
    })
}

fn item_from_row(row: &SqliteRow) -> TradeItem {
    TradeItem {
        id: row.get("id"),
        trade_id: row.get("trade_id"),
        product_id: ProductId::new(row.get("product_id")),
        variety_id: row.get("variety_id"),
        quantity: row.get("quantity"),
        unit_price: Money::from_cents(row.get("unit_price")),
        lot_id: row.get("lot_id"),
        created_ms: TimeMs::new(row.get("created_ms")),
    }
}

/// Insert a trade row (without items).
pub async fn insert_trade(conn: &mut SqliteConnection, trade: &Trade) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO trades (id, direction, source_id, target_id, status, depart_at_ms, arrive_at_ms, created_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&trade.id)
    .bind(trade.direction.as_str())
    .bind(trade.source_id.as_str())
    .bind(trade.target_id.as_str())
    .bind(trade.status.as_str())
    .bind(trade.depart_at_ms.map(|t| t.as_i64()))
    .bind(trade.arrive_at_ms.map(|t| t.as_i64()))
    .bind(trade.created_ms.as_i64())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Insert a line item.
pub async fn insert_item(conn: &mut SqliteConnection, item: &TradeItem) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO trade_items (id, trade_id, product_id, variety_id, quantity, unit_price, lot_id, created_ms)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&item.id)
    .bind(&item.trade_id)
    .bind(item.product_id.as_str())
    .bind(item.variety_id.as_deref())
    .bind(item.quantity)
    .bind(item.unit_price.as_cents())
    .bind(item.lot_id.as_deref())
    .bind(item.created_ms.as_i64())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// Fetch a trade with its items, or None.
pub async fn fetch_trade(
    conn: &mut SqliteConnection,
    trade_id: &str,
) -> Result<Option<Trade>, EngineError> {
    let row = sqlx::query("SELECT * FROM trades WHERE id = ?")
        .bind(trade_id)
        .fetch_optional(&mut *conn)
        .await?;

    let Some(row) = row else { return Ok(None) };
    let mut trade = trade_from_row(&row)?;
    trade.items = fetch_items(conn, trade_id).await?;
    Ok(Some(trade))
}

/// Fetch the line items of a trade in insertion order.
pub async fn fetch_items(
    conn: &mut SqliteConnection,
    trade_id: &str,
) -> Result<Vec<TradeItem>, EngineError> {
    let rows = sqlx::query(
        "SELECT * FROM trade_items WHERE trade_id = ? ORDER BY created_ms ASC, id ASC",
    )
    .bind(trade_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.iter().map(item_from_row).collect())
}

/// Pin a line item to a lot and rewrite its quantity to that lot's share.
pub async fn update_item_allocation(
    conn: &mut SqliteConnection,
    item_id: &str,
    lot_id: &str,
    quantity: i64,
) -> Result<(), EngineError> {
    sqlx::query("UPDATE trade_items SET lot_id = ?, quantity = ? WHERE id = ?")
        .bind(lot_id)
        .bind(quantity)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Link a line item to a lot without changing its quantity.
pub async fn update_item_lot(
    conn: &mut SqliteConnection,
    item_id: &str,
    lot_id: &str,
) -> Result<(), EngineError> {
    sqlx::query("UPDATE trade_items SET lot_id = ? WHERE id = ?")
        .bind(lot_id)
        .bind(item_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Compare-and-swap the trade status.
///
/// Returns false when the trade's status no longer matches `expected`, which
/// means a concurrent transition won; the caller must treat that as a stale
/// request.
pub async fn update_status_cas(
    conn: &mut SqliteConnection,
    trade_id: &str,
    expected: TradeStatus,
    new_status: TradeStatus,
    depart_at_ms: Option<TimeMs>,
    arrive_at_ms: Option<TimeMs>,
) -> Result<bool, EngineError> {
    let result = sqlx::query(
        r#"
        UPDATE trades
        SET status = ?, depart_at_ms = ?, arrive_at_ms = ?
        WHERE id = ? AND status = ?
        "#,
    )
    .bind(new_status.as_str())
    .bind(depart_at_ms.map(|t| t.as_i64()))
    .bind(arrive_at_ms.map(|t| t.as_i64()))
    .bind(trade_id)
    .bind(expected.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

impl Repository {
    /// Get a single trade with items.
    pub async fn get_trade(&self, trade_id: &str) -> Result<Option<Trade>, EngineError> {
        let mut conn = self.pool().acquire().await?;
        fetch_trade(&mut conn, trade_id).await
    }

    /// List all trades, newest first, with items.
    pub async fn list_trades(&self) -> Result<Vec<Trade>, EngineError> {
        let trade_rows = sqlx::query("SELECT * FROM trades ORDER BY created_ms DESC, id DESC")
            .fetch_all(self.pool())
            .await?;

        let item_rows =
            sqlx::query("SELECT * FROM trade_items ORDER BY created_ms ASC, id ASC")
                .fetch_all(self.pool())
                .await?;

        let mut items_by_trade: HashMap<String, Vec<TradeItem>> = HashMap::new();
        for row in &item_rows {
            let item = item_from_row(row);
            items_by_trade
                .entry(item.trade_id.clone())
                .or_default()
                .push(item);
        }

        let mut trades = Vec::with_capacity(trade_rows.len());
        for row in &trade_rows {
            let mut trade = trade_from_row(row)?;
            trade.items = items_by_trade.remove(&trade.id).unwrap_or_default();
            trades.push(trade);
        }
        Ok(trades)
    }
}
