//! Event log append/list operations.
//!
//! The event log is append-only: rows are never updated or deleted.

use crate::domain::{EventPayload, TimeMs, TradeEvent};
use crate::error::EngineError;
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use super::Repository;

/// Append one event to a trade's log.
pub async fn append(
    conn: &mut SqliteConnection,
    trade_id: &str,
    payload: EventPayload,
    now: TimeMs,
) -> Result<TradeEvent, EngineError> {
    let event = TradeEvent {
        id: Uuid::new_v4().to_string(),
        trade_id: trade_id.to_string(),
        payload,
        created_ms: now,
    };
    let data = event.payload.to_data()?.to_string();

    sqlx::query(
        r#"
        INSERT INTO trade_events (id, trade_id, event_type, data, created_ms)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&event.id)
    .bind(&event.trade_id)
    .bind(event.event_type())
    .bind(data)
    .bind(event.created_ms.as_i64())
    .execute(&mut *conn)
    .await?;

    Ok(event)
}

impl Repository {
    /// List a trade's events in chronological order.
    pub async fn list_events(&self, trade_id: &str) -> Result<Vec<TradeEvent>, EngineError> {
        let rows = sqlx::query(
            r#"
            SELECT id, trade_id, event_type, data, created_ms
            FROM trade_events
            WHERE trade_id = ?
            ORDER BY created_ms ASC, id ASC
            "#,
        )
        .bind(trade_id)
        .fetch_all(self.pool())
        .await?;

        let mut events = Vec::with_capacity(rows.len());
        for row in rows {
            let event_type: String = row.get("event_type");
            let data: String = row.get("data");
            events.push(TradeEvent {
                id: row.get("id"),
                trade_id: row.get("trade_id"),
                payload: EventPayload::from_parts(&event_type, &data)?,
                created_ms: TimeMs::new(row.get("created_ms")),
            });
        }
        Ok(events)
    }
}
