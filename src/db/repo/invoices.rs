//! Invoice database operations.

use crate::domain::{Invoice, InvoiceKind, Money, PartyId, TimeMs};
use crate::error::EngineError;
use sqlx::{Row, SqliteConnection};
use std::str::FromStr;

use super::Repository;

/// Count existing invoices of a kind; the invoice-number sequence is this
/// count plus one.
pub async fn count_kind(
    conn: &mut SqliteConnection,
    kind: InvoiceKind,
) -> Result<i64, EngineError> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM invoices WHERE kind = ?")
        .bind(kind.as_str())
        .fetch_one(&mut *conn)
        .await?;
    Ok(row.get("n"))
}

/// Insert an invoice.
pub async fn insert_invoice(
    conn: &mut SqliteConnection,
    invoice: &Invoice,
) -> Result<(), EngineError> {
    sqlx::query(
        r#"
        INSERT INTO invoices
        (id, kind, counterparty_id, trade_id, invoice_number, invoice_date_ms, due_date_ms, amount, balance_remaining)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&invoice.id)
    .bind(invoice.kind.as_str())
    .bind(invoice.counterparty_id.as_str())
    .bind(&invoice.trade_id)
    .bind(&invoice.invoice_number)
    .bind(invoice.invoice_date_ms.as_i64())
    .bind(invoice.due_date_ms.as_i64())
    .bind(invoice.amount.as_cents())
    .bind(invoice.balance_remaining.as_cents())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl Repository {
    /// List invoices, newest first, optionally filtered by kind.
    pub async fn list_invoices(
        &self,
        kind: Option<InvoiceKind>,
    ) -> Result<Vec<Invoice>, EngineError> {
        let rows = match kind {
            Some(kind) => {
                sqlx::query(
                    "SELECT * FROM invoices WHERE kind = ? ORDER BY invoice_date_ms DESC, id DESC",
                )
                .bind(kind.as_str())
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query("SELECT * FROM invoices ORDER BY invoice_date_ms DESC, id DESC")
                    .fetch_all(self.pool())
                    .await?
            }
        };

        let mut invoices = Vec::with_capacity(rows.len());
        for row in rows {
            let kind: String = row.get("kind");
            invoices.push(Invoice {
                id: row.get("id"),
                kind: InvoiceKind::from_str(&kind).map_err(EngineError::Internal)?,
                counterparty_id: PartyId::new(row.get("counterparty_id")),
                trade_id: row.get("trade_id"),
                invoice_number: row.get("invoice_number"),
                invoice_date_ms: TimeMs::new(row.get("invoice_date_ms")),
                due_date_ms: TimeMs::new(row.get("due_date_ms")),
                amount: Money::from_cents(row.get("amount")),
                balance_remaining: Money::from_cents(row.get("balance_remaining")),
            });
        }
        Ok(invoices)
    }
}
