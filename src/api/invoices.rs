use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::AppState;
use crate::domain::InvoiceKind;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicesQuery {
    pub kind: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDto {
    pub id: String,
    pub kind: String,
    pub counterparty_id: String,
    pub trade_id: String,
    pub invoice_number: String,
    pub invoice_date_ms: i64,
    pub due_date_ms: i64,
    pub amount_cents: i64,
    pub balance_remaining_cents: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoicesResponse {
    pub invoices: Vec<InvoiceDto>,
}

pub async fn list_invoices(
    State(state): State<AppState>,
    Query(params): Query<InvoicesQuery>,
) -> Result<Json<InvoicesResponse>, AppError> {
    let kind = match params.kind.as_deref() {
        Some("") | None => None,
        Some(k) => Some(InvoiceKind::from_str(k).map_err(AppError::BadRequest)?),
    };

    let invoices = state.repo.list_invoices(kind).await?;
    Ok(Json(InvoicesResponse {
        invoices: invoices
            .into_iter()
            .map(|inv| InvoiceDto {
                id: inv.id,
                kind: inv.kind.as_str().to_string(),
                counterparty_id: inv.counterparty_id.as_str().to_string(),
                trade_id: inv.trade_id,
                invoice_number: inv.invoice_number,
                invoice_date_ms: inv.invoice_date_ms.as_i64(),
                due_date_ms: inv.due_date_ms.as_i64(),
                amount_cents: inv.amount.as_cents(),
                balance_remaining_cents: inv.balance_remaining.as_cents(),
            })
            .collect(),
    }))
}
