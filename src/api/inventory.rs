use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::AppState;
use crate::engine::IntakeRequest;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeBody {
    pub product_id: String,
    pub vendor_id: String,
    pub lot_number: String,
    pub quantity: i64,
    pub unit_cost_cents: i64,
    #[serde(default)]
    pub variety_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeResponse {
    pub batch_id: String,
    pub lot_id: String,
    pub lot_number: String,
    pub quantity: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotsQuery {
    pub product_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotDto {
    pub id: String,
    pub batch_id: String,
    pub product_id: String,
    pub lot_number: String,
    pub quantity_on_hand: i64,
    pub quantity_allocated: i64,
    pub quantity_available: i64,
    pub last_movement_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotsResponse {
    pub lots: Vec<LotDto>,
}

pub async fn intake(
    State(state): State<AppState>,
    Json(body): Json<IntakeBody>,
) -> Result<(StatusCode, Json<IntakeResponse>), AppError> {
    let (batch, lot) = state
        .engine
        .intake(IntakeRequest {
            product_id: body.product_id,
            vendor_id: body.vendor_id,
            lot_number: body.lot_number,
            quantity: body.quantity,
            unit_cost: body.unit_cost_cents,
            variety_id: body.variety_id,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(IntakeResponse {
            batch_id: batch.id,
            lot_id: lot.id,
            lot_number: batch.lot_number,
            quantity: lot.quantity_on_hand,
        }),
    ))
}

pub async fn list_lots(
    State(state): State<AppState>,
    Query(params): Query<LotsQuery>,
) -> Result<Json<LotsResponse>, AppError> {
    let product_id = match params.product_id.as_deref() {
        Some("") | None => None,
        Some(p) => Some(p),
    };

    let rows = state.repo.list_lots(product_id).await?;
    Ok(Json(LotsResponse {
        lots: rows
            .into_iter()
            .map(|row| LotDto {
                id: row.id,
                batch_id: row.batch_id,
                product_id: row.product_id,
                lot_number: row.lot_number,
                quantity_on_hand: row.quantity_on_hand,
                quantity_allocated: row.quantity_allocated,
                quantity_available: row.quantity_available,
                last_movement_ms: row.last_movement_ms.as_i64(),
            })
            .collect(),
    }))
}
