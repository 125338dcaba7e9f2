use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::AppState;
use crate::domain::{NewTrade, Trade, TradeEvent, TradeItem, TradeStatus};
use crate::error::{AppError, EngineError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeItemDto {
    pub id: String,
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variety_id: Option<String>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub id: String,
    pub direction: String,
    pub source_id: String,
    pub target_id: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub depart_at_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrive_at_ms: Option<i64>,
    pub created_ms: i64,
    pub total_cents: i64,
    pub items: Vec<TradeItemDto>,
}

impl From<TradeItem> for TradeItemDto {
    fn from(item: TradeItem) -> Self {
        TradeItemDto {
            id: item.id,
            product_id: item.product_id.as_str().to_string(),
            variety_id: item.variety_id,
            quantity: item.quantity,
            unit_price_cents: item.unit_price.as_cents(),
            lot_id: item.lot_id,
        }
    }
}

impl From<Trade> for TradeDto {
    fn from(trade: Trade) -> Self {
        let total_cents = trade.total_amount().as_cents();
        TradeDto {
            id: trade.id,
            direction: trade.direction.to_string(),
            source_id: trade.source_id.as_str().to_string(),
            target_id: trade.target_id.as_str().to_string(),
            status: trade.status.to_string(),
            depart_at_ms: trade.depart_at_ms.map(|t| t.as_i64()),
            arrive_at_ms: trade.arrive_at_ms.map(|t| t.as_i64()),
            created_ms: trade.created_ms.as_i64(),
            total_cents,
            items: trade.items.into_iter().map(TradeItemDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeDto>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEventDto {
    pub id: String,
    pub event_type: String,
    pub data: serde_json::Value,
    pub created_ms: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeEventsResponse {
    pub events: Vec<TradeEventDto>,
}

impl TradeEventDto {
    fn try_from_event(event: TradeEvent) -> Result<Self, EngineError> {
        let data = event.payload.to_data()?;
        let event_type = event.event_type();
        Ok(TradeEventDto {
            id: event.id,
            event_type,
            data,
            created_ms: event.created_ms.as_i64(),
        })
    }
}

pub async fn create_trade(
    State(state): State<AppState>,
    Json(input): Json<NewTrade>,
) -> Result<(StatusCode, Json<TradeDto>), AppError> {
    let trade = state.engine.create_trade(input).await?;
    Ok((StatusCode::CREATED, Json(trade.into())))
}

pub async fn list_trades(
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    let trades = state.repo.list_trades().await?;
    Ok(Json(TradesResponse {
        trades: trades.into_iter().map(TradeDto::from).collect(),
    }))
}

pub async fn get_trade(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
) -> Result<Json<TradeDto>, AppError> {
    let trade = state
        .repo
        .get_trade(&trade_id)
        .await?
        .ok_or_else(|| EngineError::NotFound(format!("trade {}", trade_id)))?;
    Ok(Json(trade.into()))
}

pub async fn update_trade_status(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<Json<TradeDto>, AppError> {
    let new_status = TradeStatus::from_str(&request.status)
        .map_err(AppError::BadRequest)?;
    let trade = state.engine.update_status(&trade_id, new_status).await?;
    Ok(Json(trade.into()))
}

pub async fn list_trade_events(
    State(state): State<AppState>,
    Path(trade_id): Path<String>,
) -> Result<Json<TradeEventsResponse>, AppError> {
    if state.repo.get_trade(&trade_id).await?.is_none() {
        return Err(EngineError::NotFound(format!("trade {}", trade_id)).into());
    }

    let events = state.repo.list_events(&trade_id).await?;
    let mut dtos = Vec::with_capacity(events.len());
    for event in events {
        dtos.push(TradeEventDto::try_from_event(event)?);
    }
    Ok(Json(TradeEventsResponse { events: dtos }))
}
