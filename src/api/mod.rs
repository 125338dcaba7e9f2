pub mod health;
pub mod inventory;
pub mod invoices;
pub mod trades;

use crate::config::Config;
use crate::db::Repository;
use crate::engine::TradeEngine;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub engine: Arc<TradeEngine>,
    pub config: Config,
}

impl AppState {
    pub fn new(repo: Arc<Repository>, engine: Arc<TradeEngine>, config: Config) -> Self {
        Self {
            repo,
            engine,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route(
            "/v1/trades",
            get(trades::list_trades).post(trades::create_trade),
        )
        .route("/v1/trades/:id", get(trades::get_trade))
        .route("/v1/trades/:id/status", post(trades::update_trade_status))
        .route("/v1/trades/:id/events", get(trades::list_trade_events))
        .route("/v1/inventory/intake", post(inventory::intake))
        .route("/v1/inventory/lots", get(inventory::list_lots))
        .route("/v1/invoices", get(invoices::list_invoices))
        .layer(cors)
        .with_state(state)
}
