use crate::domain::{EventDecodeError, TradeStatus};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Typed business failures surfaced by the trade engine.
///
/// Every variant except `Db` and `Internal` is a known-recoverable case the
/// caller can branch on; see `EngineError::code`.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("at least one line item is required")]
    ItemsRequired,
    #[error("no valid line items: every item needs a product and a positive quantity")]
    InvalidItems,
    #[error("insufficient stock for {scope}: requested {requested}")]
    InsufficientStock { scope: String, requested: i64 },
    #[error("insufficient allocated quantity on lot {lot_id}: requested {requested}")]
    InsufficientAllocated { lot_id: String, requested: i64 },
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: TradeStatus, to: TradeStatus },
    #[error("internal error: {0}")]
    Internal(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl EngineError {
    /// Stable machine-readable code for API clients.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "not_found",
            EngineError::ItemsRequired => "items_required",
            EngineError::InvalidItems => "invalid_items",
            EngineError::InsufficientStock { .. } => "insufficient_stock",
            EngineError::InsufficientAllocated { .. } => "insufficient_allocated",
            EngineError::InvalidTransition { .. } => "invalid_transition",
            EngineError::Internal(_) | EngineError::Db(_) => "internal",
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Internal(err.to_string())
    }
}

impl From<EventDecodeError> for EngineError {
    fn from(err: EventDecodeError) -> Self {
        EngineError::Internal(err.to_string())
    }
}

/// HTTP-facing error wrapper.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Engine(EngineError::Db(err))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
            AppError::Engine(err) => {
                let status = match err {
                    EngineError::NotFound(_) => StatusCode::NOT_FOUND,
                    EngineError::ItemsRequired | EngineError::InvalidItems => {
                        StatusCode::BAD_REQUEST
                    }
                    EngineError::InsufficientStock { .. }
                    | EngineError::InsufficientAllocated { .. }
                    | EngineError::InvalidTransition { .. } => StatusCode::CONFLICT,
                    EngineError::Internal(_) | EngineError::Db(_) => {
                        StatusCode::INTERNAL_SERVER_ERROR
                    }
                };
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!(error = %err, "unexpected engine failure");
                }
                (status, err.code(), err.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": code,
        }));

        (status, body).into_response()
    }
}
