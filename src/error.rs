use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not eligible: {0}")]
    NotEligible(String),

    #[error("no couriers available")]
    NoCourierAvailable,

    #[error("insufficient balance: requested {requested}, available {available}")]
    InsufficientBalance { requested: i64, available: i64 },

    #[error("invalid amount: {0}")]
    InvalidAmount(i64),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::NotEligible(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::NoCourierAvailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "no couriers available".to_string(),
            ),
            AppError::InsufficientBalance { .. } => {
                (StatusCode::PAYMENT_REQUIRED, self.to_string())
            }
            AppError::InvalidAmount(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
