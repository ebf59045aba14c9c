//! API error taxonomy.
//!
//! Every failure a request can surface maps to an HTTP status and a
//! structured JSON body. Storage details are logged but never leaked to the
//! client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;
use crate::validate::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing, expired, or invalid credential.
    #[error("{0}")]
    Unauthorized(String),
    /// Bad field shape or value; carries per-field detail.
    #[error("Validation error")]
    Validation(#[from] ValidationErrors),
    /// Task absent or owned by someone else; the two are indistinguishable.
    #[error("Task not found")]
    NotFound,
    /// Storage or other unexpected failure.
    #[error("Internal server error")]
    Internal(#[from] StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": message })),
            )
                .into_response(),
            ApiError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "Validation error", "details": errors })),
            )
                .into_response(),
            ApiError::NotFound => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": "Task not found" })),
            )
                .into_response(),
            ApiError::Internal(err) => {
                tracing::error!("internal error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Internal server error" })),
                )
                    .into_response()
            }
        }
    }
}
