//! Application error type mapping to HTTP status codes.
//!
//! The chat surface is deliberately small: the engine converts every
//! downstream failure into response text, so the only errors that reach
//! HTTP are request validation failures.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Request validation failure.
    Validation(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::Validation(message) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
            }
        };

        (
            status,
            Json(json!({
                "error": { "code": code, "message": message }
            })),
        )
            .into_response()
    }
}
