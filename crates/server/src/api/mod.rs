//! HTTP handlers.
//!
//! Errors are returned as `(StatusCode, Json<ErrorResponse>)` so every
//! failure body has the shape `{"error": "..."}`.

mod health;
mod transactions;


use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

pub use health::{health, welcome};
pub use transactions::{create_transaction, get_transaction, list_transactions};

// ── Shared types ─────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub(crate) type ApiError = (StatusCode, Json<ErrorResponse>);
pub(crate) type ApiResult<T> = Result<T, ApiError>;

// ── Helpers ──────────────────────────────────────────────────────

fn api_error(status: StatusCode, msg: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: msg.into() }))
}

pub(crate) fn bad_request(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, msg)
}

pub(crate) fn conflict(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::CONFLICT, msg)
}

pub(crate) fn not_found(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::NOT_FOUND, msg)
}

pub(crate) fn internal_error(msg: impl Into<String>) -> ApiError {
    api_error(StatusCode::INTERNAL_SERVER_ERROR, msg)
}

/// Boolean query values in the usual spellings: 1/0, t/f, true/false in three casings.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
