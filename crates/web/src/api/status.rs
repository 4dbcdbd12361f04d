//! Health check endpoint and the shared API error type.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use codesync_core::errors::{AuthError, ExecError, StoreError};
use codesync_core::CoreError;

use crate::AppState;

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/health", get(health_check))
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ---------------------------------------------------------------------------
// Shared error type for API handlers
// ---------------------------------------------------------------------------

/// Simple API error type that converts to an Axum response.
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Forbidden(String),
    Internal(String),
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (axum::http::StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (axum::http::StatusCode::NOT_FOUND, msg),
            AppError::Unauthorized(msg) => (axum::http::StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (axum::http::StatusCode::FORBIDDEN, msg),
            AppError::Internal(msg) => (axum::http::StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({ "error": message });
        (status, Json(body)).into_response()
    }
}

/// Map core errors onto HTTP status classes.
///
/// Validation problems are the client's fault, missing entities map to 404,
/// authorization failures to 401/403, and everything else is a server error.
impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => AppError::BadRequest(e.to_string()),
            CoreError::Auth(e) => match e {
                AuthError::Forbidden { .. } => AppError::Forbidden(e.to_string()),
                _ => AppError::Unauthorized(e.to_string()),
            },
            CoreError::Store(e) => match e {
                StoreError::NotFound { .. } => AppError::NotFound(e.to_string()),
                _ => AppError::Internal(e.to_string()),
            },
            CoreError::Exec(e) => match e {
                ExecError::Timeout { .. } => AppError::BadRequest(e.to_string()),
                _ => AppError::Internal(e.to_string()),
            },
            CoreError::Notify(e) => AppError::Internal(e.to_string()),
            CoreError::Config(e) => AppError::Internal(e.to_string()),
        }
    }
}
