//! Registration and authentication endpoints.
//!
//! Registration is a three-step flow: `send-otp` validates the signup form
//! and mails a one-time password, `verify-otp` checks the code, and
//! `register` creates the account from the verified flow. Login opens a
//! bearer-token session; all other API groups require one.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use codesync_core::models::{Registration, SessionContext};

use crate::api::status::AppError;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub flow_id: String,
    pub code: String,
}

#[derive(Deserialize)]
pub struct CompleteRegistrationRequest {
    pub flow_id: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub college_id: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    username: String,
    expires_at: String,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register/send-otp", post(send_otp))
        .route("/api/auth/register/verify-otp", post(verify_otp))
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/logout", post(logout))
}

async fn send_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Registration>,
) -> Result<Json<serde_json::Value>, AppError> {
    let challenge = state.otp_flows.begin(&state.identity, body).await?;

    // The code travels by mail (or the log, when SMTP is unconfigured);
    // it must never appear in the HTTP response.
    state
        .mailer
        .send_otp(&challenge.email, &challenge.code)
        .await
        .map_err(|e| AppError::Internal(format!("failed to send OTP: {}", e)))?;

    Ok(Json(serde_json::json!({
        "flow_id": challenge.flow_id,
        "email": challenge.email,
        "message": "OTP sent to your email.",
    })))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.otp_flows.verify(&body.flow_id, &body.code).await?;

    Ok(Json(serde_json::json!({
        "verified": true,
        "message": "OTP verified. Complete registration to create the account.",
    })))
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CompleteRegistrationRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let registration = state.otp_flows.take_verified(&body.flow_id).await?;
    let user = state.identity.register(registration)?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "username": user.username,
        "message": "Registration successful.",
    })))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = state.identity.login(&body.college_id, &body.password)?;
    let session = state.sessions.open(&user.username).await;

    Ok(Json(LoginResponse {
        token: session.token,
        username: session.username,
        expires_at: session.expires_at.to_rfc3339(),
    }))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: axum::http::HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;
    state.sessions.close(&session.token).await;

    Ok(Json(serde_json::json!({
        "ok": true,
        "message": "logged out",
    })))
}

/// Helper to validate a session token from the Authorization header.
///
/// Call this from handlers that require authentication. Returns the session
/// context (including the logged-in username) if the bearer token is valid,
/// or `Err(AppError::Unauthorized)` otherwise.
pub async fn require_session(
    state: &Arc<AppState>,
    auth_header: Option<&str>,
) -> Result<SessionContext, AppError> {
    let token = auth_header
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("missing or invalid Authorization header".into()))?;

    state
        .sessions
        .resolve(token)
        .await
        .ok_or_else(|| AppError::Unauthorized("session expired or invalid".into()))
}
