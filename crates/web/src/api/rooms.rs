//! Collaborative room endpoints: shared code buffer, chat, execution.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use codesync_core::errors::ExecError;
use codesync_core::models::{ChatMessage, Room};

use crate::api::auth::require_session;
use crate::api::status::AppError;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateRoomRequest {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Deserialize)]
pub struct SaveCodeRequest {
    pub code: String,
}

#[derive(Deserialize)]
pub struct RunCodeRequest {
    pub code: String,
}

/// Execution result as shown to the room. A timed-out run is reported in
/// the same shape rather than as an error status.
#[derive(Serialize)]
struct RunCodeResponse {
    stdout: String,
    stderr: String,
    exit_code: Option<i32>,
    duration_ms: u64,
    timed_out: bool,
}

#[derive(Deserialize)]
pub struct ChatSendRequest {
    pub message: String,
}

#[derive(Deserialize)]
pub struct ChatEditRequest {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/rooms", post(create_room))
        .route("/api/rooms/{id}", get(get_room))
        .route("/api/rooms/{id}/join", post(join_room))
        .route("/api/rooms/{id}/code", put(save_code))
        .route("/api/rooms/{id}/run", post(run_code))
        .route("/api/rooms/{id}/chat", post(send_message))
        .route(
            "/api/rooms/{id}/chat/{index}",
            put(edit_message).delete(delete_message),
        )
}

async fn create_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateRoomRequest>,
) -> Result<Json<Room>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let room = state
        .rooms
        .create(&body.id, &body.description, &session.username)?;
    Ok(Json(room))
}

async fn get_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Room>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let room = state.rooms.get(&id)?;
    Ok(Json(room))
}

async fn join_room(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Room>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let room = state.rooms.join(&id, &session.username)?;
    Ok(Json(room))
}

async fn save_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<SaveCodeRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    state.rooms.save_code(&id, &body.code)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// Run the submitted code. The shared buffer is untouched; saving and
/// running are separate actions.
async fn run_code(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<RunCodeRequest>,
) -> Result<Json<RunCodeResponse>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    // The room must exist even though the buffer is not consulted.
    state.rooms.get(&id)?;

    match state.runner.run(&body.code).await {
        Ok(report) => Ok(Json(RunCodeResponse {
            stdout: report.stdout,
            stderr: report.stderr,
            exit_code: report.exit_code,
            duration_ms: report.duration_ms,
            timed_out: false,
        })),
        Err(ExecError::Timeout { limit_secs }) => Ok(Json(RunCodeResponse {
            stdout: String::new(),
            stderr: format!("code execution timed out after {}s", limit_secs),
            exit_code: None,
            duration_ms: limit_secs * 1000,
            timed_out: true,
        })),
        Err(e) => Err(AppError::Internal(format!("code execution failed: {}", e))),
    }
}

async fn send_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<ChatSendRequest>,
) -> Result<Json<ChatMessage>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let message = state
        .rooms
        .append_message(&id, &session.username, &body.message)?;
    Ok(Json(message))
}

async fn edit_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, index)): Path<(String, usize)>,
    Json(body): Json<ChatEditRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    state
        .rooms
        .edit_message(&id, index, &session.username, &body.message)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

async fn delete_message(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, index)): Path<(String, usize)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    state.rooms.delete_message(&id, index, &session.username)?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
