//! Project, fork, and pull-request endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use codesync_core::models::{ForkOverview, Project};

use crate::api::auth::require_session;
use crate::api::status::AppError;
use crate::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ForkEditRequest {
    pub code: String,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/forks/mine", get(my_forks))
        .route("/api/projects/pulls/open", get(open_pull_requests))
        .route("/api/projects/{id}", get(get_project))
        .route("/api/projects/{id}/fork", post(fork_project))
        .route("/api/projects/{id}/forks/{fid}", put(save_fork_edit))
        .route(
            "/api/projects/{id}/forks/{fid}/pull-request",
            post(submit_pull_request),
        )
        .route("/api/projects/{id}/forks/{fid}/merge", post(merge_fork))
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let project = state.projects.create(&body.name, &session.username)?;
    Ok(Json(project))
}

async fn list_projects(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Project>>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let projects = state.projects.list()?;
    Ok(Json(projects))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<Project>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let project = state.projects.get(&id)?;
    Ok(Json(project))
}

async fn fork_project(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let (fork_id, fork) = state.projects.fork(&id, &session.username)?;
    Ok(Json(serde_json::json!({
        "fork_id": fork_id,
        "fork": fork,
    })))
}

async fn my_forks(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ForkOverview>>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let forks = state.projects.forks_of(&session.username)?;
    Ok(Json(forks))
}

async fn open_pull_requests(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ForkOverview>>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let pulls = state.projects.open_pull_requests(&session.username)?;
    Ok(Json(pulls))
}

async fn save_fork_edit(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, fid)): Path<(String, String)>,
    Json(body): Json<ForkEditRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    ensure_fork_creator(&state, &id, &fid, &session.username)?;
    let changes = state.projects.save_fork_edit(&id, &fid, &body.code)?;
    Ok(Json(serde_json::json!({ "changes": changes })))
}

async fn submit_pull_request(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, fid)): Path<(String, String)>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    ensure_fork_creator(&state, &id, &fid, &session.username)?;
    state.projects.submit_pull_request(&id, &fid)?;
    Ok(Json(serde_json::json!({
        "ok": true,
        "message": "pull request submitted",
    })))
}

async fn merge_fork(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((id, fid)): Path<(String, String)>,
) -> Result<Json<Project>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let project = state.projects.merge(&id, &fid, &session.username)?;
    Ok(Json(project))
}

/// Forks may only be edited or submitted by the user who created them.
/// The owner-only merge check lives in the store; this one is a routing
/// concern, so it lives here.
fn ensure_fork_creator(
    state: &AppState,
    project_id: &str,
    fork_id: &str,
    username: &str,
) -> Result<(), AppError> {
    let project = state.projects.get(project_id)?;
    let fork = project
        .forks
        .get(fork_id)
        .ok_or_else(|| AppError::NotFound(format!("fork '{}' not found", fork_id)))?;

    if fork.user != username {
        return Err(AppError::Forbidden(format!(
            "fork '{}' belongs to another user",
            fork_id
        )));
    }
    Ok(())
}
