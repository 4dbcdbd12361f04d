//! Snippet library endpoints.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use codesync_core::models::Snippet;

use crate::api::auth::require_session;
use crate::api::status::AppError;
use crate::AppState;

#[derive(Deserialize)]
pub struct SaveSnippetRequest {
    pub title: String,
    pub code: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Deserialize)]
pub struct SearchParams {
    /// Substring to match against titles and tags; empty matches all.
    #[serde(default)]
    pub q: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/snippets", get(search_snippets).post(save_snippet))
}

async fn save_snippet(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<SaveSnippetRequest>,
) -> Result<Json<Snippet>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let snippet = state.snippets.add(&body.title, &body.code, body.tags)?;
    Ok(Json(snippet))
}

async fn search_snippets(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Snippet>>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let results = state.snippets.search(&params.q)?;
    Ok(Json(results))
}
