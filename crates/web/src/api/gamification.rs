//! Gamification endpoints: badge awards and the leaderboard.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::{get, post};
use axum::{Json, Router};

use codesync_core::gamification::{complete_session, SessionOutcome};
use codesync_core::models::LeaderboardEntry;

use crate::api::auth::require_session;
use crate::api::status::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/api/gamification/complete-session",
            post(complete_coding_session),
        )
        .route("/api/gamification/leaderboard", get(leaderboard))
}

async fn complete_coding_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<SessionOutcome>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let outcome = complete_session(&state.identity, &state.leaderboard, &session.username)?;
    Ok(Json(outcome))
}

async fn leaderboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<LeaderboardEntry>>, AppError> {
    require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let rankings = state.leaderboard.rankings()?;
    Ok(Json(rankings))
}
