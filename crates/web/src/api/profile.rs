//! Profile endpoint for the logged-in user.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::{Json, Router};

use codesync_core::models::Profile;

use crate::api::auth::require_session;
use crate::api::status::AppError;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile", get(get_profile))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Profile>, AppError> {
    let session = require_session(
        &state,
        headers.get("authorization").and_then(|v| v.to_str().ok()),
    )
    .await?;

    let user = state.identity.get(&session.username)?;
    let points = state.leaderboard.score(&user.username)?;

    Ok(Json(Profile {
        username: user.username,
        college_id: user.college_id,
        email: user.email,
        date_of_birth: user.date_of_birth,
        badges: user.badges,
        points,
    }))
}
