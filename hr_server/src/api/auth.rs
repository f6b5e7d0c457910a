//! Session endpoints: create, inspect, and log out.

use axum::{extract::State, http::StatusCode, Extension, Json};
use holdem_rooms::store::session::Session;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSessionRequest {
    pub username: String,
}

/// Create a 24-hour session for a display name. The returned `userId` is the
/// bearer credential for every other endpoint.
pub async fn create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<Session>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() {
        return Err(ApiError::new(StatusCode::BAD_REQUEST, "username required"));
    }
    let session = state.store.create_session(username);
    metrics::sessions_created_total();
    tracing::info!(user_id = %session.user_id, "session created");
    Ok(Json(session))
}

/// Echo the caller's session.
pub async fn me(Extension(session): Extension<Session>) -> Json<Session> {
    Json(session)
}

/// Delete the session and remove the user from every room.
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Json<Value> {
    state.store.remove_user(&session.user_id);
    Json(json!({ "ok": true }))
}
