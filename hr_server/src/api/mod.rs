//! HTTP API for the poker server.
//!
//! A thin JSON layer over [`holdem_rooms::MemoryStore`]. All game and room
//! semantics live in the engine; handlers translate requests, enforce
//! session auth, and map structured store errors onto HTTP statuses:
//!
//! - `versionConflict` → 409 (body carries the current `stateVersion`)
//! - `user not in room` → 403
//! - `quick chat cooldown` → 429 (body carries `retryAfterMs`)
//! - `room not found` → 404
//! - anything else the core emits → 400
//!
//! Routes (session required unless noted):
//!
//! ```text
//! GET  /health                                - health check (public)
//! POST /api/v1/session                        - create session (public)
//! GET  /api/v1/session/me                     - current session
//! POST /api/v1/session/logout                 - delete session, leave rooms
//! GET  /api/v1/rooms?sinceVersion=N           - list rooms
//! POST /api/v1/rooms                          - create room
//! POST /api/v1/rooms/{room_id}/join           - join
//! POST /api/v1/rooms/{room_id}/start          - start first hand (owner)
//! POST /api/v1/rooms/{room_id}/leave          - leave (delete when empty)
//! POST /api/v1/rooms/{room_id}/next-hand      - deal next hand (owner)
//! GET  /api/v1/rooms/{room_id}/state?sinceVersion=N - state view
//! POST /api/v1/rooms/{room_id}/actions        - game action or reveal
//! POST /api/v1/rooms/{room_id}/quick-chats    - send quick chat
//! GET  /api/v1/rooms/{room_id}/quick-chats?sinceEventId=N - poll quick chats
//! ```
//!
//! Everything else falls through to the static web UI.

pub mod auth;
pub mod chat;
pub mod game;
pub mod middleware;
pub mod rooms;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use holdem_rooms::store::{MemoryStore, StoreError};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir};

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MemoryStore>,
}

/// Structured error response carrying the mapped HTTP status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            body: json!({ "error": message.into() }),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let message = err.to_string();
        match err {
            StoreError::RoomNotFound => Self::new(StatusCode::NOT_FOUND, message),
            StoreError::UserNotInRoom => Self::new(StatusCode::FORBIDDEN, message),
            StoreError::VersionConflict { state_version } => Self {
                status: StatusCode::CONFLICT,
                body: json!({ "error": message, "stateVersion": state_version }),
            },
            StoreError::QuickChatCooldown { retry_after_ms } => Self {
                status: StatusCode::TOO_MANY_REQUESTS,
                body: json!({ "error": message, "retryAfterMs": retry_after_ms }),
            },
            _ => Self::new(StatusCode::BAD_REQUEST, message),
        }
    }
}

/// Build the full router: public session creation, session-gated API, CORS,
/// and a static-file fallback.
pub fn create_router(state: AppState, static_dir: &Path) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/api/v1/session", post(auth::create_session));

    let session_routes = Router::new()
        .route("/api/v1/session/me", get(auth::me))
        .route("/api/v1/session/logout", post(auth::logout))
        .route("/api/v1/rooms", get(rooms::list_rooms).post(rooms::create_room))
        .route("/api/v1/rooms/{room_id}/join", post(rooms::join_room))
        .route("/api/v1/rooms/{room_id}/start", post(rooms::start_room))
        .route("/api/v1/rooms/{room_id}/leave", post(rooms::leave_room))
        .route("/api/v1/rooms/{room_id}/next-hand", post(rooms::next_hand))
        .route("/api/v1/rooms/{room_id}/state", get(game::get_state))
        .route("/api/v1/rooms/{room_id}/actions", post(game::take_action))
        .route(
            "/api/v1/rooms/{room_id}/quick-chats",
            post(chat::send_quick_chat).get(chat::list_quick_chats),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::session_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .fallback_service(ServeDir::new(static_dir))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check for monitoring and load balancers.
async fn health_check() -> &'static str {
    "OK"
}
