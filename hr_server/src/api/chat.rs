//! Quick-chat endpoints: send a phrase, poll the event stream.
//!
//! Quick chat never touches the room's `stateVersion`; success responses
//! deliberately omit it so clients cannot confuse the two streams.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use holdem_rooms::store::chat::{BUBBLE_TTL_MS, COOLDOWN_MS, PHRASES, RETENTION_MS};
use holdem_rooms::store::session::Session;
use holdem_rooms::store::QuickChatSend;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SendQuickChatRequest {
    pub action_id: String,
    pub phrase_id: String,
}

pub async fn send_quick_chat(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
    Json(req): Json<SendQuickChatRequest>,
) -> Result<Json<Value>, ApiError> {
    let outcome = state.store.send_quick_chat(
        &room_id,
        &session.user_id,
        &req.action_id,
        &req.phrase_id,
    )?;
    match outcome {
        QuickChatSend::Posted(event) => {
            metrics::quick_chats_sent_total();
            Ok(Json(json!({
                "ok": true,
                "chatEventId": event.event_id,
                "expireAtMs": event.expire_at_ms,
                "cooldownMs": COOLDOWN_MS,
            })))
        }
        QuickChatSend::Duplicate => Ok(Json(json!({ "ok": true, "duplicate": true }))),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QuickChatQuery {
    pub since_event_id: u64,
}

pub async fn list_quick_chats(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
    Query(query): Query<QuickChatQuery>,
) -> Result<Json<Value>, ApiError> {
    // Seating is enforced here; the store's poll path stays membership-free.
    match state.store.room_member(&room_id, &session.user_id) {
        None => return Err(ApiError::new(StatusCode::NOT_FOUND, "room not found")),
        Some(false) => return Err(ApiError::new(StatusCode::FORBIDDEN, "user not in room")),
        Some(true) => {}
    }

    let poll = state
        .store
        .list_quick_chats(&room_id, query.since_event_id)?;
    Ok(Json(json!({
        "events": poll.events,
        "latestEventId": poll.latest_event_id,
        "serverNowMs": poll.server_now_ms,
        "bubbleTtlMs": BUBBLE_TTL_MS,
        "cooldownMs": COOLDOWN_MS,
        "retentionMs": RETENTION_MS,
        "phrases": PHRASES,
    })))
}
