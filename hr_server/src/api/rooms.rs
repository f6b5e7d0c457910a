//! Room lifecycle endpoints: list, create, join, start, leave, next hand.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use holdem_rooms::store::room::RoomSummary;
use holdem_rooms::store::session::Session;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SinceVersionQuery {
    pub since_version: u64,
}

/// List room summaries with the global listing version; `sinceVersion`
/// short-circuits to `notModified` when nothing changed.
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<SinceVersionQuery>,
) -> Json<Value> {
    let (rooms, version) = state.store.list_rooms();
    if query.since_version > 0 && version == query.since_version {
        return Json(json!({ "notModified": true, "version": version }));
    }
    Json(json!({ "rooms": rooms, "version": version }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateRoomRequest {
    pub name: String,
    pub open_bet_min: i64,
    pub bet_min: i64,
}

/// Create a room with the caller as owner at seat 0.
pub async fn create_room(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(req): Json<CreateRoomRequest>,
) -> Json<RoomSummary> {
    let name = req.name.trim();
    let name = if name.is_empty() { "Room" } else { name };
    let open_bet_min = positive_or(req.open_bet_min, 10);
    let bet_min = positive_or(req.bet_min, 10);
    let room = state.store.create_room(&session, name, open_bet_min, bet_min);
    metrics::rooms_created_total();
    Json(room)
}

pub async fn join_room(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    let room = state.store.join_room(&room_id, &session)?;
    Ok(Json(room))
}

pub async fn start_room(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    let room = state.store.start_game(&room_id, &session.user_id)?;
    Ok(Json(room))
}

/// Leave the room; the response is the updated room, or `{deleted: true}`
/// when the last player left.
pub async fn leave_room(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.store.leave_room(&room_id, &session.user_id)? {
        Some(room) => Ok(Json(json!(room))),
        None => Ok(Json(json!({ "deleted": true }))),
    }
}

pub async fn next_hand(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    let room = state.store.next_hand(&room_id, &session.user_id)?;
    Ok(Json(room))
}

fn positive_or(value: i64, default: u32) -> u32 {
    if value <= 0 {
        default
    } else {
        u32::try_from(value).unwrap_or(default)
    }
}
