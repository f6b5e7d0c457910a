//! Game endpoints: the derived state view and the action/reveal pipeline.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use holdem_rooms::game::entities::{ActionOptions, Card, Stage};
use holdem_rooms::game::hand::Hand;
use holdem_rooms::store::room::Room;
use holdem_rooms::store::session::Session;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::{ApiError, AppState};
use crate::metrics;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StateQuery {
    pub since_version: u64,
}

/// Viewer-specific projection of one hand seat. Everything here is derived;
/// the engine re-validates any action a client submits based on it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayerView {
    user_id: String,
    username: String,
    seat_index: usize,
    stack: u32,
    folded: bool,
    all_in: bool,
    last_action: String,
    won: u32,
    contributed: u32,
    reveal_mask: u8,
    can_reveal: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    best_hand_name: String,
    /// Two slots, `null` for each concealed card.
    hole_cards: Vec<Option<Card>>,
    is_turn: bool,
    #[serde(flatten)]
    options: ActionOptions,
}

/// Full state view for one viewer, with a `sinceVersion` fast path.
pub async fn get_state(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
    Query(query): Query<StateQuery>,
) -> Result<Json<Value>, ApiError> {
    let room = state
        .store
        .get_room(&room_id)
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "room not found"))?;

    if query.since_version > 0 && room.state_version == query.since_version {
        return Ok(Json(
            json!({ "notModified": true, "version": room.state_version }),
        ));
    }

    Ok(Json(build_state_view(&room, &session.user_id)))
}

fn build_state_view(room: &Room, viewer_user_id: &str) -> Value {
    let can_start_next_hand = room.owner_user_id == viewer_user_id
        && room
            .hand
            .as_ref()
            .is_some_and(|h| h.stage == Stage::Finished);

    let game = room.hand.as_ref().map(|hand| {
        let players: Vec<PlayerView> = (0..hand.players.len())
            .map(|idx| player_view(hand, idx, viewer_user_id))
            .collect();
        json!({
            "stage": hand.stage,
            "pot": hand.pot,
            "dealerPos": hand.dealer_pos,
            "smallBlindPos": hand.small_blind_pos,
            "bigBlindPos": hand.big_blind_pos,
            "turnPos": hand.turn_pos,
            "communityCards": hand.community_cards,
            "players": players,
            "result": hand.result,
            "openBetMin": hand.open_bet_min,
            "betMin": hand.bet_min,
            "actionLogs": hand.action_logs,
        })
    });

    json!({
        "roomId": room.room_id,
        "roomName": room.name,
        "roomStatus": room.status,
        "ownerUserId": room.owner_user_id,
        "stateVersion": room.state_version,
        "roomPlayers": room.players,
        "canStartNextHand": can_start_next_hand,
        "game": game,
    })
}

fn player_view(hand: &Hand, idx: usize, viewer_user_id: &str) -> PlayerView {
    let player = &hand.players[idx];
    let is_self = player.user_id == viewer_user_id;
    let finished = hand.stage == Stage::Finished;

    // A viewer's own cards are fully visible while the hand is live, then
    // masked by their own reveal selection; other players' cards only ever
    // show what their owner revealed, and only once the hand is finished.
    let mask = if is_self {
        if finished {
            player.reveal_mask
        } else {
            3
        }
    } else if finished {
        player.reveal_mask
    } else {
        0
    };
    let hole_cards: Vec<Option<Card>> = player
        .hole_cards
        .iter()
        .enumerate()
        .map(|(i, &card)| {
            if mask & (1u8 << i) != 0 {
                Some(card)
            } else {
                None
            }
        })
        .collect();

    PlayerView {
        user_id: player.user_id.clone(),
        username: player.username.clone(),
        seat_index: player.seat_index,
        stack: player.stack,
        folded: player.folded,
        all_in: player.all_in,
        last_action: player.last_action.clone(),
        won: player.won,
        contributed: player.contributed,
        reveal_mask: player.reveal_mask,
        can_reveal: is_self && finished,
        best_hand_name: player.best_hand_name.clone(),
        hole_cards,
        is_turn: idx == hand.turn_pos && !finished,
        options: hand.options_for(idx),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionRequest {
    pub action_id: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub amount: i64,
    pub reveal_mask: i64,
    pub expected_version: u64,
}

/// Submit a game action (or a reveal, which rides the same fence + dedup
/// pipeline). Responds with the room's state version after the call.
pub async fn take_action(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(room_id): Path<String>,
    Json(req): Json<ActionRequest>,
) -> Result<Json<Value>, ApiError> {
    let action_type = req.action_type.trim().to_lowercase();
    if action_type.is_empty() {
        return Err(ApiError::new(
            StatusCode::BAD_REQUEST,
            "action type required",
        ));
    }

    let state_version = if action_type == "reveal" {
        state.store.apply_reveal(
            &room_id,
            &session.user_id,
            &req.action_id,
            req.reveal_mask,
            req.expected_version,
        )?
    } else {
        state.store.apply_action(
            &room_id,
            &session.user_id,
            &req.action_id,
            &action_type,
            req.amount,
            req.expected_version,
        )?
    };
    metrics::game_actions_total(&action_type);

    Ok(Json(json!({ "ok": true, "stateVersion": state_version })))
}
