use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::chat::QuickChatState;
use crate::game::entities::Chips;
use crate::game::hand::Hand;

/// Hard cap on seats so a 52-card deck always covers a hand.
pub const MAX_SEATS: usize = 9;

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomStatus {
    Waiting,
    Playing,
}

/// One seat in a room. The stack here is the ledger across hands; a live
/// hand carries its own copy and is projected back after every action.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPlayer {
    pub user_id: String,
    pub username: String,
    pub seat: usize,
    pub stack: Chips,
}

/// A room: seating, configuration, the optional live hand, and the
/// concurrency bookkeeping (state version, action-id dedup, quick chat).
#[derive(Clone, Debug)]
pub struct Room {
    pub room_id: String,
    pub name: String,
    pub open_bet_min: Chips,
    pub bet_min: Chips,
    pub owner_user_id: String,
    pub status: RoomStatus,
    pub players: Vec<RoomPlayer>,
    pub state_version: u64,
    pub updated_at_unix: i64,
    pub next_dealer_pos: usize,
    pub hand: Option<Hand>,
    pub action_seen: HashSet<String>,
    pub chat: QuickChatState,
}

impl Room {
    #[must_use]
    pub fn seat_of(&self, user_id: &str) -> Option<&RoomPlayer> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    #[must_use]
    pub fn is_member(&self, user_id: &str) -> bool {
        self.seat_of(user_id).is_some()
    }

    /// Copy the live hand's stacks back onto the room seats.
    pub fn sync_stacks_from_hand(&mut self) {
        let Some(hand) = &self.hand else {
            return;
        };
        for seat in &mut self.players {
            if let Some(hp) = hand.players.iter().find(|hp| hp.user_id == seat.user_id) {
                seat.stack = hp.stack;
            }
        }
    }

    #[must_use]
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            open_bet_min: self.open_bet_min,
            bet_min: self.bet_min,
            owner_user_id: self.owner_user_id.clone(),
            status: self.status,
            players: self.players.clone(),
            state_version: self.state_version,
            updated_at_unix: self.updated_at_unix,
        }
    }
}

/// Listing/response projection of a room, without the live hand.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: String,
    pub name: String,
    pub open_bet_min: Chips,
    pub bet_min: Chips,
    pub owner_user_id: String,
    pub status: RoomStatus,
    pub players: Vec<RoomPlayer>,
    pub state_version: u64,
    pub updated_at_unix: i64,
}
