//! In-memory session and room registry with the optimistic-concurrency
//! action pipeline.
//!
//! One store-wide lock protects the session registry, the room registry, and
//! the rooms-listing version. Everything done under the lock is pure
//! in-memory computation (shuffling, evaluation, accounting); nothing ever
//! blocks while holding it. Reads hand out snapshot copies so transports can
//! build views lock-free.
//!
//! Every mutating operation either fully succeeds and bumps the room's
//! `state_version` by exactly one, or fully fails and leaves state
//! untouched. Quick-chat traffic runs on its own event-id stream and never
//! touches `state_version`.

pub mod chat;
pub mod room;
pub mod session;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use uuid::Uuid;

use crate::game::entities::{Action, Chips, HandPlayer, Stage};
use crate::game::hand::{GameError, Hand};
use chat::{QuickChatEvent, QuickChatState, SendResult};
use room::{Room, RoomPlayer, RoomStatus, RoomSummary, MAX_SEATS};
use session::{Session, SESSION_TTL_SECS};

/// Errors produced by the store pipeline. `Game` wraps faults from the hand
/// state machine unchanged.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum StoreError {
    #[error("room not found")]
    RoomNotFound,
    #[error("game not started")]
    GameNotStarted,
    #[error("version conflict")]
    VersionConflict { state_version: u64 },
    #[error("only owner can start")]
    OwnerOnly,
    #[error("game already started")]
    GameAlreadyStarted,
    #[error("room already playing")]
    RoomAlreadyPlaying,
    #[error("room is full")]
    RoomFull,
    #[error("at least 2 players needed")]
    NotEnoughPlayers,
    #[error("current hand not finished")]
    CurrentHandNotFinished,
    #[error("user not in room")]
    UserNotInRoom,
    #[error("invalid phrase")]
    InvalidPhrase,
    #[error("quick chat cooldown")]
    QuickChatCooldown { retry_after_ms: i64 },
    #[error("unsupported action: {action}")]
    UnsupportedAction { action: String },
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Tunables carried by the store.
#[derive(Clone, Copy, Debug)]
pub struct StoreConfig {
    /// Stack a player sits down with.
    pub starting_stack: Chips,
    /// Seconds of inactivity before a user is swept out.
    pub idle_timeout_secs: i64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            starting_stack: 10_000,
            idle_timeout_secs: 60 * 60,
        }
    }
}

/// Outcome of a quick-chat send that did not error.
#[derive(Clone, Debug)]
pub enum QuickChatSend {
    Posted(QuickChatEvent),
    /// The action id was already consumed; nothing changed.
    Duplicate,
}

/// Result of a quick-chat poll.
#[derive(Clone, Debug)]
pub struct QuickChatPoll {
    pub events: Vec<QuickChatEvent>,
    pub latest_event_id: u64,
    pub server_now_ms: i64,
}

#[derive(Debug, Default)]
struct StoreInner {
    users: HashMap<String, Session>,
    rooms: HashMap<String, Room>,
    last_active: HashMap<String, i64>,
    next_room_id: u64,
    rooms_version: u64,
}

/// The authoritative in-memory store: sessions, rooms, and the per-room
/// action pipeline.
#[derive(Debug, Default)]
pub struct MemoryStore {
    config: StoreConfig,
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(StoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: StoreConfig) -> Self {
        Self {
            config,
            inner: RwLock::new(StoreInner::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // --- sessions ---

    pub fn create_session(&self, username: &str) -> Session {
        let now = now_unix();
        let session = Session {
            user_id: format!("u-{}", Uuid::new_v4().simple()),
            username: username.to_string(),
            expires_at: now + SESSION_TTL_SECS,
        };
        let mut inner = self.write();
        inner
            .users
            .insert(session.user_id.clone(), session.clone());
        inner.last_active.insert(session.user_id.clone(), now);
        session
    }

    /// Look up a live (non-expired) session.
    #[must_use]
    pub fn get_user(&self, user_id: &str) -> Option<Session> {
        let inner = self.read();
        let session = inner.users.get(user_id)?;
        if session.is_expired(now_unix()) {
            return None;
        }
        Some(session.clone())
    }

    pub fn touch_user(&self, user_id: &str) {
        let mut inner = self.write();
        inner.last_active.insert(user_id.to_string(), now_unix());
    }

    // --- rooms ---

    #[must_use]
    pub fn list_rooms(&self) -> (Vec<RoomSummary>, u64) {
        let inner = self.read();
        let mut rooms: Vec<RoomSummary> = inner.rooms.values().map(Room::summary).collect();
        rooms.sort_by(|a, b| a.room_id.cmp(&b.room_id));
        (rooms, inner.rooms_version)
    }

    /// Snapshot copy of a room, live hand included.
    #[must_use]
    pub fn get_room(&self, room_id: &str) -> Option<Room> {
        self.read().rooms.get(room_id).cloned()
    }

    #[must_use]
    pub fn room_member(&self, room_id: &str, user_id: &str) -> Option<bool> {
        self.read().rooms.get(room_id).map(|r| r.is_member(user_id))
    }

    pub fn create_room(
        &self,
        owner: &Session,
        name: &str,
        open_bet_min: Chips,
        bet_min: Chips,
    ) -> RoomSummary {
        let mut inner = self.write();
        inner.next_room_id += 1;
        let room = Room {
            room_id: format!("r-{}", inner.next_room_id),
            name: name.to_string(),
            open_bet_min,
            bet_min,
            owner_user_id: owner.user_id.clone(),
            status: RoomStatus::Waiting,
            players: vec![RoomPlayer {
                user_id: owner.user_id.clone(),
                username: owner.username.clone(),
                seat: 0,
                stack: self.config.starting_stack,
            }],
            state_version: 1,
            updated_at_unix: now_unix(),
            next_dealer_pos: 0,
            hand: None,
            action_seen: Default::default(),
            chat: QuickChatState::default(),
        };
        let summary = room.summary();
        log::info!("room {} created by {}", room.room_id, owner.user_id);
        inner.rooms.insert(room.room_id.clone(), room);
        inner.rooms_version += 1;
        summary
    }

    /// Join a room. Idempotent for a user already seated.
    pub fn join_room(&self, room_id: &str, session: &Session) -> Result<RoomSummary, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let room = inner.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        if room.is_member(&session.user_id) {
            return Ok(room.summary());
        }
        if room.status != RoomStatus::Waiting {
            return Err(StoreError::RoomAlreadyPlaying);
        }
        if room.players.len() >= MAX_SEATS {
            return Err(StoreError::RoomFull);
        }
        let seat = room.players.len();
        room.players.push(RoomPlayer {
            user_id: session.user_id.clone(),
            username: session.username.clone(),
            seat,
            stack: self.config.starting_stack,
        });
        room.state_version += 1;
        room.updated_at_unix = now_unix();
        let summary = room.summary();
        inner.rooms_version += 1;
        Ok(summary)
    }

    /// Owner-only: build a fresh hand from the current seats and stacks.
    pub fn start_game(&self, room_id: &str, user_id: &str) -> Result<RoomSummary, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let room = inner.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        if room.owner_user_id != user_id {
            return Err(StoreError::OwnerOnly);
        }
        if room.status != RoomStatus::Waiting {
            return Err(StoreError::GameAlreadyStarted);
        }
        if room.players.len() < 2 {
            return Err(StoreError::NotEnoughPlayers);
        }
        let hand = build_hand(room)?;
        room.next_dealer_pos = (hand.dealer_pos + 1) % room.players.len();
        room.hand = Some(hand);
        room.status = RoomStatus::Playing;
        room.action_seen.clear();
        room.state_version += 1;
        room.updated_at_unix = now_unix();
        let summary = room.summary();
        inner.rooms_version += 1;
        Ok(summary)
    }

    /// Owner-only: persist the finished hand's stacks, rotate the button,
    /// and deal the next hand.
    pub fn next_hand(&self, room_id: &str, user_id: &str) -> Result<RoomSummary, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let room = inner.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        if room.owner_user_id != user_id {
            return Err(StoreError::OwnerOnly);
        }
        let finished = room
            .hand
            .as_ref()
            .is_some_and(|h| h.stage == Stage::Finished);
        if !finished {
            return Err(StoreError::CurrentHandNotFinished);
        }
        if room.players.len() < 2 {
            return Err(StoreError::NotEnoughPlayers);
        }
        room.sync_stacks_from_hand();
        let hand = build_hand(room)?;
        room.next_dealer_pos = (hand.dealer_pos + 1) % room.players.len();
        room.hand = Some(hand);
        room.status = RoomStatus::Playing;
        room.action_seen.clear();
        room.state_version += 1;
        room.updated_at_unix = now_unix();
        let summary = room.summary();
        inner.rooms_version += 1;
        Ok(summary)
    }

    /// Remove a user from a room, folding them out of a live hand first.
    /// Returns `None` when the last player left and the room was deleted.
    pub fn leave_room(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<Option<RoomSummary>, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let room = inner.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        let idx = room
            .players
            .iter()
            .position(|p| p.user_id == user_id)
            .ok_or(StoreError::UserNotInRoom)?;

        if room.status == RoomStatus::Playing {
            if let Some(hand) = &mut room.hand {
                hand.force_leave(user_id);
            }
        }

        room.players.remove(idx);
        for (i, seat) in room.players.iter_mut().enumerate() {
            seat.seat = i;
        }
        if room.players.is_empty() {
            log::info!("room {room_id} deleted, last player left");
            inner.rooms.remove(room_id);
            inner.rooms_version += 1;
            return Ok(None);
        }
        if room.owner_user_id == user_id {
            room.owner_user_id = room.players[0].user_id.clone();
        }

        // Re-seat the hand roster to match the compacted seat list.
        if let Some(hand) = &mut room.hand {
            hand.players.retain(|hp| hp.user_id != user_id);
            let mut reordered: Vec<HandPlayer> = Vec::with_capacity(room.players.len());
            for seat in &room.players {
                if let Some(pos) = hand.players.iter().position(|hp| hp.user_id == seat.user_id) {
                    let mut hp = hand.players[pos].clone();
                    hp.seat_index = seat.seat;
                    reordered.push(hp);
                }
            }
            hand.players = reordered;
            if !hand.players.is_empty() {
                if hand.turn_pos >= hand.players.len() {
                    hand.turn_pos = 0;
                }
                if hand.dealer_pos >= hand.players.len() {
                    hand.dealer_pos = hand.players.len() - 1;
                }
            }
        }

        if room.status == RoomStatus::Playing {
            if let Some(hand) = &mut room.hand {
                if hand.stage != Stage::Finished && hand.active_count() <= 1 {
                    hand.finish_by_last_standing();
                }
                if hand.stage == Stage::Finished {
                    room.status = RoomStatus::Waiting;
                }
            }
        }

        room.state_version += 1;
        room.updated_at_unix = now_unix();
        let summary = room.summary();
        inner.rooms_version += 1;
        Ok(Some(summary))
    }

    // --- the action pipeline ---

    /// Apply a game action under the version fence with action-id dedup.
    /// Returns the room's state version after the call (bumped on success,
    /// unchanged on an idempotent replay).
    pub fn apply_action(
        &self,
        room_id: &str,
        user_id: &str,
        action_id: &str,
        action: &str,
        amount: i64,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let room = inner.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        if room.hand.is_none() || room.status != RoomStatus::Playing {
            return Err(StoreError::GameNotStarted);
        }
        if expected_version != room.state_version {
            return Err(StoreError::VersionConflict {
                state_version: room.state_version,
            });
        }
        if !action_id.is_empty() && room.action_seen.contains(action_id) {
            return Ok(room.state_version);
        }
        let parsed: Action = action
            .parse()
            .map_err(|()| StoreError::UnsupportedAction {
                action: action.to_string(),
            })?;
        let amount = clamp_amount(amount);
        if let Some(hand) = &mut room.hand {
            hand.apply_action(user_id, parsed, amount)?;
        }
        if !action_id.is_empty() {
            room.action_seen.insert(action_id.to_string());
        }
        room.sync_stacks_from_hand();
        if room
            .hand
            .as_ref()
            .is_some_and(|h| h.stage == Stage::Finished)
        {
            room.status = RoomStatus::Waiting;
        }
        room.state_version += 1;
        room.updated_at_unix = now_unix();
        let version = room.state_version;
        inner.rooms_version += 1;
        Ok(version)
    }

    /// Record a reveal selection through the same fence + dedup pipeline.
    pub fn apply_reveal(
        &self,
        room_id: &str,
        user_id: &str,
        action_id: &str,
        mask: i64,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let room = inner.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        if room.hand.is_none() {
            return Err(StoreError::GameNotStarted);
        }
        if expected_version != room.state_version {
            return Err(StoreError::VersionConflict {
                state_version: room.state_version,
            });
        }
        if !action_id.is_empty() && room.action_seen.contains(action_id) {
            return Ok(room.state_version);
        }
        let mask = u8::try_from(mask).map_err(|_| GameError::InvalidRevealMask)?;
        if let Some(hand) = &mut room.hand {
            hand.set_reveal(user_id, mask)?;
        }
        if !action_id.is_empty() {
            room.action_seen.insert(action_id.to_string());
        }
        room.state_version += 1;
        room.updated_at_unix = now_unix();
        let version = room.state_version;
        inner.rooms_version += 1;
        Ok(version)
    }

    // --- quick chat ---

    /// Post a quick-chat phrase. Never touches the room's state version.
    pub fn send_quick_chat(
        &self,
        room_id: &str,
        user_id: &str,
        action_id: &str,
        phrase_id: &str,
    ) -> Result<QuickChatSend, StoreError> {
        let mut guard = self.write();
        let inner = &mut *guard;
        let room = inner.rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        let username = room
            .seat_of(user_id)
            .map(|p| p.username.clone())
            .ok_or(StoreError::UserNotInRoom)?;

        match room.chat.send(user_id, &username, action_id, phrase_id, now_ms()) {
            SendResult::Posted(event) => {
                room.updated_at_unix = now_unix();
                inner.rooms_version += 1;
                Ok(QuickChatSend::Posted(event))
            }
            SendResult::Duplicate => Ok(QuickChatSend::Duplicate),
            SendResult::InvalidPhrase => Err(StoreError::InvalidPhrase),
            SendResult::Cooldown { retry_after_ms } => {
                Err(StoreError::QuickChatCooldown { retry_after_ms })
            }
        }
    }

    /// Events strictly newer than the cursor. Room membership is the
    /// caller's responsibility (the transport checks seating first).
    pub fn list_quick_chats(
        &self,
        room_id: &str,
        since_event_id: u64,
    ) -> Result<QuickChatPoll, StoreError> {
        let mut guard = self.write();
        let room = guard
            .rooms
            .get_mut(room_id)
            .ok_or(StoreError::RoomNotFound)?;
        let server_now_ms = now_ms();
        let (events, latest_event_id) = room.chat.poll(since_event_id, server_now_ms);
        Ok(QuickChatPoll {
            events,
            latest_event_id,
            server_now_ms,
        })
    }

    // --- idle cleanup ---

    /// Remove the user from every room they are seated in. Room ids are
    /// collected first so no room work happens while scanning the registry.
    pub fn leave_all_rooms(&self, user_id: &str) {
        let room_ids: Vec<String> = {
            let inner = self.read();
            inner
                .rooms
                .values()
                .filter(|r| r.is_member(user_id))
                .map(|r| r.room_id.clone())
                .collect()
        };
        for room_id in room_ids {
            let _ = self.leave_room(&room_id, user_id);
        }
    }

    /// Delete the session and clean up every room membership.
    pub fn remove_user(&self, user_id: &str) {
        self.leave_all_rooms(user_id);
        let mut inner = self.write();
        inner.users.remove(user_id);
        inner.last_active.remove(user_id);
    }

    /// Sweep users idle past the configured timeout. The victim list is
    /// computed under a read lock; removal goes through the public leave
    /// path. Returns the removed user ids.
    pub fn sweep_idle(&self) -> Vec<String> {
        let now = now_unix();
        let expired: Vec<String> = {
            let inner = self.read();
            inner
                .last_active
                .iter()
                .filter(|(_, &last)| now - last >= self.config.idle_timeout_secs)
                .map(|(uid, _)| uid.clone())
                .collect()
        };
        for user_id in &expired {
            log::debug!("sweeping idle user {user_id}");
            self.remove_user(user_id);
        }
        expired
    }
}

/// Build a hand from the room's seats and current stacks, dealer position
/// normalized into range.
fn build_hand(room: &Room) -> Result<Hand, GameError> {
    let players: Vec<HandPlayer> = room
        .players
        .iter()
        .map(|p| HandPlayer::new(p.user_id.clone(), p.username.clone(), p.seat, p.stack))
        .collect();
    let dealer_pos = room.next_dealer_pos % players.len().max(1);
    Hand::new(players, dealer_pos, room.open_bet_min, room.bet_min)
}

/// Wire amounts arrive as signed 64-bit; the engine counts unsigned 32-bit
/// chips. Negatives clamp to zero (rejected as non-positive bets), oversize
/// values clamp to the max (rejected against the stack).
fn clamp_amount(amount: i64) -> Chips {
    if amount < 0 {
        0
    } else {
        Chips::try_from(amount).unwrap_or(Chips::MAX)
    }
}

fn now_unix() -> i64 {
    Utc::now().timestamp()
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_amount_bounds() {
        assert_eq!(clamp_amount(-5), 0);
        assert_eq!(clamp_amount(0), 0);
        assert_eq!(clamp_amount(40), 40);
        assert_eq!(clamp_amount(i64::MAX), Chips::MAX);
    }

    #[test]
    fn test_sessions_expire_and_touch_tracks_activity() {
        let store = MemoryStore::new();
        let session = store.create_session("alice");
        assert!(store.get_user(&session.user_id).is_some());
        assert!(store.get_user("u-nope").is_none());
        store.touch_user(&session.user_id);
    }

    #[test]
    fn test_sweep_idle_removes_user_and_their_seats() {
        let store = MemoryStore::with_config(StoreConfig {
            starting_stack: 10_000,
            idle_timeout_secs: 0,
        });
        let owner = store.create_session("owner");
        let room = store.create_room(&owner, "r", 10, 10);
        assert!(store.get_room(&room.room_id).is_some());

        let swept = store.sweep_idle();
        assert!(swept.contains(&owner.user_id));
        assert!(store.get_user(&owner.user_id).is_none());
        // The room died with its only member.
        assert!(store.get_room(&room.room_id).is_none());
    }
}
