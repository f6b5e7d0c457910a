//! Per-room ephemeral quick-chat channel.
//!
//! Orthogonal to the game: shares the room lock but never reads or mutates
//! hand state and never bumps the room's `stateVersion`. Events live on
//! their own monotonic event-id stream with time-bounded retention.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};

/// How long a bubble is shown client-side.
pub const BUBBLE_TTL_MS: i64 = 5000;
/// Per-user minimum interval between sends.
pub const COOLDOWN_MS: i64 = 6000;
/// Events (and their dedup keys) older than this are dropped.
pub const RETENTION_MS: i64 = 7000;

/// The fixed set of sendable phrase ids.
pub const PHRASES: &[&str] = &[
    "wait_flowers",
    "solve_universe",
    "tea_refill",
    "countdown",
    "thinker_mode",
    "dawn_table",
    "cappuccino",
    "showtime",
    "you_act_i_act",
    "something_here",
    "mind_game",
    "script_seen",
    "allin_warning",
    "just_this",
    "easy_sigh",
    "fold_now",
    "you_call_i_show",
    "take_the_shot",
    "pressure_on",
    "tilt_alert",
    "nh",
    "gg",
    "luck_is_skill",
    "next_real",
];

/// Normalize a phrase id before validation.
#[must_use]
pub fn normalize_phrase(phrase_id: &str) -> String {
    phrase_id.trim().to_lowercase()
}

#[must_use]
pub fn is_phrase_allowed(phrase_id: &str) -> bool {
    PHRASES.contains(&phrase_id)
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickChatEvent {
    pub event_id: u64,
    pub user_id: String,
    pub username: String,
    pub phrase_id: String,
    pub created_at_ms: i64,
    pub expire_at_ms: i64,
}

/// Outcome of a send attempt. Only `Posted` changes any state.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SendResult {
    Posted(QuickChatEvent),
    /// The action id was already consumed; idempotent no-op.
    Duplicate,
    InvalidPhrase,
    Cooldown { retry_after_ms: i64 },
}

/// Quick-chat sub-state carried by each room.
#[derive(Clone, Debug, Default)]
pub struct QuickChatState {
    events: Vec<QuickChatEvent>,
    seen: HashSet<String>,
    seen_order: VecDeque<(String, i64)>,
    last_sent_at: HashMap<String, i64>,
    next_event_id: u64,
}

impl QuickChatState {
    /// Drop events older than the retention horizon, and their dedup keys in
    /// insertion order.
    pub fn cleanup(&mut self, now_ms: i64) {
        let min_alive = now_ms - RETENTION_MS;
        self.events.retain(|ev| ev.created_at_ms >= min_alive);
        while let Some((action_id, created_at_ms)) = self.seen_order.front() {
            if *created_at_ms >= min_alive {
                break;
            }
            self.seen.remove(action_id);
            self.seen_order.pop_front();
        }
    }

    /// Attempt to post a phrase. Dedup is checked before phrase validation so
    /// a retried send never re-fails; cooldown is checked last.
    pub fn send(
        &mut self,
        user_id: &str,
        username: &str,
        action_id: &str,
        phrase_id: &str,
        now_ms: i64,
    ) -> SendResult {
        self.cleanup(now_ms);

        let action_id = action_id.trim();
        if !action_id.is_empty() && self.seen.contains(action_id) {
            return SendResult::Duplicate;
        }

        let phrase = normalize_phrase(phrase_id);
        if !is_phrase_allowed(&phrase) {
            return SendResult::InvalidPhrase;
        }

        if let Some(&last_sent) = self.last_sent_at.get(user_id) {
            if last_sent > 0 {
                let delta = now_ms - last_sent;
                if delta < COOLDOWN_MS {
                    return SendResult::Cooldown {
                        retry_after_ms: COOLDOWN_MS - delta,
                    };
                }
            }
        }

        self.next_event_id += 1;
        let event = QuickChatEvent {
            event_id: self.next_event_id,
            user_id: user_id.to_string(),
            username: username.to_string(),
            phrase_id: phrase,
            created_at_ms: now_ms,
            expire_at_ms: now_ms + BUBBLE_TTL_MS,
        };
        self.events.push(event.clone());
        self.last_sent_at.insert(user_id.to_string(), now_ms);
        if !action_id.is_empty() {
            self.seen.insert(action_id.to_string());
            self.seen_order.push_back((action_id.to_string(), now_ms));
        }
        SendResult::Posted(event)
    }

    /// Events strictly newer than `since_event_id`, plus the newest id seen.
    pub fn poll(&mut self, since_event_id: u64, now_ms: i64) -> (Vec<QuickChatEvent>, u64) {
        self.cleanup(now_ms);
        let mut latest = 0;
        let mut out = Vec::with_capacity(self.events.len());
        for ev in &self.events {
            if ev.event_id > latest {
                latest = ev.event_id;
            }
            if ev.event_id > since_event_id {
                out.push(ev.clone());
            }
        }
        (out, latest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: i64 = 1_700_000_000_000;

    #[test]
    fn test_send_posts_event_with_ttl() {
        let mut chat = QuickChatState::default();
        let SendResult::Posted(event) = chat.send("u1", "alice", "a1", "nh", T0) else {
            panic!("expected posted event");
        };
        assert_eq!(event.event_id, 1);
        assert_eq!(event.phrase_id, "nh");
        assert_eq!(event.expire_at_ms, T0 + BUBBLE_TTL_MS);
    }

    #[test]
    fn test_phrase_is_normalized_before_validation() {
        let mut chat = QuickChatState::default();
        let SendResult::Posted(event) = chat.send("u1", "alice", "a1", "  NH ", T0) else {
            panic!("expected posted event");
        };
        assert_eq!(event.phrase_id, "nh");
    }

    #[test]
    fn test_invalid_phrase_rejected_without_state_change() {
        let mut chat = QuickChatState::default();
        assert_eq!(
            chat.send("u1", "alice", "a1", "free", T0),
            SendResult::InvalidPhrase
        );
        // The failed send holds no cooldown and no dedup entry.
        assert!(matches!(
            chat.send("u1", "alice", "a1", "nh", T0),
            SendResult::Posted(_)
        ));
    }

    #[test]
    fn test_cooldown_blocks_second_send() {
        let mut chat = QuickChatState::default();
        assert!(matches!(
            chat.send("u1", "alice", "a1", "nh", T0),
            SendResult::Posted(_)
        ));
        let result = chat.send("u1", "alice", "a2", "gg", T0 + 1000);
        assert_eq!(
            result,
            SendResult::Cooldown {
                retry_after_ms: COOLDOWN_MS - 1000
            }
        );
        // Another user is unaffected.
        assert!(matches!(
            chat.send("u2", "bob", "b1", "gg", T0 + 1000),
            SendResult::Posted(_)
        ));
        // And the first user recovers after the window.
        assert!(matches!(
            chat.send("u1", "alice", "a3", "gg", T0 + COOLDOWN_MS),
            SendResult::Posted(_)
        ));
    }

    #[test]
    fn test_duplicate_action_id_is_idempotent() {
        let mut chat = QuickChatState::default();
        assert!(matches!(
            chat.send("u1", "alice", "a1", "nh", T0),
            SendResult::Posted(_)
        ));
        // Retry inside the cooldown window dedups instead of failing.
        assert_eq!(
            chat.send("u1", "alice", "a1", "nh", T0 + 500),
            SendResult::Duplicate
        );
        let (events, latest) = chat.poll(0, T0 + 600);
        assert_eq!(events.len(), 1);
        assert_eq!(latest, 1);
    }

    #[test]
    fn test_empty_action_id_never_dedups() {
        let mut chat = QuickChatState::default();
        assert!(matches!(
            chat.send("u1", "alice", "", "nh", T0),
            SendResult::Posted(_)
        ));
        assert!(matches!(
            chat.send("u2", "bob", "  ", "gg", T0),
            SendResult::Posted(_)
        ));
    }

    #[test]
    fn test_retention_drops_events_and_dedup_keys() {
        let mut chat = QuickChatState::default();
        assert!(matches!(
            chat.send("u1", "alice", "a1", "nh", T0),
            SendResult::Posted(_)
        ));
        let (events, latest) = chat.poll(0, T0 + RETENTION_MS + 1);
        assert!(events.is_empty());
        assert_eq!(latest, 0);
        // With the dedup key evicted, an extremely late retry posts again;
        // retention (7s) > cooldown (6s) keeps this out of the live window.
        assert!(matches!(
            chat.send("u1", "alice", "a1", "nh", T0 + RETENTION_MS + 1),
            SendResult::Posted(_)
        ));
    }

    #[test]
    fn test_event_ids_are_monotonic_across_retention() {
        let mut chat = QuickChatState::default();
        let SendResult::Posted(first) = chat.send("u1", "alice", "a1", "nh", T0) else {
            panic!("expected posted event");
        };
        let later = T0 + RETENTION_MS + 1;
        let SendResult::Posted(second) = chat.send("u1", "alice", "a2", "gg", later) else {
            panic!("expected posted event");
        };
        assert!(second.event_id > first.event_id);
    }

    #[test]
    fn test_poll_cursor_filters_older_events() {
        let mut chat = QuickChatState::default();
        chat.send("u1", "alice", "a1", "nh", T0);
        chat.send("u2", "bob", "b1", "gg", T0);
        let (all, latest) = chat.poll(0, T0 + 10);
        assert_eq!(all.len(), 2);
        assert_eq!(latest, 2);
        let (newer, latest) = chat.poll(1, T0 + 10);
        assert_eq!(newer.len(), 1);
        assert_eq!(newer[0].event_id, 2);
        assert_eq!(latest, 2);
    }
}
