//! # Holdem Rooms
//!
//! A multi-room authoritative Texas Hold'em engine. The server process owning
//! a [`store::MemoryStore`] is the single source of truth for every hand:
//! deck state, pot accounting, turn order, hand evaluation, and payout.
//!
//! ## Architecture
//!
//! - [`game`]: cards, the hand evaluator, and the per-hand state machine
//!   (betting rounds, side pots, showdown, reveal masks).
//! - [`store`]: the in-memory session and room registry with the optimistic
//!   concurrency pipeline (version fences, action-id dedup) and the
//!   ephemeral quick-chat channel.
//!
//! All state lives in memory behind a store-wide lock; nothing blocks while
//! the lock is held. Transports are expected to be thin wrappers over
//! [`store::MemoryStore`]'s API.

/// Cards, hand evaluation, and the hand state machine.
pub mod game;
pub use game::{
    entities::{self, Action, ActionLog, Card, Chips, Deck, Stage, Suit},
    eval,
    hand::{GameError, Hand},
};

/// In-memory session/room registry and the action pipeline.
pub mod store;
pub use store::{
    chat, MemoryStore, StoreConfig, StoreError,
    room::{Room, RoomPlayer, RoomStatus, RoomSummary},
    session::Session,
};
