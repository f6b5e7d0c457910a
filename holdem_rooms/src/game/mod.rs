//! Poker game engine: cards, hand evaluation, and the hand state machine.
//!
//! A [`hand::Hand`] is built from a seat roster and blind configuration,
//! consumes player actions, and runs itself to a finished state with the
//! pot fully paid out. It never touches a clock, a lock, or any I/O.

pub mod entities;
pub mod eval;
pub mod hand;

pub use entities::{Action, ActionLog, ActionOptions, Card, Chips, Deck, HandPlayer, Stage, Suit};
pub use eval::{best_of_seven, evaluate_five, HandCategory, HandValue};
pub use hand::{GameError, Hand, HandResult};
