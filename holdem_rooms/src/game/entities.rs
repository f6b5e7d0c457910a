use rand::{seq::SliceRandom, thread_rng};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Type alias for card ranks: 2..=14, ace high (14).
pub type Value = u8;

/// Type alias for whole chips. All bets and stacks are whole chips; if a
/// single room ever holds ~4.2 billion chips we have bigger problems.
pub type Chips = u32;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Clubs,
    Diamonds,
    Hearts,
    Spades,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Clubs, Suit::Diamonds, Suit::Hearts, Suit::Spades];
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Clubs => "♣",
            Self::Diamonds => "♦",
            Self::Hearts => "♥",
            Self::Spades => "♠",
        };
        write!(f, "{repr}")
    }
}

/// A playing card. Equality is by rank and suit; cards carry no ordering of
/// their own (ordering only exists on evaluated hands).
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    pub rank: Value,
    pub suit: Suit,
}

impl Card {
    #[must_use]
    pub const fn new(rank: Value, suit: Suit) -> Self {
        Self { rank, suit }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rank = match self.rank {
            14 => "A".to_string(),
            13 => "K".to_string(),
            12 => "Q".to_string(),
            11 => "J".to_string(),
            v => v.to_string(),
        };
        write!(f, "{rank}{}", self.suit)
    }
}

/// An ordered 52-card deck with a monotonic draw cursor. The cursor never
/// rewinds within a hand; a fresh shuffled deck is built per hand.
#[derive(Clone, Debug)]
pub struct Deck {
    cards: [Card; 52],
    draw_idx: usize,
}

impl Deck {
    /// Build a deck in canonical order.
    #[must_use]
    pub fn ordered() -> Self {
        let mut cards = [Card::new(2, Suit::Clubs); 52];
        let mut i = 0;
        for suit in Suit::ALL {
            for rank in 2..=14 {
                cards[i] = Card::new(rank, suit);
                i += 1;
            }
        }
        Self { cards, draw_idx: 0 }
    }

    /// Build a deck shuffled by a uniformly random permutation.
    #[must_use]
    pub fn new_shuffled() -> Self {
        let mut deck = Self::ordered();
        deck.shuffle();
        deck
    }

    pub fn shuffle(&mut self) {
        self.cards.shuffle(&mut thread_rng());
        self.draw_idx = 0;
    }

    /// Draw the next card, advancing the cursor.
    pub fn draw(&mut self) -> Card {
        let card = self.cards[self.draw_idx];
        self.draw_idx += 1;
        card
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        52 - self.draw_idx
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::ordered()
    }
}

/// Betting-round progression of a single hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
    Finished,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Preflop => "preflop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Showdown => "showdown",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// A voluntary player action. Blinds and leaves are recorded in the action
/// log but are not submittable actions.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Check,
    Call,
    Bet,
    Allin,
    Fold,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Check => "check",
            Self::Call => "call",
            Self::Bet => "bet",
            Self::Allin => "allin",
            Self::Fold => "fold",
        };
        write!(f, "{repr}")
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "check" => Ok(Self::Check),
            "call" => Ok(Self::Call),
            "bet" => Ok(Self::Bet),
            "allin" => Ok(Self::Allin),
            "fold" => Ok(Self::Fold),
            _ => Err(()),
        }
    }
}

/// One seat in one hand. `seat_index` is the seat within this hand's roster,
/// which tracks (but is distinct from) the room seat.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandPlayer {
    pub user_id: String,
    pub username: String,
    pub seat_index: usize,
    pub stack: Chips,
    pub hole_cards: Vec<Card>,
    pub folded: bool,
    pub all_in: bool,
    pub contributed: Chips,
    pub round_contrib: Chips,
    pub won: Chips,
    pub last_action: String,
    pub best_hand_name: String,
    pub best_hand_cards: Vec<Card>,
    pub reveal_mask: u8,
}

impl HandPlayer {
    #[must_use]
    pub fn new(user_id: String, username: String, seat_index: usize, stack: Chips) -> Self {
        Self {
            user_id,
            username,
            seat_index,
            stack,
            hole_cards: Vec::with_capacity(2),
            folded: false,
            all_in: false,
            contributed: 0,
            round_contrib: 0,
            won: 0,
            last_action: String::new(),
            best_hand_name: String::new(),
            best_hand_cards: Vec::new(),
            reveal_mask: 0,
        }
    }

    /// A player still able to act: neither folded nor all-in.
    #[must_use]
    pub fn can_act(&self) -> bool {
        !self.folded && !self.all_in
    }
}

/// Append-only record of one action within a hand.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionLog {
    pub user_id: String,
    pub username: String,
    pub action: String,
    pub amount: Chips,
    pub stage: Stage,
}

/// Per-turn affordances derived from the betting rules. This view is a pure
/// projection; the hand itself re-validates every submitted action.
#[derive(Clone, Copy, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionOptions {
    pub can_check: bool,
    pub can_call: bool,
    pub can_bet: bool,
    pub can_raise: bool,
    pub can_fold: bool,
    pub call_amount: Chips,
    pub min_bet: Chips,
    pub min_raise: Chips,
}
