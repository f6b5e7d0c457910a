//! Five-card hand evaluation and best-of-seven selection.
//!
//! A [`HandValue`] is a category plus a tiebreak sequence laid out so that
//! the derived lexicographic ordering is exactly the poker ordering: compare
//! categories first, then tiebreak ranks element by element. Ties happen
//! only when both sequences are pointwise equal (a genuine split).

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

use super::entities::{Card, Suit, Value};

/// Hand categories, ascending in strength.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandCategory {
    HighCard,
    OnePair,
    TwoPair,
    ThreeOfAKind,
    Straight,
    Flush,
    FullHouse,
    FourOfAKind,
    StraightFlush,
}

impl HandCategory {
    /// Stable wire name, e.g. `straight_flush`.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::HighCard => "high_card",
            Self::OnePair => "one_pair",
            Self::TwoPair => "two_pair",
            Self::ThreeOfAKind => "three_of_a_kind",
            Self::Straight => "straight",
            Self::Flush => "flush",
            Self::FullHouse => "full_house",
            Self::FourOfAKind => "four_of_a_kind",
            Self::StraightFlush => "straight_flush",
        }
    }
}

/// An evaluated five-card hand. The derived `Ord` (category, then tiebreak)
/// is a total order on hand strength.
#[derive(Clone, Debug, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct HandValue {
    pub category: HandCategory,
    pub tiebreak: Vec<Value>,
}

/// Three-way comparison of two evaluated hands.
#[must_use]
pub fn compare(a: &HandValue, b: &HandValue) -> Ordering {
    a.cmp(b)
}

/// Evaluate exactly five cards.
#[must_use]
pub fn evaluate_five(cards: &[Card; 5]) -> HandValue {
    let mut ranks: Vec<Value> = cards.iter().map(|c| c.rank).collect();
    ranks.sort_unstable_by(|a, b| b.cmp(a));

    let mut rank_counts: HashMap<Value, u8> = HashMap::with_capacity(5);
    let mut suit_counts: HashMap<Suit, u8> = HashMap::with_capacity(4);
    for card in cards {
        *rank_counts.entry(card.rank).or_default() += 1;
        *suit_counts.entry(card.suit).or_default() += 1;
    }
    let is_flush = suit_counts.values().any(|&n| n == 5);
    let straight_high = detect_straight(&ranks);

    if is_flush {
        if let Some(high) = straight_high {
            return HandValue {
                category: HandCategory::StraightFlush,
                tiebreak: vec![high],
            };
        }
    }

    // Rank groups sorted by count descending, then rank descending.
    let mut groups: Vec<(u8, Value)> = rank_counts.into_iter().map(|(r, n)| (n, r)).collect();
    groups.sort_unstable_by(|a, b| b.cmp(a));

    let kickers = |groups: &[(u8, Value)]| -> Vec<Value> {
        let mut singles: Vec<Value> = groups
            .iter()
            .filter(|(n, _)| *n == 1)
            .map(|&(_, r)| r)
            .collect();
        singles.sort_unstable_by(|a, b| b.cmp(a));
        singles
    };

    match (groups[0].0, groups.get(1).map_or(0, |g| g.0)) {
        (4, _) => HandValue {
            category: HandCategory::FourOfAKind,
            tiebreak: {
                let mut t = vec![groups[0].1];
                t.extend(kickers(&groups));
                t
            },
        },
        (3, 2) => HandValue {
            category: HandCategory::FullHouse,
            tiebreak: vec![groups[0].1, groups[1].1],
        },
        _ if is_flush => HandValue {
            category: HandCategory::Flush,
            tiebreak: ranks,
        },
        _ if straight_high.is_some() => HandValue {
            category: HandCategory::Straight,
            tiebreak: straight_high.into_iter().collect(),
        },
        (3, _) => HandValue {
            category: HandCategory::ThreeOfAKind,
            tiebreak: {
                let mut t = vec![groups[0].1];
                t.extend(kickers(&groups));
                t
            },
        },
        (2, 2) => HandValue {
            category: HandCategory::TwoPair,
            tiebreak: {
                let mut t = vec![groups[0].1, groups[1].1];
                t.extend(kickers(&groups));
                t
            },
        },
        (2, _) => HandValue {
            category: HandCategory::OnePair,
            tiebreak: {
                let mut t = vec![groups[0].1];
                t.extend(kickers(&groups));
                t
            },
        },
        _ => HandValue {
            category: HandCategory::HighCard,
            tiebreak: ranks,
        },
    }
}

/// Pick the best five-card hand out of `cards` (at least five of them) by
/// enumerating every five-card subset. Returns the value, the chosen five
/// cards, and the category's wire name. The result depends only on the
/// multiset of input cards.
#[must_use]
pub fn best_of_seven(cards: &[Card]) -> Option<(HandValue, Vec<Card>, &'static str)> {
    let n = cards.len();
    if n < 5 {
        return None;
    }
    let mut best: Option<(HandValue, [Card; 5])> = None;
    for a in 0..n - 4 {
        for b in a + 1..n - 3 {
            for c in b + 1..n - 2 {
                for d in c + 1..n - 1 {
                    for e in d + 1..n {
                        let five = [cards[a], cards[b], cards[c], cards[d], cards[e]];
                        let value = evaluate_five(&five);
                        let better = match &best {
                            Some((best_value, _)) => value > *best_value,
                            None => true,
                        };
                        if better {
                            best = Some((value, five));
                        }
                    }
                }
            }
        }
    }
    best.map(|(value, five)| {
        let name = value.category.name();
        (value, five.to_vec(), name)
    })
}

/// Detect a straight among the given ranks; returns the high card. The wheel
/// A-2-3-4-5 counts as a straight with high card 5 (the ace is low there and
/// only there).
fn detect_straight(ranks: &[Value]) -> Option<Value> {
    let mut uniq: Vec<Value> = ranks.to_vec();
    uniq.sort_unstable_by(|a, b| b.cmp(a));
    uniq.dedup();
    if uniq.len() < 5 {
        return None;
    }
    for window in uniq.windows(5) {
        if window.windows(2).all(|pair| pair[0] == pair[1] + 1) {
            return Some(window[0]);
        }
    }
    if [14, 5, 4, 3, 2].iter().all(|r| uniq.contains(r)) {
        return Some(5);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit::{Clubs, Diamonds, Hearts, Spades};

    fn hand(cards: [(Value, Suit); 5]) -> [Card; 5] {
        cards.map(|(rank, suit)| Card::new(rank, suit))
    }

    #[test]
    fn test_category_ladder() {
        // Literal hands, ascending in strength.
        let ladder = [
            hand([(2, Clubs), (5, Diamonds), (7, Hearts), (9, Spades), (13, Clubs)]), // high card
            hand([(2, Clubs), (2, Diamonds), (7, Hearts), (9, Spades), (13, Clubs)]), // one pair
            hand([(2, Clubs), (2, Diamonds), (9, Hearts), (9, Spades), (13, Clubs)]), // two pair
            hand([(2, Clubs), (2, Diamonds), (2, Hearts), (9, Spades), (13, Clubs)]), // trips
            hand([(4, Clubs), (5, Diamonds), (6, Hearts), (7, Spades), (8, Clubs)]),  // straight
            hand([(2, Clubs), (5, Clubs), (7, Clubs), (9, Clubs), (13, Clubs)]),      // flush
            hand([(2, Clubs), (2, Diamonds), (2, Hearts), (9, Spades), (9, Clubs)]),  // full house
            hand([(2, Clubs), (2, Diamonds), (2, Hearts), (2, Spades), (13, Clubs)]), // quads
            hand([(4, Clubs), (5, Clubs), (6, Clubs), (7, Clubs), (8, Clubs)]),       // straight flush
        ];
        for pair in ladder.windows(2) {
            let weaker = evaluate_five(&pair[0]);
            let stronger = evaluate_five(&pair[1]);
            assert_eq!(
                compare(&stronger, &weaker),
                Ordering::Greater,
                "{stronger:?} should beat {weaker:?}"
            );
        }
    }

    #[test]
    fn test_wheel_is_a_five_high_straight() {
        let wheel = evaluate_five(&hand([
            (14, Clubs),
            (2, Diamonds),
            (3, Hearts),
            (4, Spades),
            (5, Clubs),
        ]));
        assert_eq!(wheel.category, HandCategory::Straight);
        assert_eq!(wheel.tiebreak, vec![5]);

        let six_high = evaluate_five(&hand([
            (2, Clubs),
            (3, Diamonds),
            (4, Hearts),
            (5, Spades),
            (6, Clubs),
        ]));
        assert_eq!(compare(&six_high, &wheel), Ordering::Greater);
    }

    #[test]
    fn test_ace_high_straight_does_not_wrap() {
        // Q-K-A-2-3 is not a straight.
        let value = evaluate_five(&hand([
            (12, Clubs),
            (13, Diamonds),
            (14, Hearts),
            (2, Spades),
            (3, Clubs),
        ]));
        assert_eq!(value.category, HandCategory::HighCard);
    }

    #[test]
    fn test_kicker_breaks_pair_tie() {
        let ace_kicker = evaluate_five(&hand([
            (9, Clubs),
            (9, Diamonds),
            (14, Hearts),
            (7, Spades),
            (3, Clubs),
        ]));
        let king_kicker = evaluate_five(&hand([
            (9, Hearts),
            (9, Spades),
            (13, Hearts),
            (7, Diamonds),
            (3, Spades),
        ]));
        assert_eq!(ace_kicker.category, HandCategory::OnePair);
        assert_eq!(compare(&ace_kicker, &king_kicker), Ordering::Greater);
    }

    #[test]
    fn test_identical_strength_is_a_genuine_split() {
        let a = evaluate_five(&hand([
            (9, Clubs),
            (9, Diamonds),
            (14, Hearts),
            (7, Spades),
            (3, Clubs),
        ]));
        let b = evaluate_five(&hand([
            (9, Hearts),
            (9, Spades),
            (14, Clubs),
            (7, Diamonds),
            (3, Spades),
        ]));
        assert_eq!(compare(&a, &b), Ordering::Equal);
    }

    #[test]
    fn test_full_house_tiebreak_order() {
        let nines_over_twos = evaluate_five(&hand([
            (9, Clubs),
            (9, Diamonds),
            (9, Hearts),
            (2, Spades),
            (2, Clubs),
        ]));
        assert_eq!(nines_over_twos.category, HandCategory::FullHouse);
        assert_eq!(nines_over_twos.tiebreak, vec![9, 2]);
    }

    #[test]
    fn test_best_of_seven_finds_royal_flush() {
        let cards = [
            Card::new(14, Spades),
            Card::new(13, Spades),
            Card::new(12, Spades),
            Card::new(11, Spades),
            Card::new(10, Spades),
            Card::new(2, Clubs),
            Card::new(3, Diamonds),
        ];
        let (value, five, name) = best_of_seven(&cards).unwrap();
        assert_eq!(value.category, HandCategory::StraightFlush);
        assert_eq!(value.tiebreak, vec![14]);
        assert_eq!(name, "straight_flush");
        assert_eq!(five.len(), 5);
        assert!(five.iter().all(|c| c.suit == Spades));
    }

    #[test]
    fn test_best_of_seven_rejects_short_input() {
        assert!(best_of_seven(&[Card::new(2, Clubs); 4]).is_none());
    }

    #[test]
    fn test_best_of_seven_prefers_flush_over_straight() {
        let cards = [
            Card::new(4, Hearts),
            Card::new(5, Hearts),
            Card::new(6, Hearts),
            Card::new(7, Hearts),
            Card::new(8, Clubs),
            Card::new(12, Hearts),
            Card::new(2, Diamonds),
        ];
        let (value, _, _) = best_of_seven(&cards).unwrap();
        assert_eq!(value.category, HandCategory::Flush);
    }
}
