//! The per-hand state machine: blinds, betting rounds, stage advancement,
//! attrition, showdown with side pots, and the post-hand reveal protocol.

use serde::{Deserialize, Serialize};
use std::cmp::max;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

use super::entities::{Action, ActionLog, ActionOptions, Card, Chips, Deck, HandPlayer, Stage};
use super::eval::{best_of_seven, HandValue};

/// Errors produced by the hand state machine. Every failure leaves the hand
/// exactly as it was.
#[derive(Clone, Debug, Deserialize, Eq, Error, PartialEq, Serialize)]
pub enum GameError {
    #[error("game already ended")]
    GameAlreadyEnded,
    #[error("not your turn")]
    NotYourTurn,
    #[error("player already folded")]
    PlayerAlreadyFolded,
    #[error("player already all-in")]
    PlayerAlreadyAllIn,
    #[error("cannot check when bet exists")]
    CannotCheckWhenBetExists,
    #[error("nothing to call")]
    NothingToCall,
    #[error("not enough stack")]
    NotEnoughStack,
    #[error("open bet must be at least {min}")]
    OpenBetTooSmall { min: Chips },
    #[error("raise must be at least {min}")]
    RaiseTooSmall { min: Chips },
    #[error("bet amount must be positive")]
    BetAmountNonPositive,
    #[error("at least 2 players required")]
    NotEnoughPlayers,
    #[error("open bet min must be positive")]
    NonPositiveOpenBetMin,
    #[error("bet min must be positive")]
    NonPositiveBetMin,
    #[error("invalid reveal mask")]
    InvalidRevealMask,
    #[error("player not in hand")]
    PlayerNotInHand,
}

/// Outcome of a finished hand.
#[derive(Clone, Debug, Serialize)]
pub struct HandResult {
    pub winners: Vec<String>,
    pub reason: String,
}

/// A single poker hand in progress. Built from a seat roster and blind
/// configuration; runs itself to `Stage::Finished` with the pot paid out.
#[derive(Clone, Debug)]
pub struct Hand {
    pub stage: Stage,
    pub dealer_pos: usize,
    pub small_blind_pos: usize,
    pub big_blind_pos: usize,
    pub turn_pos: usize,
    pub pot: Chips,
    pub community_cards: Vec<Card>,
    pub players: Vec<HandPlayer>,
    pub round_bet: Chips,
    pub open_bet_min: Chips,
    pub bet_min: Chips,
    pub result: Option<HandResult>,
    pub action_logs: Vec<ActionLog>,
    deck: Deck,
    has_acted: HashSet<String>,
}

impl Hand {
    /// Start a new hand: shuffle, deal two hole cards each, post blinds, and
    /// seat the first actor.
    ///
    /// Heads-up the dealer posts the small blind and acts first preflop; with
    /// three or more players the blinds sit after the dealer and the seat
    /// after the big blind opens.
    pub fn new(
        players: Vec<HandPlayer>,
        dealer_pos: usize,
        open_bet_min: Chips,
        bet_min: Chips,
    ) -> Result<Self, GameError> {
        if players.len() < 2 {
            return Err(GameError::NotEnoughPlayers);
        }
        if open_bet_min == 0 {
            return Err(GameError::NonPositiveOpenBetMin);
        }
        if bet_min == 0 {
            return Err(GameError::NonPositiveBetMin);
        }

        let big_blind = open_bet_min;
        let small_blind = max(1, open_bet_min / 2);

        let (small_blind_pos, big_blind_pos) = if players.len() == 2 {
            let bb = next_eligible_seat(&players, dealer_pos);
            (dealer_pos, bb)
        } else {
            let sb = next_eligible_seat(&players, dealer_pos);
            let bb = next_eligible_seat(&players, sb);
            (sb, bb)
        };

        let mut hand = Self {
            stage: Stage::Preflop,
            dealer_pos,
            small_blind_pos,
            big_blind_pos,
            turn_pos: 0,
            pot: 0,
            community_cards: Vec::with_capacity(5),
            players,
            round_bet: big_blind,
            open_bet_min,
            bet_min,
            result: None,
            action_logs: Vec::new(),
            deck: Deck::new_shuffled(),
            has_acted: HashSet::new(),
        };

        for idx in 0..hand.players.len() {
            let cards = vec![hand.deck.draw(), hand.deck.draw()];
            hand.players[idx].hole_cards = cards;
        }

        hand.post_blind(small_blind_pos, small_blind, "small_blind");
        hand.post_blind(big_blind_pos, big_blind, "big_blind");

        hand.turn_pos = next_turn_seat(&hand.players, big_blind_pos);
        hand.ensure_turn_playable();

        Ok(hand)
    }

    /// Debit a blind, capped at the player's stack.
    fn post_blind(&mut self, pos: usize, amount: Chips, label: &str) {
        let player = &mut self.players[pos];
        let paid = amount.min(player.stack);
        player.stack -= paid;
        player.contributed += paid;
        player.round_contrib += paid;
        if player.stack == 0 {
            player.all_in = true;
        }
        player.last_action = label.to_string();
        self.pot += paid;
        self.log(pos, label, paid);
    }

    fn log(&mut self, pos: usize, action: &str, amount: Chips) {
        let player = &self.players[pos];
        self.action_logs.push(ActionLog {
            user_id: player.user_id.clone(),
            username: player.username.clone(),
            action: action.to_string(),
            amount,
            stage: self.stage,
        });
    }

    /// Apply one voluntary action for the player whose turn it is. On error
    /// the hand is unchanged.
    pub fn apply_action(
        &mut self,
        user_id: &str,
        action: Action,
        amount: Chips,
    ) -> Result<(), GameError> {
        if matches!(self.stage, Stage::Finished | Stage::Showdown) {
            return Err(GameError::GameAlreadyEnded);
        }
        let idx = self.turn_pos;
        {
            let current = &self.players[idx];
            if current.user_id != user_id {
                return Err(GameError::NotYourTurn);
            }
            if current.folded {
                return Err(GameError::PlayerAlreadyFolded);
            }
            if current.all_in {
                return Err(GameError::PlayerAlreadyAllIn);
            }
        }

        match action {
            Action::Check => {
                if self.round_bet != self.players[idx].round_contrib {
                    return Err(GameError::CannotCheckWhenBetExists);
                }
                self.players[idx].last_action = "check".to_string();
                self.log(idx, "check", 0);
            }
            Action::Call => {
                let diff = self.round_bet.saturating_sub(self.players[idx].round_contrib);
                if diff == 0 {
                    return Err(GameError::NothingToCall);
                }
                if self.players[idx].stack == 0 {
                    return Err(GameError::NotEnoughStack);
                }
                let pay = diff.min(self.players[idx].stack);
                let player = &mut self.players[idx];
                player.stack -= pay;
                player.contributed += pay;
                player.round_contrib += pay;
                self.pot += pay;
                let label = if self.players[idx].stack == 0 {
                    self.players[idx].all_in = true;
                    "allin"
                } else {
                    "call"
                };
                self.players[idx].last_action = label.to_string();
                self.log(idx, label, pay);
            }
            Action::Bet | Action::Allin => {
                if self.players[idx].stack == 0 {
                    return Err(GameError::NotEnoughStack);
                }
                let commit = if action == Action::Allin {
                    self.players[idx].stack
                } else {
                    amount
                };
                if commit == 0 {
                    return Err(GameError::BetAmountNonPositive);
                }
                if commit > self.players[idx].stack {
                    return Err(GameError::NotEnoughStack);
                }
                let round_contrib = self.players[idx].round_contrib;
                let raises = round_contrib + commit > self.round_bet;
                if action == Action::Bet {
                    if self.round_bet == 0 {
                        if commit < self.open_bet_min {
                            return Err(GameError::OpenBetTooSmall {
                                min: self.open_bet_min,
                            });
                        }
                    } else {
                        let need = (self.round_bet - round_contrib) + self.bet_min;
                        if commit < need {
                            return Err(GameError::RaiseTooSmall { min: need });
                        }
                    }
                }
                {
                    let player = &mut self.players[idx];
                    player.stack -= commit;
                    player.contributed += commit;
                    player.round_contrib += commit;
                }
                self.pot += commit;
                if raises {
                    self.round_bet = self.players[idx].round_contrib;
                }
                let label = if self.players[idx].stack == 0 || action == Action::Allin {
                    self.players[idx].all_in = true;
                    "allin"
                } else {
                    "bet"
                };
                self.players[idx].last_action = label.to_string();
                self.log(idx, label, commit);
                if raises {
                    // A raise re-opens the round for everyone else still able
                    // to act; a partial all-in call does not.
                    let reopened: Vec<String> = self
                        .players
                        .iter()
                        .filter(|p| p.can_act() && p.user_id != user_id)
                        .map(|p| p.user_id.clone())
                        .collect();
                    for uid in reopened {
                        self.has_acted.remove(&uid);
                    }
                }
            }
            Action::Fold => {
                self.players[idx].folded = true;
                self.players[idx].last_action = "fold".to_string();
                self.log(idx, "fold", 0);
            }
        }

        self.has_acted.insert(user_id.to_string());

        if self.active_count() == 1 {
            self.finish_by_last_standing();
            return Ok(());
        }
        if self.round_complete() {
            self.advance_stage();
            return Ok(());
        }
        self.turn_pos = next_turn_seat(&self.players, self.turn_pos);
        self.ensure_turn_playable();
        Ok(())
    }

    /// Record which hole cards a player chooses to show once the hand is
    /// finished. Bit 0 = first card, bit 1 = second.
    pub fn set_reveal(&mut self, user_id: &str, mask: u8) -> Result<(), GameError> {
        if self.stage != Stage::Finished {
            return Err(GameError::InvalidRevealMask);
        }
        if mask > 3 {
            return Err(GameError::InvalidRevealMask);
        }
        let player = self
            .players
            .iter_mut()
            .find(|p| p.user_id == user_id)
            .ok_or(GameError::PlayerNotInHand)?;
        player.reveal_mask = mask;
        Ok(())
    }

    /// A seated player quit mid-hand: treat it as a fold, keep the turn
    /// pointing at someone playable, and close out the hand or round if the
    /// departure completed it.
    pub fn force_leave(&mut self, user_id: &str) {
        if matches!(self.stage, Stage::Finished | Stage::Showdown) {
            return;
        }
        if let Some(idx) = self.players.iter().position(|p| p.user_id == user_id) {
            self.players[idx].folded = true;
            self.players[idx].last_action = "leave".to_string();
            self.has_acted.insert(user_id.to_string());
        }
        if self.active_count() <= 1 {
            self.finish_by_last_standing();
            return;
        }
        let turn_player = &self.players[self.turn_pos];
        if turn_player.user_id == user_id || !turn_player.can_act() {
            self.turn_pos = next_turn_seat(&self.players, self.turn_pos);
        }
        self.ensure_turn_playable();
        if self.stage != Stage::Finished && self.round_complete() {
            self.advance_stage();
        }
    }

    /// Number of non-folded players.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.players.iter().filter(|p| !p.folded).count()
    }

    /// Per-turn affordances for the seat at `idx`, derived from the same
    /// rules [`Hand::apply_action`] enforces.
    #[must_use]
    pub fn options_for(&self, idx: usize) -> ActionOptions {
        let mut options = ActionOptions::default();
        let Some(player) = self.players.get(idx) else {
            return options;
        };
        let is_turn = idx == self.turn_pos && self.stage != Stage::Finished;
        if !is_turn || player.folded {
            return options;
        }
        let diff = self.round_bet.saturating_sub(player.round_contrib);
        options.can_check = diff == 0;
        options.can_call = diff > 0 && player.stack >= diff;
        if options.can_call {
            options.call_amount = diff;
        }
        options.can_bet = self.round_bet == 0 && player.stack >= self.open_bet_min;
        if options.can_bet {
            options.min_bet = self.open_bet_min;
        }
        if self.round_bet > 0 {
            let need = diff + self.bet_min;
            options.can_raise = player.stack >= need;
            if options.can_raise {
                options.min_raise = need;
            }
        }
        options.can_fold = true;
        options
    }

    /// Everyone still able to act has acted and matched the round bet.
    fn round_complete(&self) -> bool {
        self.players.iter().filter(|p| p.can_act()).all(|p| {
            self.has_acted.contains(&p.user_id) && p.round_contrib == self.round_bet
        })
    }

    fn advance_stage(&mut self) {
        match self.stage {
            Stage::Preflop => {
                self.stage = Stage::Flop;
                for _ in 0..3 {
                    let card = self.deck.draw();
                    self.community_cards.push(card);
                }
            }
            Stage::Flop => {
                self.stage = Stage::Turn;
                let card = self.deck.draw();
                self.community_cards.push(card);
            }
            Stage::Turn => {
                self.stage = Stage::River;
                let card = self.deck.draw();
                self.community_cards.push(card);
            }
            Stage::River => {
                self.stage = Stage::Showdown;
                self.finish_showdown();
                return;
            }
            Stage::Showdown | Stage::Finished => return,
        }
        for player in &mut self.players {
            player.round_contrib = 0;
        }
        let reopened: Vec<String> = self
            .players
            .iter()
            .filter(|p| p.can_act())
            .map(|p| p.user_id.clone())
            .collect();
        for uid in reopened {
            self.has_acted.remove(&uid);
        }
        self.round_bet = 0;
        self.turn_pos = if self.players.len() == 2 {
            self.big_blind_pos
        } else {
            next_turn_seat(&self.players, self.dealer_pos)
        };
        self.ensure_turn_playable();
    }

    /// Everyone but one folded: the last player standing takes the pot.
    pub fn finish_by_last_standing(&mut self) {
        let Some(winner) = self.players.iter_mut().find(|p| !p.folded) else {
            return;
        };
        winner.stack += self.pot;
        winner.won = self.pot;
        self.result = Some(HandResult {
            winners: vec![winner.user_id.clone()],
            reason: "others folded".to_string(),
        });
        self.stage = Stage::Finished;
    }

    /// Evaluate every live hand, return unmatched overcall chips, then walk
    /// the contribution levels awarding each pot layer to the strongest
    /// eligible hand(s).
    fn finish_showdown(&mut self) {
        let active: Vec<usize> = (0..self.players.len())
            .filter(|&i| !self.players[i].folded)
            .collect();
        if active.is_empty() {
            self.result = Some(HandResult {
                winners: Vec::new(),
                reason: "no active players".to_string(),
            });
            self.stage = Stage::Finished;
            return;
        }

        let mut strength: Vec<Option<HandValue>> = vec![None; self.players.len()];
        for &i in &active {
            let mut cards = self.community_cards.clone();
            cards.extend(self.players[i].hole_cards.iter().copied());
            if let Some((value, best_cards, name)) = best_of_seven(&cards) {
                self.players[i].best_hand_name = name.to_string();
                self.players[i].best_hand_cards = best_cards;
                strength[i] = Some(value);
            }
        }

        for player in &mut self.players {
            player.won = 0;
        }

        let refund = self.refund_unmatched_chips(&active);
        self.pot -= refund;

        let levels: BTreeSet<Chips> = active
            .iter()
            .map(|&i| self.players[i].contributed)
            .filter(|&c| c > 0)
            .collect();

        let mut prev: Chips = 0;
        for level in levels {
            let eligible: Vec<usize> = active
                .iter()
                .copied()
                .filter(|&i| self.players[i].contributed >= level)
                .collect();
            if eligible.is_empty() {
                prev = level;
                continue;
            }
            let layer = (level - prev) * eligible.len() as Chips;
            if layer == 0 {
                prev = level;
                continue;
            }
            let winners = best_indices(&eligible, &strength);
            let share = layer / winners.len() as Chips;
            let rest = layer % winners.len() as Chips;
            for (rank, &w) in winners.iter().enumerate() {
                let mut win = share;
                if (rank as Chips) < rest {
                    win += 1;
                }
                self.players[w].stack += win;
                self.players[w].won += win;
            }
            prev = level;
        }

        let mut winner_ids: Vec<String> = self
            .players
            .iter()
            .filter(|p| p.won > 0)
            .map(|p| p.user_id.clone())
            .collect();
        if winner_ids.is_empty() {
            if let Some(&first) = active.first() {
                winner_ids.push(self.players[first].user_id.clone());
            }
        }
        self.result = Some(HandResult {
            winners: winner_ids,
            reason: "showdown".to_string(),
        });
        self.stage = Stage::Finished;
    }

    /// If exactly one live player contributed strictly more than every other
    /// live player, the excess can never be won and goes back to them before
    /// the side-pot walk.
    fn refund_unmatched_chips(&mut self, active: &[usize]) -> Chips {
        if active.len() < 2 {
            return 0;
        }
        let mut contribs: Vec<Chips> = active
            .iter()
            .map(|&i| self.players[i].contributed)
            .collect();
        contribs.sort_unstable_by(|a, b| b.cmp(a));
        if contribs[0] == contribs[1] {
            return 0;
        }
        let refund = contribs[0] - contribs[1];
        let Some(top) = active
            .iter()
            .copied()
            .max_by_key(|&i| self.players[i].contributed)
        else {
            return 0;
        };
        self.players[top].contributed -= refund;
        self.players[top].stack += refund;
        refund
    }

    /// Keep the turn on a playable seat; if no one can act, the round (and
    /// possibly the hand) is over.
    fn ensure_turn_playable(&mut self) {
        for _ in 0..self.players.len() {
            if self.players[self.turn_pos].can_act() {
                return;
            }
            self.turn_pos = next_turn_seat(&self.players, self.turn_pos);
        }
        if self.round_complete() {
            self.advance_stage();
        }
    }
}

/// Next seat after `pos` that has not folded.
fn next_eligible_seat(players: &[HandPlayer], pos: usize) -> usize {
    let n = players.len();
    for i in 1..=n {
        let next = (pos + i) % n;
        if !players[next].folded {
            return next;
        }
    }
    pos
}

/// Next seat after `pos` that can still act (not folded, not all-in).
fn next_turn_seat(players: &[HandPlayer], pos: usize) -> usize {
    let n = players.len();
    for i in 1..=n {
        let next = (pos + i) % n;
        if players[next].can_act() {
            return next;
        }
    }
    pos
}

/// Indices (seat order) of the strongest hands among `eligible`.
fn best_indices(eligible: &[usize], strength: &[Option<HandValue>]) -> Vec<usize> {
    let mut winners: Vec<usize> = Vec::new();
    let mut best: Option<&HandValue> = None;
    for &i in eligible {
        let Some(value) = strength[i].as_ref() else {
            continue;
        };
        match best {
            Some(current) if value < current => {}
            Some(current) if value == current => winners.push(i),
            _ => {
                best = Some(value);
                winners = vec![i];
            }
        }
    }
    if winners.is_empty() {
        winners.extend(eligible.first().copied());
    }
    winners
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::entities::Suit::{Clubs, Diamonds, Hearts};

    fn two_players() -> Vec<HandPlayer> {
        vec![
            HandPlayer::new("u1".into(), "A".into(), 0, 200),
            HandPlayer::new("u2".into(), "B".into(), 1, 200),
        ]
    }

    fn three_players(stack: Chips) -> Vec<HandPlayer> {
        vec![
            HandPlayer::new("u1".into(), "A".into(), 0, stack),
            HandPlayer::new("u2".into(), "B".into(), 1, stack),
            HandPlayer::new("u3".into(), "C".into(), 2, stack),
        ]
    }

    #[test]
    fn test_heads_up_blinds_posted() {
        let hand = Hand::new(two_players(), 0, 10, 10).unwrap();
        assert_eq!(hand.small_blind_pos, 0);
        assert_eq!(hand.big_blind_pos, 1);
        assert_eq!(hand.players[0].stack, 195);
        assert_eq!(hand.players[1].stack, 190);
        assert_eq!(hand.pot, 15);
        assert_eq!(hand.round_bet, 10);
        // Heads-up the small blind (dealer) opens preflop.
        assert_eq!(hand.turn_pos, 0);
        for player in &hand.players {
            assert_eq!(player.hole_cards.len(), 2);
        }
    }

    #[test]
    fn test_three_player_blinds_posted() {
        let hand = Hand::new(three_players(500), 0, 20, 10).unwrap();
        assert_eq!(hand.small_blind_pos, 1);
        assert_eq!(hand.big_blind_pos, 2);
        assert_eq!(hand.players[1].stack, 490);
        assert_eq!(hand.players[2].stack, 480);
        assert_eq!(hand.pot, 30);
        // UTG == dealer here with three seats.
        assert_eq!(hand.turn_pos, 0);
    }

    #[test]
    fn test_requires_two_players_and_positive_blinds() {
        let one = vec![HandPlayer::new("u1".into(), "A".into(), 0, 200)];
        assert_eq!(
            Hand::new(one, 0, 10, 10).unwrap_err(),
            GameError::NotEnoughPlayers
        );
        assert_eq!(
            Hand::new(two_players(), 0, 0, 10).unwrap_err(),
            GameError::NonPositiveOpenBetMin
        );
        assert_eq!(
            Hand::new(two_players(), 0, 10, 0).unwrap_err(),
            GameError::NonPositiveBetMin
        );
    }

    #[test]
    fn test_fold_ends_hand_by_attrition() {
        let mut hand = Hand::new(two_players(), 0, 10, 10).unwrap();
        hand.apply_action("u1", Action::Fold, 0).unwrap();
        assert_eq!(hand.stage, Stage::Finished);
        let result = hand.result.as_ref().unwrap();
        assert_eq!(result.winners, vec!["u2".to_string()]);
        assert_eq!(result.reason, "others folded");
        assert_eq!(hand.players[1].stack, 210);
        assert_eq!(hand.players[0].stack, 195);
    }

    #[test]
    fn test_check_call_to_showdown_conserves_chips() {
        let mut hand = Hand::new(two_players(), 0, 10, 10).unwrap();
        hand.apply_action("u1", Action::Call, 0).unwrap();
        hand.apply_action("u2", Action::Check, 0).unwrap();
        while hand.stage != Stage::Finished {
            let uid = hand.players[hand.turn_pos].user_id.clone();
            hand.apply_action(&uid, Action::Check, 0).unwrap();
        }
        assert!(hand.result.is_some());
        let total: Chips = hand.players.iter().map(|p| p.stack).sum();
        assert_eq!(total, 400);
        let won: Chips = hand.players.iter().map(|p| p.won).sum();
        assert_eq!(won, 20);
    }

    #[test]
    fn test_turn_order_rejections() {
        let mut hand = Hand::new(two_players(), 0, 10, 10).unwrap();
        assert_eq!(
            hand.apply_action("u2", Action::Call, 0).unwrap_err(),
            GameError::NotYourTurn
        );
        // Big blind already matched: small blind cannot check preflop.
        assert_eq!(
            hand.apply_action("u1", Action::Check, 0).unwrap_err(),
            GameError::CannotCheckWhenBetExists
        );
        // Nothing to call once contributions are level.
        hand.apply_action("u1", Action::Call, 0).unwrap();
        assert_eq!(
            hand.apply_action("u2", Action::Call, 0).unwrap_err(),
            GameError::NothingToCall
        );
    }

    #[test]
    fn test_open_bet_and_raise_minimums() {
        let mut hand = Hand::new(three_players(500), 0, 20, 10).unwrap();
        // UTG raise below diff + bet_min is rejected.
        assert_eq!(
            hand.apply_action("u1", Action::Bet, 25).unwrap_err(),
            GameError::RaiseTooSmall { min: 30 }
        );
        hand.apply_action("u1", Action::Bet, 30).unwrap();
        assert_eq!(hand.round_bet, 30);

        // Everyone calls to the flop.
        hand.apply_action("u2", Action::Call, 0).unwrap();
        hand.apply_action("u3", Action::Call, 0).unwrap();
        assert_eq!(hand.stage, Stage::Flop);
        assert_eq!(hand.round_bet, 0);

        // Post-flop the opening bet must reach open_bet_min.
        let uid = hand.players[hand.turn_pos].user_id.clone();
        assert_eq!(
            hand.apply_action(&uid, Action::Bet, 5).unwrap_err(),
            GameError::OpenBetTooSmall { min: 20 }
        );
        assert_eq!(
            hand.apply_action(&uid, Action::Bet, 0).unwrap_err(),
            GameError::BetAmountNonPositive
        );
        hand.apply_action(&uid, Action::Bet, 20).unwrap();
        assert_eq!(hand.round_bet, 20);
    }

    #[test]
    fn test_raise_reopens_round() {
        let mut hand = Hand::new(three_players(500), 0, 20, 10).unwrap();
        hand.apply_action("u1", Action::Call, 0).unwrap();
        hand.apply_action("u2", Action::Call, 0).unwrap();
        // Big blind raises; u1 and u2 must act again before the flop.
        hand.apply_action("u3", Action::Bet, 30).unwrap();
        assert_eq!(hand.stage, Stage::Preflop);
        assert_eq!(hand.round_bet, 50);
        hand.apply_action("u1", Action::Call, 0).unwrap();
        assert_eq!(hand.stage, Stage::Preflop);
        hand.apply_action("u2", Action::Call, 0).unwrap();
        assert_eq!(hand.stage, Stage::Flop);
    }

    #[test]
    fn test_short_all_in_shove_and_cascade_to_showdown() {
        let mut players = three_players(500);
        players[0].stack = 25;
        let mut hand = Hand::new(players, 0, 20, 10).unwrap();
        // A shove of 25 over the 20 blind is below a legal raise for a bet,
        // but stands as an all-in and sets the new round bet.
        hand.apply_action("u1", Action::Allin, 0).unwrap();
        assert_eq!(hand.round_bet, 25);
        hand.apply_action("u2", Action::Call, 0).unwrap();
        hand.apply_action("u3", Action::Call, 0).unwrap();
        assert_eq!(hand.stage, Stage::Flop);

        // Flop: first actor is the seat after the dealer.
        let first = hand.players[hand.turn_pos].user_id.clone();
        assert_eq!(first, "u2");
        // Betting more than the remaining stack is rejected.
        assert_eq!(
            hand.apply_action("u2", Action::Bet, 480).unwrap_err(),
            GameError::NotEnoughStack
        );
        hand.apply_action("u2", Action::Bet, 20).unwrap();
        // u3 shoves over the top, u2 calls; with no one left to act the
        // remaining streets run out and the hand settles.
        hand.apply_action("u3", Action::Allin, 0).unwrap();
        hand.apply_action("u2", Action::Call, 0).unwrap();
        assert_eq!(hand.stage, Stage::Finished);
        assert_eq!(hand.community_cards.len(), 5);
    }

    #[test]
    fn test_all_in_below_round_bet_is_a_call() {
        let mut players = three_players(500);
        players[0].stack = 10; // less than the 20 big blind
        let mut hand = Hand::new(players, 0, 20, 10).unwrap();
        hand.apply_action("u1", Action::Allin, 0).unwrap();
        // Round bet is untouched by a short all-in.
        assert_eq!(hand.round_bet, 20);
        assert!(hand.players[0].all_in);
        // u2 completes, u3 checks the option; round closes.
        hand.apply_action("u2", Action::Call, 0).unwrap();
        hand.apply_action("u3", Action::Check, 0).unwrap();
        assert_eq!(hand.stage, Stage::Flop);
    }

    #[test]
    fn test_reveal_gated_on_finished_and_mask_range() {
        let mut hand = Hand::new(two_players(), 0, 10, 10).unwrap();
        assert_eq!(
            hand.set_reveal("u1", 1).unwrap_err(),
            GameError::InvalidRevealMask
        );
        hand.apply_action("u1", Action::Fold, 0).unwrap();
        assert_eq!(hand.stage, Stage::Finished);
        assert_eq!(
            hand.set_reveal("u1", 4).unwrap_err(),
            GameError::InvalidRevealMask
        );
        assert_eq!(
            hand.set_reveal("ghost", 1).unwrap_err(),
            GameError::PlayerNotInHand
        );
        hand.set_reveal("u1", 2).unwrap();
        assert_eq!(hand.players[0].reveal_mask, 2);
    }

    #[test]
    fn test_force_leave_folds_and_advances_turn() {
        let mut hand = Hand::new(three_players(500), 0, 20, 10).unwrap();
        assert_eq!(hand.turn_pos, 0);
        hand.force_leave("u1");
        assert!(hand.players[0].folded);
        assert_eq!(hand.players[0].last_action, "leave");
        assert_eq!(hand.stage, Stage::Preflop);
        assert_eq!(hand.turn_pos, 1);

        hand.force_leave("u2");
        assert_eq!(hand.stage, Stage::Finished);
        let result = hand.result.as_ref().unwrap();
        assert_eq!(result.winners, vec!["u3".to_string()]);
        assert_eq!(result.reason, "others folded");
    }

    #[test]
    fn test_heads_up_postflop_first_actor_is_big_blind() {
        let mut hand = Hand::new(two_players(), 0, 10, 10).unwrap();
        hand.apply_action("u1", Action::Call, 0).unwrap();
        hand.apply_action("u2", Action::Check, 0).unwrap();
        assert_eq!(hand.stage, Stage::Flop);
        assert_eq!(hand.turn_pos, hand.big_blind_pos);
    }

    // Showdown accounting driven with hand-picked cards, package-internal
    // style: fields are overwritten after construction.
    fn rigged_showdown() -> Hand {
        let mut hand = Hand::new(three_players(10_000), 0, 20, 20).unwrap();
        for player in &mut hand.players {
            player.contributed = 0;
            player.round_contrib = 0;
            player.folded = false;
            player.all_in = false;
            player.won = 0;
        }
        hand.pot = 0;
        hand
    }

    #[test]
    fn test_showdown_overcall_refund_and_side_pot() {
        let mut hand = rigged_showdown();
        hand.players[0].contributed = 6020;
        hand.players[1].contributed = 6020;
        hand.players[2].contributed = 6000;
        hand.pot = 18_040;
        hand.community_cards = vec![
            Card::new(2, Hearts),
            Card::new(3, Hearts),
            Card::new(4, Hearts),
            Card::new(5, Hearts),
            Card::new(9, Clubs),
        ];
        hand.players[2].hole_cards = vec![Card::new(14, Hearts), Card::new(13, Hearts)];
        hand.players[0].hole_cards = vec![Card::new(14, Clubs), Card::new(13, Clubs)];
        hand.players[1].hole_cards = vec![Card::new(12, Diamonds), Card::new(11, Diamonds)];

        hand.finish_showdown();

        // Main pot (3 x 6000) goes to the straight flush; the unmatched 40
        // chips form a side layer decided between the deep stacks, where
        // u1's wheel straight beats u2's queen high.
        assert_eq!(hand.players[2].won, 18_000);
        assert_eq!(hand.players[0].won + hand.players[1].won, 40);
        assert_eq!(hand.players[0].won, 40);
        assert_eq!(hand.players[2].best_hand_name, "straight_flush");
        assert_eq!(hand.stage, Stage::Finished);
        let result = hand.result.as_ref().unwrap();
        assert_eq!(result.reason, "showdown");
        assert!(result.winners.contains(&"u3".to_string()));
    }

    #[test]
    fn test_showdown_single_overcaller_refunded() {
        let mut hand = rigged_showdown();
        hand.players[0].contributed = 500;
        hand.players[1].contributed = 300;
        hand.players[2].folded = true;
        hand.players[2].contributed = 100;
        hand.pot = 900;
        hand.community_cards = vec![
            Card::new(2, Hearts),
            Card::new(7, Clubs),
            Card::new(9, Diamonds),
            Card::new(11, Hearts),
            Card::new(13, Clubs),
        ];
        hand.players[0].hole_cards = vec![Card::new(14, Clubs), Card::new(4, Diamonds)];
        hand.players[1].hole_cards = vec![Card::new(14, Diamonds), Card::new(3, Hearts)];

        hand.finish_showdown();

        // 200 unmatched chips go straight back to seat 0, then the 300-level
        // layer (600 chips) splits on the board-plus-ace tie. The folded
        // player's 100 chips sit in no layer and stay undistributed.
        assert_eq!(hand.players[0].won, 300);
        assert_eq!(hand.players[1].won, 300);
        assert_eq!(hand.players[0].stack, 10_000 + 200 + 300);
        assert_eq!(hand.players[1].stack, 9_990 + 300);
        assert_eq!(hand.pot, 700);
    }

    #[test]
    fn test_split_pot_remainder_goes_to_earlier_seats() {
        let mut hand = rigged_showdown();
        hand.players[0].contributed = 33;
        hand.players[1].contributed = 33;
        hand.players[2].contributed = 35;
        hand.pot = 101;
        hand.community_cards = vec![
            Card::new(2, Hearts),
            Card::new(7, Clubs),
            Card::new(9, Diamonds),
            Card::new(11, Hearts),
            Card::new(13, Clubs),
        ];
        // All three play the board with a matching kicker.
        hand.players[0].hole_cards = vec![Card::new(14, Clubs), Card::new(3, Diamonds)];
        hand.players[1].hole_cards = vec![Card::new(14, Diamonds), Card::new(3, Hearts)];
        hand.players[2].hole_cards = vec![Card::new(14, Hearts), Card::new(3, Clubs)];

        hand.finish_showdown();

        // 2 unmatched chips refund to u3, then 99 splits 33/33/33.
        assert_eq!(hand.players[0].won, 33);
        assert_eq!(hand.players[1].won, 33);
        assert_eq!(hand.players[2].won, 33);
    }

    #[test]
    fn test_pot_equals_sum_of_contributions_during_play() {
        let mut hand = Hand::new(three_players(500), 0, 20, 10).unwrap();
        hand.apply_action("u1", Action::Bet, 60).unwrap();
        hand.apply_action("u2", Action::Call, 0).unwrap();
        let contributed: Chips = hand.players.iter().map(|p| p.contributed).sum();
        assert_eq!(hand.pot, contributed);
    }
}
