//! Per-game authoritative state machine.
//!
//! All mutating commands validate first and mutate only on success, so a
//! failed command leaves the state exactly as it was. The owning game worker
//! is the single writer; nothing outside it ever sees a `&mut GameState`.

use serde::{Deserialize, Serialize};

use crate::domain::cards::{double_deck, Card, MAX_ROUND};
use crate::domain::dealing::{shuffle, SplitMix64};
use crate::domain::melds::{can_extend_meld, can_go_out, multiset_subtract, Meld, MeldSpec};
use crate::errors::domain::{DomainError, NotFoundKind, RuleKind};

pub type Seat = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TurnPhase {
    MustDraw,
    MustDiscard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GameStatus {
    Lobby,
    Active,
    Finished,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub user_id: i64,
    pub seat: Seat,
    /// Insertion-ordered: draws append, so replay reproduces hand order.
    pub hand: Vec<Card>,
    pub melds: Vec<Meld>,
    pub score: u32,
    pub has_gone_out: bool,
}

impl PlayerState {
    fn new(user_id: i64, seat: Seat) -> Self {
        Self {
            user_id,
            seat,
            hand: Vec::new(),
            melds: Vec::new(),
            score: 0,
            has_gone_out: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GameState {
    pub game_id: i64,
    pub players: Vec<PlayerState>,
    /// Top of stock is the last element.
    pub stock: Vec<Card>,
    /// Top of discard is the last element.
    pub discard: Vec<Card>,
    pub turn_index: Seat,
    pub turn_phase: TurnPhase,
    pub round_number: u8,
    pub player_who_went_out: Option<Seat>,
    pub final_turn_phase: bool,
    pub status: GameStatus,
    rng: SplitMix64,
}

impl GameState {
    pub fn new(game_id: i64, rng_seed: u64, user_ids: &[i64]) -> Self {
        let players = user_ids
            .iter()
            .enumerate()
            .map(|(seat, &user_id)| PlayerState::new(user_id, seat))
            .collect();
        Self {
            game_id,
            players,
            stock: Vec::new(),
            discard: Vec::new(),
            turn_index: 0,
            turn_phase: TurnPhase::MustDraw,
            round_number: 1,
            player_who_went_out: None,
            final_turn_phase: false,
            status: GameStatus::Lobby,
            rng: SplitMix64::new(rng_seed),
        }
    }

    /// Cards dealt per player this round.
    pub fn hand_size(&self) -> usize {
        self.round_number as usize + 2
    }

    pub fn seat_of(&self, user_id: i64) -> Option<Seat> {
        self.players.iter().position(|p| p.user_id == user_id)
    }

    pub fn current_player(&self) -> &PlayerState {
        &self.players[self.turn_index]
    }

    /// Total cards across stock, discard, hands, and melds. 116 whenever the
    /// game is Active.
    pub fn card_count(&self) -> usize {
        self.stock.len()
            + self.discard.len()
            + self
                .players
                .iter()
                .map(|p| p.hand.len() + p.melds.iter().map(|m| m.cards.len()).sum::<usize>())
                .sum::<usize>()
    }

    // ----- lobby management -----

    pub fn add_player(&mut self, user_id: i64) -> Result<Seat, DomainError> {
        if self.status != GameStatus::Lobby {
            return Err(DomainError::rule(
                RuleKind::WrongPhase,
                "players can only join a game in the lobby",
            ));
        }
        if self.seat_of(user_id).is_some() {
            return Err(DomainError::conflict(
                crate::errors::domain::ConflictKind::AlreadyMember,
                format!("user {user_id} already seated"),
            ));
        }
        let seat = self.players.len();
        self.players.push(PlayerState::new(user_id, seat));
        Ok(seat)
    }

    pub fn remove_player(&mut self, user_id: i64) -> Result<(), DomainError> {
        if self.status != GameStatus::Lobby {
            return Err(DomainError::rule(
                RuleKind::WrongPhase,
                "players can only leave a game in the lobby",
            ));
        }
        let seat = self
            .seat_of(user_id)
            .ok_or_else(|| DomainError::rule(RuleKind::NotInGame, "user is not seated"))?;
        self.players.remove(seat);
        for (idx, player) in self.players.iter_mut().enumerate() {
            player.seat = idx;
        }
        Ok(())
    }

    // ----- commands -----

    /// Lobby → Active: shuffle, deal round 1, flip the first discard.
    pub fn start_game(&mut self) -> Result<(), DomainError> {
        if self.status != GameStatus::Lobby {
            return Err(DomainError::rule(
                RuleKind::WrongPhase,
                "game already started",
            ));
        }
        if self.players.len() < 2 {
            return Err(DomainError::validation("at least two players required"));
        }
        self.status = GameStatus::Active;
        self.round_number = 1;
        for player in &mut self.players {
            player.score = 0;
        }
        self.deal_round();
        Ok(())
    }

    pub fn draw_from_stock(&mut self, seat: Seat) -> Result<Card, DomainError> {
        self.require_turn(seat, TurnPhase::MustDraw)?;
        if self.stock.is_empty() {
            self.reshuffle_discard_into_stock();
        }
        let card = self.stock.pop().ok_or_else(|| {
            DomainError::rule(RuleKind::WrongPhase, "stock and discard are exhausted")
        })?;
        self.players[seat].hand.push(card);
        self.turn_phase = TurnPhase::MustDiscard;
        Ok(card)
    }

    pub fn draw_from_discard(&mut self, seat: Seat) -> Result<Card, DomainError> {
        self.require_turn(seat, TurnPhase::MustDraw)?;
        let card = self
            .discard
            .pop()
            .ok_or_else(|| DomainError::rule(RuleKind::WrongPhase, "discard pile is empty"))?;
        self.players[seat].hand.push(card);
        self.turn_phase = TurnPhase::MustDiscard;
        Ok(card)
    }

    /// Lay new melds from the hand. Phase is unchanged; the player still
    /// owes a discard.
    pub fn lay_melds(&mut self, seat: Seat, specs: &[MeldSpec]) -> Result<(), DomainError> {
        self.require_turn(seat, TurnPhase::MustDiscard)?;
        if specs.is_empty() {
            return Err(DomainError::rule(RuleKind::InvalidMeld, "no melds given"));
        }

        let round = self.round_number;
        let mut remaining = self.players[seat].hand.clone();
        let mut validated = Vec::with_capacity(specs.len());
        for spec in specs {
            let meld = Meld::new(spec.kind, spec.cards.clone(), round)?;
            remaining = multiset_subtract(&remaining, &meld.cards).ok_or_else(|| {
                DomainError::not_found(NotFoundKind::Card, "meld card not in hand")
            })?;
            validated.push(meld);
        }

        let player = &mut self.players[seat];
        player.hand = remaining;
        player.melds.extend(validated);
        Ok(())
    }

    /// Extend any player's existing meld with cards from the acting
    /// player's hand. Disallowed once the final-turn phase has begun.
    pub fn lay_off(
        &mut self,
        seat: Seat,
        target_seat: Seat,
        meld_idx: usize,
        cards: &[Card],
    ) -> Result<(), DomainError> {
        self.require_turn(seat, TurnPhase::MustDiscard)?;
        if self.final_turn_phase {
            return Err(DomainError::rule(
                RuleKind::FinalTurnPhase,
                "lay-off is disabled during the final turn phase",
            ));
        }
        if cards.is_empty() {
            return Err(DomainError::rule(
                RuleKind::CannotExtendMeld,
                "no cards given",
            ));
        }
        let round = self.round_number;
        let target = self
            .players
            .get(target_seat)
            .ok_or_else(|| DomainError::rule(RuleKind::NotInGame, "no such seat"))?;
        let meld = target
            .melds
            .get(meld_idx)
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Meld, "no such meld"))?;

        let remaining = multiset_subtract(&self.players[seat].hand, cards).ok_or_else(|| {
            DomainError::not_found(NotFoundKind::Card, "lay-off card not in hand")
        })?;
        if !can_extend_meld(meld, cards, round) {
            return Err(DomainError::rule(
                RuleKind::CannotExtendMeld,
                "cards do not extend the target meld",
            ));
        }

        let mut combined = meld.cards.clone();
        combined.extend_from_slice(cards);
        // Re-validates and re-sorts run order with the new cards in place.
        let extended = Meld::new(meld.kind, combined, round)?;

        self.players[seat].hand = remaining;
        self.players[target_seat].melds[meld_idx] = extended;
        Ok(())
    }

    /// Discard one card and advance the turn, closing the round when the
    /// final-turn lap has come back around to the player who went out.
    pub fn discard(&mut self, seat: Seat, card: Card) -> Result<(), DomainError> {
        self.require_turn(seat, TurnPhase::MustDiscard)?;
        let remaining = multiset_subtract(&self.players[seat].hand, &[card])
            .ok_or_else(|| DomainError::not_found(NotFoundKind::Card, "card not in hand"))?;
        self.players[seat].hand = remaining;
        self.discard.push(card);
        self.advance_turn();
        Ok(())
    }

    /// Atomically lay every remaining card as melds and discard the last
    /// one, opening the final-turn phase for everyone else.
    pub fn go_out(
        &mut self,
        seat: Seat,
        specs: &[MeldSpec],
        discard: Card,
    ) -> Result<(), DomainError> {
        self.require_turn(seat, TurnPhase::MustDiscard)?;
        let round = self.round_number;
        let meld_cards: Vec<Vec<Card>> = specs.iter().map(|s| s.cards.clone()).collect();
        if !can_go_out(&self.players[seat].hand, &meld_cards, discard, round) {
            return Err(DomainError::rule(
                RuleKind::CannotGoOut,
                "melds plus discard do not consume the hand exactly",
            ));
        }
        // Declared kinds must hold too (a book labelled as a run is invalid
        // even when the cards could meld some other way).
        for spec in specs {
            Meld::new(spec.kind, spec.cards.clone(), round)?;
        }

        if !specs.is_empty() {
            self.lay_melds(seat, specs)?;
        }
        self.players[seat].has_gone_out = true;
        if self.player_who_went_out.is_none() {
            self.player_who_went_out = Some(seat);
        }
        self.discard(seat, discard)?;
        // discard() may have closed the round, which clears the marker.
        if self.player_who_went_out.is_some() {
            self.final_turn_phase = true;
        }
        Ok(())
    }

    // ----- internals -----

    fn require_turn(&self, seat: Seat, phase: TurnPhase) -> Result<(), DomainError> {
        if self.status != GameStatus::Active {
            return Err(DomainError::rule(
                RuleKind::GameNotActive,
                "game is not active",
            ));
        }
        if seat >= self.players.len() {
            return Err(DomainError::rule(RuleKind::NotInGame, "no such seat"));
        }
        if seat != self.turn_index {
            return Err(DomainError::rule(
                RuleKind::NotYourTurn,
                format!("it is seat {}'s turn", self.turn_index),
            ));
        }
        if self.turn_phase != phase {
            return Err(DomainError::rule(
                RuleKind::WrongPhase,
                format!("expected {:?}", self.turn_phase),
            ));
        }
        Ok(())
    }

    fn deal_round(&mut self) {
        let mut deck = double_deck();
        shuffle(&mut deck, &mut self.rng);

        for player in &mut self.players {
            player.hand.clear();
            player.melds.clear();
            player.has_gone_out = false;
        }
        self.discard.clear();
        self.player_who_went_out = None;
        self.final_turn_phase = false;

        self.stock = deck;
        for _ in 0..self.hand_size() {
            for seat in 0..self.players.len() {
                let card = self.stock.pop().expect("full deck covers every deal");
                self.players[seat].hand.push(card);
            }
        }
        let flip = self.stock.pop().expect("full deck covers every deal");
        self.discard.push(flip);

        // Deal rotates with the round so seat 0 is not always first.
        self.turn_index = (self.round_number as usize - 1) % self.players.len();
        self.turn_phase = TurnPhase::MustDraw;
    }

    /// All but the top discard go back into the stock, shuffled by the next
    /// draws of the game's RNG stream so replay reproduces the order.
    fn reshuffle_discard_into_stock(&mut self) {
        if self.discard.len() <= 1 {
            return;
        }
        let top = self.discard.pop().expect("checked non-empty");
        self.stock.append(&mut self.discard);
        self.discard.push(top);
        shuffle(&mut self.stock, &mut self.rng);
    }

    fn advance_turn(&mut self) {
        let next = (self.turn_index + 1) % self.players.len();
        if self.player_who_went_out == Some(next) {
            // Everyone else has taken their one final turn.
            self.end_round();
            return;
        }
        self.turn_index = next;
        self.turn_phase = TurnPhase::MustDraw;
    }

    fn end_round(&mut self) {
        for player in &mut self.players {
            let points: u32 = player
                .hand
                .iter()
                .map(|c| c.point_value(self.round_number))
                .sum();
            player.score += points;
        }
        if self.round_number >= MAX_ROUND {
            self.status = GameStatus::Finished;
            self.player_who_went_out = None;
            self.final_turn_phase = false;
            for player in &mut self.players {
                player.hand.clear();
                player.melds.clear();
            }
            self.stock.clear();
            self.discard.clear();
            return;
        }
        self.round_number += 1;
        self.deal_round();
    }

    /// Lowest total wins. Meaningful once the game is Finished.
    pub fn winner_seats(&self) -> Vec<Seat> {
        let Some(best) = self.players.iter().map(|p| p.score).min() else {
            return Vec::new();
        };
        self.players
            .iter()
            .filter(|p| p.score == best)
            .map(|p| p.seat)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cards::DECK_SIZE;

    fn started(seed: u64, players: usize) -> GameState {
        let user_ids: Vec<i64> = (1..=players as i64).collect();
        let mut state = GameState::new(1, seed, &user_ids);
        state.start_game().unwrap();
        state
    }

    #[test]
    fn start_deals_round_one() {
        let state = started(42, 3);
        assert_eq!(state.status, GameStatus::Active);
        assert_eq!(state.round_number, 1);
        assert_eq!(state.turn_index, 0);
        assert_eq!(state.turn_phase, TurnPhase::MustDraw);
        for player in &state.players {
            assert_eq!(player.hand.len(), 3);
        }
        assert_eq!(state.discard.len(), 1);
        assert_eq!(state.card_count(), DECK_SIZE);
    }

    #[test]
    fn start_requires_two_players() {
        let mut state = GameState::new(1, 7, &[10]);
        assert!(state.start_game().is_err());
    }

    #[test]
    fn draw_then_discard_advances_turn() {
        let mut state = started(42, 2);
        let drawn = state.draw_from_stock(0).unwrap();
        assert_eq!(state.turn_phase, TurnPhase::MustDiscard);
        assert_eq!(state.players[0].hand.len(), 4);
        state.discard(0, drawn).unwrap();
        assert_eq!(state.turn_index, 1);
        assert_eq!(state.turn_phase, TurnPhase::MustDraw);
        assert_eq!(state.card_count(), DECK_SIZE);
    }

    #[test]
    fn wrong_seat_and_phase_are_rejected_without_mutation() {
        let mut state = started(42, 2);
        let before = state.clone();
        assert!(state.draw_from_stock(1).is_err());
        assert!(state
            .discard(0, state.players[0].hand[0])
            .is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn draw_from_empty_discard_is_rejected() {
        let mut state = started(42, 2);
        state.discard.clear();
        let err = state.draw_from_discard(0).unwrap_err();
        assert_eq!(err.rule_kind(), Some(RuleKind::WrongPhase));
    }

    #[test]
    fn stock_exhaustion_reshuffles_discard() {
        let mut state = started(42, 2);
        // Move all but one stock card onto the discard pile.
        while state.stock.len() > 1 {
            let card = state.stock.pop().unwrap();
            state.discard.push(card);
        }
        state.stock.clear();
        let top_before = *state.discard.last().unwrap();
        state.draw_from_stock(0).unwrap();
        assert_eq!(state.discard.len(), 1);
        assert_eq!(*state.discard.last().unwrap(), top_before);
        assert_eq!(state.card_count(), DECK_SIZE);
    }

    #[test]
    fn finishing_the_last_round_clears_table_melds() {
        use crate::domain::melds::MeldKind;

        let mut state = started(5, 2);
        state.round_number = MAX_ROUND;
        // Seat 1 has a book on the table going into the final round end.
        state.players[1].melds = vec![Meld::new(
            MeldKind::Book,
            vec![
                "HQ".parse().unwrap(),
                "SQ".parse().unwrap(),
                "DQ".parse().unwrap(),
            ],
            MAX_ROUND,
        )
        .unwrap()];

        state.players[0].hand = vec![
            "H4".parse().unwrap(),
            "H5".parse().unwrap(),
            "H6".parse().unwrap(),
            "C8".parse().unwrap(),
        ];
        state.turn_phase = TurnPhase::MustDiscard;
        state
            .go_out(
                0,
                &[MeldSpec {
                    kind: MeldKind::Run,
                    cards: vec![
                        "H4".parse().unwrap(),
                        "H5".parse().unwrap(),
                        "H6".parse().unwrap(),
                    ],
                }],
                "C8".parse().unwrap(),
            )
            .unwrap();

        let drawn = state.draw_from_stock(1).unwrap();
        state.discard(1, drawn).unwrap();

        assert_eq!(state.status, GameStatus::Finished);
        assert!(state.players.iter().all(|p| p.melds.is_empty()));
        assert!(state.players.iter().all(|p| p.hand.is_empty()));
        assert_eq!(state.card_count(), 0);
    }

    #[test]
    fn lobby_membership_changes_reseat() {
        let mut state = GameState::new(1, 7, &[10, 11, 12]);
        state.remove_player(11).unwrap();
        assert_eq!(state.players.len(), 2);
        assert_eq!(state.players[1].user_id, 12);
        assert_eq!(state.players[1].seat, 1);
        let seat = state.add_player(13).unwrap();
        assert_eq!(seat, 2);
    }
}
