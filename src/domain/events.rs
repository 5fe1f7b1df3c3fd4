//! Typed game events and event-log replay.
//!
//! Every state-changing command is recorded as one event. Replaying a
//! game's log from seq 0 into a freshly-seeded [`GameState`] reproduces the
//! live state exactly; draw events carry the drawn card so replay can
//! detect divergence instead of silently corrupting a game.

use serde::{Deserialize, Serialize};

use crate::domain::cards::Card;
use crate::domain::melds::MeldSpec;
use crate::domain::state::{GameState, Seat};
use crate::errors::domain::DomainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GameEvent {
    GameStarted,
    DrewFromStock { seat: Seat, card: Card },
    DrewFromDiscard { seat: Seat, card: Card },
    LaidMelds { seat: Seat, melds: Vec<MeldSpec> },
    LaidOff {
        seat: Seat,
        target_seat: Seat,
        meld_idx: usize,
        cards: Vec<Card>,
    },
    Discarded { seat: Seat, card: Card },
    WentOut {
        seat: Seat,
        melds: Vec<MeldSpec>,
        discard: Card,
    },
}

impl GameEvent {
    /// Stable kind string persisted in the `game_events.type` column.
    pub fn kind(&self) -> &'static str {
        match self {
            GameEvent::GameStarted => "gameStarted",
            GameEvent::DrewFromStock { .. } => "drewFromStock",
            GameEvent::DrewFromDiscard { .. } => "drewFromDiscard",
            GameEvent::LaidMelds { .. } => "laidMelds",
            GameEvent::LaidOff { .. } => "laidOff",
            GameEvent::Discarded { .. } => "discarded",
            GameEvent::WentOut { .. } => "wentOut",
        }
    }

    pub fn seat(&self) -> Option<Seat> {
        match self {
            GameEvent::GameStarted => None,
            GameEvent::DrewFromStock { seat, .. }
            | GameEvent::DrewFromDiscard { seat, .. }
            | GameEvent::LaidMelds { seat, .. }
            | GameEvent::LaidOff { seat, .. }
            | GameEvent::Discarded { seat, .. }
            | GameEvent::WentOut { seat, .. } => Some(*seat),
        }
    }
}

/// Apply one recorded event to the state. Draw events verify the recorded
/// card against the deterministic stream.
pub fn apply(state: &mut GameState, event: &GameEvent) -> Result<(), DomainError> {
    match event {
        GameEvent::GameStarted => state.start_game(),
        GameEvent::DrewFromStock { seat, card } => {
            let drawn = state.draw_from_stock(*seat)?;
            if drawn != *card {
                return Err(DomainError::validation(format!(
                    "replay divergence: recorded stock draw {card}, dealt {drawn}"
                )));
            }
            Ok(())
        }
        GameEvent::DrewFromDiscard { seat, card } => {
            let drawn = state.draw_from_discard(*seat)?;
            if drawn != *card {
                return Err(DomainError::validation(format!(
                    "replay divergence: recorded discard draw {card}, took {drawn}"
                )));
            }
            Ok(())
        }
        GameEvent::LaidMelds { seat, melds } => state.lay_melds(*seat, melds),
        GameEvent::LaidOff {
            seat,
            target_seat,
            meld_idx,
            cards,
        } => state.lay_off(*seat, *target_seat, *meld_idx, cards),
        GameEvent::Discarded { seat, card } => state.discard(*seat, *card),
        GameEvent::WentOut {
            seat,
            melds,
            discard,
        } => state.go_out(*seat, melds, *discard),
    }
}

/// Rebuild a game by replaying its full event log over a fresh state.
pub fn replay(
    game_id: i64,
    rng_seed: u64,
    user_ids: &[i64],
    events: &[GameEvent],
) -> Result<GameState, DomainError> {
    let mut state = GameState::new(game_id, rng_seed, user_ids);
    for event in events {
        apply(&mut state, event)?;
    }
    Ok(state)
}
