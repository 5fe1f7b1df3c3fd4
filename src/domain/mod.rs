//! Rules engine: pure types and the authoritative per-game state machine.
//!
//! Nothing in this module touches the network or the database. The game
//! worker in `crate::engine` owns a `GameState` and is its single writer.

pub mod cards;
pub mod dealing;
pub mod events;
pub mod melds;
pub mod projection;
pub mod state;

pub use cards::{wild_rank_for_round, Card, Rank, Suit, DECK_SIZE, MAX_ROUND};
pub use melds::{
    can_extend_meld, can_go_out, is_valid_book, is_valid_meld, is_valid_run, meld_kind, Meld,
    MeldKind, MeldSpec,
};
pub use projection::{project_for, GameProjection};
pub use state::{GameState, GameStatus, PlayerState, Seat, TurnPhase};
