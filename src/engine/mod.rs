//! Game engine plumbing: per-game single-writer workers plus the registry
//! that owns their queues.

pub mod registry;
pub mod worker;

pub use registry::{GameHandle, GameRegistry};
pub use worker::{GameCommand, PlayerAction};
