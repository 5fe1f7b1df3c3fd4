//! Repository layer: free async functions generic over `ConnectionTrait`,
//! one module per table.

pub mod friendships;
pub mod game_events;
pub mod games;
pub mod memberships;
pub mod notifications;
pub mod users;
