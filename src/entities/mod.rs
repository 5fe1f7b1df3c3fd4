pub mod friendships;
pub mod game_events;
pub mod game_players;
pub mod games;
pub mod notifications;
pub mod users;
