//! Authoritative Five Crowns game server.
//!
//! The rules engine (`domain`) is pure and deterministic; the hub (`ws` +
//! `engine`) multiplexes sockets into per-game single-writer queues; the
//! REST facade (`routes` + `services`) covers the lobby lifecycle the hub
//! reads back.

pub mod auth;
pub mod config;
pub mod domain;
pub mod engine;
pub mod entities;
pub mod error;
pub mod errors;
pub mod extractors;
pub mod mailer;
pub mod repos;
pub mod routes;
pub mod services;
pub mod state;
pub mod telemetry;
pub mod ws;

pub use error::AppError;
pub use state::AppState;
