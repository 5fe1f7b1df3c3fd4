//! Path extractor for `{game_id}` segments.

use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};

use crate::error::AppError;
use crate::errors::ErrorCode;

#[derive(Debug, Clone, Copy)]
pub struct GameId(pub i64);

impl FromRequest for GameId {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let parsed = req
            .match_info()
            .get("game_id")
            .and_then(|raw| raw.parse::<i64>().ok())
            .filter(|id| *id > 0)
            .map(GameId)
            .ok_or_else(|| {
                AppError::validation(ErrorCode::InvalidGameId, "game id must be a positive integer")
            });
        ready(parsed)
    }
}
