//! Media-room access tokens.
//!
//! The server mints room tokens for the external media service but never
//! connects to the media plane itself. Tokens are signed with the media
//! service's shared secret, which is distinct from the session-signing key.

use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::config::MediaConfig;
use crate::error::AppError;

const ROOM_TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct MediaClaims {
    /// API key of this server at the media service.
    pub iss: String,
    /// Participant identity: the numeric user id.
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub video: VideoGrants,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoGrants {
    pub room: String,
    pub room_join: bool,
    pub can_publish: bool,
    pub can_subscribe: bool,
}

/// Room name for a game's audio/video room.
pub fn room_for_game(game_id: i64) -> String {
    format!("game-{game_id}")
}

/// Mint a 2-hour room token for a game member.
pub fn mint_room_token(
    media: &MediaConfig,
    game_id: i64,
    user_id: i64,
    now: SystemTime,
) -> Result<String, AppError> {
    let iat = now
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .map_err(|_| AppError::internal("system clock is before the epoch"))?;

    let claims = MediaClaims {
        iss: media.api_key.clone(),
        sub: user_id.to_string(),
        iat,
        exp: iat + ROOM_TOKEN_TTL_SECS,
        video: VideoGrants {
            room: room_for_game(game_id),
            room_join: true,
            can_publish: true,
            can_subscribe: true,
        },
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(media.api_secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("failed to encode media token: {e}")))
}

#[cfg(test)]
mod tests {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    use super::*;

    fn media_config() -> MediaConfig {
        MediaConfig {
            url: "https://media.example".to_string(),
            api_key: "api-key".to_string(),
            api_secret: "media-shared-secret".to_string(),
        }
    }

    #[test]
    fn room_token_carries_grants() {
        let media = media_config();
        let token = mint_room_token(&media, 17, 42, SystemTime::now()).unwrap();

        let decoded = decode::<MediaClaims>(
            &token,
            &DecodingKey::from_secret(media.api_secret.as_bytes()),
            &Validation::default(),
        )
        .unwrap()
        .claims;

        assert_eq!(decoded.iss, "api-key");
        assert_eq!(decoded.sub, "42");
        assert_eq!(decoded.video.room, "game-17");
        assert!(decoded.video.room_join);
        assert!(decoded.video.can_publish);
        assert!(decoded.video.can_subscribe);
        assert_eq!(decoded.exp, decoded.iat + 2 * 60 * 60);
    }

    #[test]
    fn session_secret_does_not_verify_room_tokens() {
        let media = media_config();
        let token = mint_room_token(&media, 17, 42, SystemTime::now()).unwrap();
        let wrong = decode::<MediaClaims>(
            &token,
            &DecodingKey::from_secret(b"session-secret"),
            &Validation::default(),
        );
        assert!(wrong.is_err());
    }
}
