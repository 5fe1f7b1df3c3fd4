use std::time::{SystemTime, UNIX_EPOCH};

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::{Claims, TokenKind};
use crate::error::AppError;
use crate::state::security_config::SecurityConfig;

/// Short TTLs for single-purpose mail tokens.
const VERIFY_EMAIL_TTL_SECS: i64 = 24 * 60 * 60;
const PASSWORD_RESET_TTL_SECS: i64 = 60 * 60;

fn unix_seconds(now: SystemTime) -> Result<i64, AppError> {
    now.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .map_err(|_| AppError::internal("system clock is before the epoch"))
}

fn mint(
    user_id: i64,
    kind: TokenKind,
    ttl_secs: i64,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<String, AppError> {
    let iat = unix_seconds(now)?;
    let claims = Claims {
        sub: user_id.to_string(),
        kind,
        iat,
        exp: iat + ttl_secs,
    };
    encode(
        &Header::new(security.algorithm),
        &claims,
        &EncodingKey::from_secret(&security.jwt_secret),
    )
    .map_err(|e| AppError::internal(format!("failed to encode JWT: {e}")))
}

/// Mint a session access token with the configured TTL (default 7 days).
pub fn mint_access_token(
    user_id: i64,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<String, AppError> {
    mint(user_id, TokenKind::Access, security.session_ttl_secs, now, security)
}

/// Refresh counterpart: 4x the session TTL, exchangeable for a new access
/// token only.
pub fn mint_refresh_token(
    user_id: i64,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<String, AppError> {
    mint(
        user_id,
        TokenKind::Refresh,
        security.session_ttl_secs * 4,
        now,
        security,
    )
}

pub fn mint_verify_email_token(
    user_id: i64,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<String, AppError> {
    mint(user_id, TokenKind::VerifyEmail, VERIFY_EMAIL_TTL_SECS, now, security)
}

pub fn mint_password_reset_token(
    user_id: i64,
    now: SystemTime,
    security: &SecurityConfig,
) -> Result<String, AppError> {
    mint(
        user_id,
        TokenKind::PasswordReset,
        PASSWORD_RESET_TTL_SECS,
        now,
        security,
    )
}

/// Verify a token and require the expected purpose.
///
/// Errors:
/// - expired signature → `UNAUTHORIZED_EXPIRED_JWT`
/// - anything else (bad signature, malformed, wrong kind) → `UNAUTHORIZED_INVALID_JWT`
pub fn verify_token(
    token: &str,
    expected: TokenKind,
    security: &SecurityConfig,
) -> Result<Claims, AppError> {
    // Default Validation already checks exp; pin the configured algorithm.
    let validation = Validation::new(security.algorithm);
    let claims = decode::<Claims>(
        token,
        &DecodingKey::from_secret(&security.jwt_secret),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::unauthorized_expired_jwt(),
        _ => AppError::unauthorized_invalid_jwt(),
    })?;

    if claims.kind != expected {
        return Err(AppError::unauthorized_invalid_jwt());
    }
    Ok(claims)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::errors::ErrorCode;

    fn security() -> SecurityConfig {
        SecurityConfig::new(b"test_secret_key_for_testing_purposes_only".to_vec(), 7)
    }

    #[test]
    fn mint_and_verify_roundtrip() {
        let security = security();
        let now = SystemTime::now();

        let token = mint_access_token(42, now, &security).unwrap();
        let claims = verify_token(&token, TokenKind::Access, &security).unwrap();

        assert_eq!(claims.user_id(), Some(42));
        assert_eq!(claims.kind, TokenKind::Access);
        assert_eq!(claims.exp, claims.iat + 7 * 24 * 60 * 60);
    }

    #[test]
    fn expired_token_is_rejected() {
        let security = security();
        // Minted far enough in the past that even the 7-day TTL has lapsed.
        let then = SystemTime::now() - Duration::from_secs(8 * 24 * 60 * 60);
        let token = mint_access_token(42, then, &security).unwrap();

        match verify_token(&token, TokenKind::Access, &security) {
            Err(AppError::Unauthorized { code }) => {
                assert_eq!(code, ErrorCode::UnauthorizedExpiredJwt)
            }
            other => panic!("expected expired-token error, got {other:?}"),
        }
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = mint_access_token(42, SystemTime::now(), &security()).unwrap();
        let other = SecurityConfig::new(b"a_completely_different_secret".to_vec(), 7);

        match verify_token(&token, TokenKind::Access, &other) {
            Err(AppError::Unauthorized { code }) => {
                assert_eq!(code, ErrorCode::UnauthorizedInvalidJwt)
            }
            other => panic!("expected invalid-token error, got {other:?}"),
        }
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let security = security();
        let token = mint_refresh_token(42, SystemTime::now(), &security).unwrap();
        assert!(verify_token(&token, TokenKind::Access, &security).is_err());
        assert!(verify_token(&token, TokenKind::Refresh, &security).is_ok());
    }

    #[test]
    fn purpose_tokens_are_scoped() {
        let security = security();
        let now = SystemTime::now();
        let verify = mint_verify_email_token(7, now, &security).unwrap();
        let reset = mint_password_reset_token(7, now, &security).unwrap();
        assert!(verify_token(&verify, TokenKind::VerifyEmail, &security).is_ok());
        assert!(verify_token(&verify, TokenKind::PasswordReset, &security).is_err());
        assert!(verify_token(&reset, TokenKind::PasswordReset, &security).is_ok());
    }
}
