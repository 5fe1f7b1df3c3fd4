//! Account lifecycle: signup, login, verification, password reset, stats.

use std::collections::HashMap;
use std::time::SystemTime;

use sea_orm::DbErr;
use serde::Serialize;
use tracing::info;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::{
    mint_access_token, mint_password_reset_token, mint_refresh_token, mint_verify_email_token,
    verify_token,
};
use crate::auth::password::{hash_password, verify_password, MIN_PASSWORD_LEN};
use crate::entities::users;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::repos;
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    pub games_played: u64,
    pub games_won: u64,
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let well_formed = email.len() <= 254
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !well_formed {
        return Err(AppError::validation(
            ErrorCode::InvalidEmail,
            format!("not a valid email address: {email}"),
        ));
    }
    Ok(())
}

pub async fn signup(
    state: &AppState,
    email: &str,
    username: &str,
    password: &str,
) -> Result<users::Model, AppError> {
    validate_email(email)?;
    if password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            ErrorCode::InvalidPassword,
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    let username = username.trim();
    if username.is_empty() {
        return Err(AppError::validation(
            ErrorCode::ValidationError,
            "username must not be empty",
        ));
    }

    if repos::users::find_by_email(state.db(), email)
        .await
        .map_err(|e| AppError::db("failed to check email", e))?
        .is_some()
    {
        return Err(AppError::conflict(
            ErrorCode::UniqueEmail,
            "an account with this email already exists",
        ));
    }

    let hash = hash_password(password)?;
    let user = repos::users::create_user(state.db(), email, username, &hash)
        .await
        .map_err(|e| match e {
            // Lost a signup race on the unique index.
            DbErr::Exec(_) | DbErr::Query(_) => AppError::conflict(
                ErrorCode::UniqueEmail,
                "an account with this email already exists",
            ),
            other => AppError::db("failed to create user", other),
        })?;

    let token = mint_verify_email_token(user.id, SystemTime::now(), &state.security)?;
    let link = format!("{}/auth/verify?token={token}", state.public_base_url);
    state
        .mailer
        .send(
            email,
            "Verify your Five Crowns account",
            &format!("Welcome, {username}! Confirm your address: {link}"),
        )
        .await?;

    info!(user_id = user.id, "user signed up");
    Ok(user)
}

pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<(users::Model, SessionTokens), AppError> {
    let user = repos::users::find_by_email(state.db(), email)
        .await
        .map_err(|e| AppError::db("failed to load user", e))?
        .ok_or_else(AppError::unauthorized)?;

    if !verify_password(password, &user.password_hash) {
        return Err(AppError::unauthorized());
    }

    let now = SystemTime::now();
    let tokens = SessionTokens {
        access_token: mint_access_token(user.id, now, &state.security)?,
        refresh_token: mint_refresh_token(user.id, now, &state.security)?,
    };
    Ok((user, tokens))
}

pub async fn verify_email(state: &AppState, token: &str) -> Result<(), AppError> {
    let claims = verify_token(token, TokenKind::VerifyEmail, &state.security)?;
    let user_id = claims.user_id().ok_or_else(AppError::unauthorized_invalid_jwt)?;
    repos::users::mark_email_verified(state.db(), user_id)
        .await
        .map_err(|e| AppError::db("failed to mark email verified", e))?;
    info!(user_id, "email verified");
    Ok(())
}

/// Exchange a refresh token for a fresh access token.
pub async fn refresh(state: &AppState, refresh_token: &str) -> Result<String, AppError> {
    let claims = verify_token(refresh_token, TokenKind::Refresh, &state.security)?;
    let user_id = claims.user_id().ok_or_else(AppError::unauthorized_invalid_jwt)?;
    // The account must still exist.
    repos::users::find_by_id(state.db(), user_id)
        .await
        .map_err(|e| AppError::db("failed to load user", e))?
        .ok_or_else(AppError::unauthorized)?;
    mint_access_token(user_id, SystemTime::now(), &state.security)
}

/// Always succeeds from the caller's point of view so account existence is
/// not probeable.
pub async fn request_password_reset(state: &AppState, email: &str) -> Result<(), AppError> {
    let Some(user) = repos::users::find_by_email(state.db(), email)
        .await
        .map_err(|e| AppError::db("failed to load user", e))?
    else {
        return Ok(());
    };
    let token = mint_password_reset_token(user.id, SystemTime::now(), &state.security)?;
    let link = format!("{}/auth/password-reset?token={token}", state.public_base_url);
    state
        .mailer
        .send(
            email,
            "Reset your Five Crowns password",
            &format!("Reset your password here: {link}"),
        )
        .await?;
    Ok(())
}

pub async fn confirm_password_reset(
    state: &AppState,
    token: &str,
    new_password: &str,
) -> Result<(), AppError> {
    if new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            ErrorCode::InvalidPassword,
            format!("password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    let claims = verify_token(token, TokenKind::PasswordReset, &state.security)?;
    let user_id = claims.user_id().ok_or_else(AppError::unauthorized_invalid_jwt)?;
    let hash = hash_password(new_password)?;
    repos::users::update_password_hash(state.db(), user_id, &hash)
        .await
        .map_err(|e| AppError::db("failed to update password", e))?;
    info!(user_id, "password reset");
    Ok(())
}

/// Played/won counts over finished games. A game counts as won when the
/// user's final score equals the game's minimum (ties share the win).
pub async fn stats(state: &AppState, user_id: i64) -> Result<UserStats, AppError> {
    let rows = repos::memberships::finished_rows_for_user(state.db(), user_id)
        .await
        .map_err(|e| AppError::db("failed to load finished games", e))?;

    let mut won = 0u64;
    let mut minimums: HashMap<i64, i32> = HashMap::new();
    for row in &rows {
        let own = row.final_score.unwrap_or(i32::MAX);
        let min = match minimums.get(&row.game_id) {
            Some(min) => *min,
            None => {
                let members = repos::memberships::find_all_by_game(state.db(), row.game_id)
                    .await
                    .map_err(|e| AppError::db("failed to load game members", e))?;
                let min = members
                    .iter()
                    .filter_map(|m| m.final_score)
                    .min()
                    .unwrap_or(i32::MAX);
                minimums.insert(row.game_id, min);
                min
            }
        };
        if own == min {
            won += 1;
        }
    }

    Ok(UserStats {
        games_played: rows.len() as u64,
        games_won: won,
    })
}
