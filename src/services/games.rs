//! Game lifecycle outside the rules engine: create, list, invite, leave,
//! delete, nudge, media tokens. Anything that changes membership also
//! informs the live game worker so its lobby state tracks the table.

use std::time::SystemTime;

use rand::Rng;
use serde::Serialize;
use tracing::info;

use crate::auth::media_token::mint_room_token;
use crate::engine::GameCommand;
use crate::entities::games::{self, GameStatus};
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::repos;
use crate::services::notifications::{self, kinds};
use crate::state::app_state::AppState;

pub const MIN_PLAYERS: i16 = 2;
/// Two decks comfortably seat up to seven.
pub const MAX_PLAYERS: i16 = 7;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: i64,
    pub status: GameStatus,
    pub created_by: i64,
    pub max_players: i16,
    pub player_count: usize,
    pub members: Vec<GameMember>,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameMember {
    pub user_id: i64,
    pub seat: i16,
    pub final_score: Option<i32>,
}

async fn summarize(state: &AppState, game: games::Model) -> Result<GameSummary, AppError> {
    let members = repos::memberships::find_all_by_game(state.db(), game.id)
        .await
        .map_err(|e| AppError::db("failed to load members", e))?;
    Ok(GameSummary {
        id: game.id,
        status: game.status,
        created_by: game.created_by,
        max_players: game.max_players,
        player_count: members.len(),
        members: members
            .into_iter()
            .map(|m| GameMember {
                user_id: m.user_id,
                seat: m.seat,
                final_score: m.final_score,
            })
            .collect(),
        created_at: game
            .created_at
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| game.created_at.to_string()),
    })
}

pub async fn create_game(
    state: &AppState,
    host_user_id: i64,
    max_players: i16,
) -> Result<GameSummary, AppError> {
    if !(MIN_PLAYERS..=MAX_PLAYERS).contains(&max_players) {
        return Err(AppError::validation(
            ErrorCode::InvalidMaxPlayers,
            format!("maxPlayers must be between {MIN_PLAYERS} and {MAX_PLAYERS}"),
        ));
    }
    let rng_seed: i64 = rand::rng().random();
    let game = repos::games::create(state.db(), host_user_id, max_players, rng_seed)
        .await
        .map_err(|e| AppError::db("failed to create game", e))?;
    repos::memberships::add(state.db(), game.id, host_user_id, 0)
        .await
        .map_err(|e| AppError::db("failed to seat host", e))?;
    info!(game_id = game.id, host_user_id, "game created");
    summarize(state, game).await
}

pub async fn list_games(state: &AppState, user_id: i64) -> Result<Vec<GameSummary>, AppError> {
    let games = repos::games::list_for_user(state.db(), user_id)
        .await
        .map_err(|e| AppError::db("failed to list games", e))?;
    let mut summaries = Vec::with_capacity(games.len());
    for game in games {
        summaries.push(summarize(state, game).await?);
    }
    Ok(summaries)
}

pub async fn get_game(
    state: &AppState,
    user_id: i64,
    game_id: i64,
) -> Result<GameSummary, AppError> {
    let game = repos::games::require_game(state.db(), game_id).await?;
    require_member(state, game_id, user_id).await?;
    summarize(state, game).await
}

/// Lobby games only; the worker announces `evt.gameDeleted` to subscribers
/// and each guest gets a persisted notification.
pub async fn delete_game(state: &AppState, user_id: i64, game_id: i64) -> Result<(), AppError> {
    let game = repos::games::require_game(state.db(), game_id).await?;
    if game.created_by != user_id {
        return Err(AppError::forbidden(
            ErrorCode::NotHost,
            "only the host can delete the game",
        ));
    }
    if game.status != GameStatus::Lobby {
        return Err(AppError::conflict(
            ErrorCode::GameNotLobby,
            "an active game cannot be deleted",
        ));
    }
    let members = repos::memberships::find_all_by_game(state.db(), game_id)
        .await
        .map_err(|e| AppError::db("failed to load members", e))?;

    state.games.notify_deleted(game_id);
    repos::games::delete(state.db(), game_id)
        .await
        .map_err(|e| AppError::db("failed to delete game", e))?;

    for member in members.iter().filter(|m| m.user_id != user_id) {
        notifications::notify(state, member.user_id, kinds::GAME_DELETED, Some(user_id), None)
            .await?;
    }
    info!(game_id, user_id, "game deleted");
    Ok(())
}

pub async fn leave_game(state: &AppState, user_id: i64, game_id: i64) -> Result<(), AppError> {
    let game = repos::games::require_game(state.db(), game_id).await?;
    if game.created_by == user_id {
        return Err(AppError::conflict(
            ErrorCode::Conflict,
            "the host cannot leave; delete the game instead",
        ));
    }
    if game.status != GameStatus::Lobby {
        return Err(AppError::conflict(
            ErrorCode::GameNotLobby,
            "an active game cannot be left",
        ));
    }
    require_member(state, game_id, user_id).await?;
    repos::memberships::remove(state.db(), game_id, user_id)
        .await
        .map_err(|e| AppError::db("failed to remove member", e))?;
    repos::memberships::reseat(state.db(), game_id)
        .await
        .map_err(|e| AppError::db("failed to reseat members", e))?;
    state
        .games
        .send_if_live(game_id, GameCommand::PlayerLeft { user_id });
    info!(game_id, user_id, "player left game");
    Ok(())
}

/// Invite an accepted friend into a Lobby game with a free seat.
pub async fn invite(
    state: &AppState,
    inviter_id: i64,
    game_id: i64,
    target_user_id: i64,
) -> Result<(), AppError> {
    let game = repos::games::require_game(state.db(), game_id).await?;
    require_member(state, game_id, inviter_id).await?;
    if game.status != GameStatus::Lobby {
        return Err(AppError::conflict(
            ErrorCode::GameNotLobby,
            "invitations are only possible in the lobby",
        ));
    }

    repos::users::find_by_id(state.db(), target_user_id)
        .await
        .map_err(|e| AppError::db("failed to load user", e))?
        .ok_or_else(|| {
            AppError::not_found(ErrorCode::UserNotFound, format!("user {target_user_id}"))
        })?;

    // Acceptance writes one row per direction; any accepted row counts.
    if !repos::friendships::are_friends(state.db(), inviter_id, target_user_id)
        .await
        .map_err(|e| AppError::db("failed to check friendship", e))?
    {
        return Err(AppError::forbidden(
            ErrorCode::NotFriends,
            "you can only invite accepted friends",
        ));
    }

    if repos::memberships::is_member(state.db(), game_id, target_user_id)
        .await
        .map_err(|e| AppError::db("failed to check membership", e))?
    {
        return Err(AppError::conflict(
            ErrorCode::AlreadyMember,
            "user is already in the game",
        ));
    }
    let count = repos::memberships::member_count(state.db(), game_id)
        .await
        .map_err(|e| AppError::db("failed to count members", e))?;
    if count >= game.max_players as u64 {
        return Err(AppError::conflict(ErrorCode::GameFull, "no free seats"));
    }

    repos::memberships::add(state.db(), game_id, target_user_id, count as i16)
        .await
        .map_err(|e| AppError::db("failed to seat player", e))?;
    state.games.send_if_live(
        game_id,
        GameCommand::PlayerJoined {
            user_id: target_user_id,
        },
    );
    notifications::notify(
        state,
        target_user_id,
        kinds::GAME_INVITATION,
        Some(inviter_id),
        Some(game_id),
    )
    .await?;
    info!(game_id, inviter_id, target_user_id, "player invited");
    Ok(())
}

/// Guest → host nudge, lobby only.
pub async fn nudge_lobby(state: &AppState, sender_id: i64, game_id: i64) -> Result<(), AppError> {
    let game = repos::games::require_game(state.db(), game_id).await?;
    require_member(state, game_id, sender_id).await?;
    if game.status != GameStatus::Lobby {
        return Err(AppError::conflict(
            ErrorCode::GameNotLobby,
            "lobby nudges only work before the game starts",
        ));
    }
    if game.created_by == sender_id {
        return Err(AppError::bad_request(
            ErrorCode::BadRequest,
            "the host cannot nudge themselves",
        ));
    }
    notifications::notify(
        state,
        game.created_by,
        kinds::GAME_NUDGE,
        Some(sender_id),
        Some(game_id),
    )
    .await
}

/// Member → current turn holder nudge, active games only.
pub async fn nudge_current_player(
    state: &AppState,
    sender_id: i64,
    game_id: i64,
) -> Result<(), AppError> {
    let game = repos::games::require_game(state.db(), game_id).await?;
    require_member(state, game_id, sender_id).await?;
    if game.status != GameStatus::Active {
        return Err(AppError::bad_request(
            ErrorCode::GameNotActive,
            "turn nudges only work in an active game",
        ));
    }
    let holder = state
        .games
        .current_turn_user(game_id)
        .await?
        .ok_or_else(|| {
            AppError::bad_request(ErrorCode::GameNotActive, "no one holds the turn right now")
        })?;
    if holder == sender_id {
        return Err(AppError::bad_request(
            ErrorCode::BadRequest,
            "it is your own turn",
        ));
    }
    notifications::notify(state, holder, kinds::GAME_NUDGE, Some(sender_id), Some(game_id)).await
}

/// Mint a 2h media-room token for a member. The media plane itself is not
/// this server's concern.
pub async fn media_room_token(
    state: &AppState,
    user_id: i64,
    game_id: i64,
) -> Result<String, AppError> {
    repos::games::require_game(state.db(), game_id).await?;
    require_member(state, game_id, user_id).await?;
    mint_room_token(&state.media, game_id, user_id, SystemTime::now())
}

async fn require_member(state: &AppState, game_id: i64, user_id: i64) -> Result<(), AppError> {
    let member = repos::memberships::is_member(state.db(), game_id, user_id)
        .await
        .map_err(|e| AppError::db("failed to check membership", e))?;
    if !member {
        return Err(AppError::forbidden(
            ErrorCode::NotAMember,
            "you are not a member of this game",
        ));
    }
    Ok(())
}
