//! Friendship lifecycle.
//!
//! Acceptance is symmetric on purpose: it updates the original request row
//! and inserts the reverse row, so `ACCEPTED` exists in both directions
//! and membership checks can stay a get-many + non-empty predicate.

use serde::Serialize;
use tracing::info;

use crate::entities::friendships::FriendshipStatus;
use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::repos;
use crate::services::notifications::{self, kinds};
use crate::state::app_state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendEntry {
    pub user_id: i64,
    pub username: String,
    pub status: FriendshipStatus,
    /// True when the other user initiated and this side has not answered.
    pub incoming_request: bool,
}

pub async fn list(state: &AppState, user_id: i64) -> Result<Vec<FriendEntry>, AppError> {
    let rows = repos::friendships::list_for_user(state.db(), user_id)
        .await
        .map_err(|e| AppError::db("failed to list friendships", e))?;

    let mut entries: Vec<FriendEntry> = Vec::new();
    for row in rows {
        let other_id = if row.user_id == user_id {
            row.friend_id
        } else {
            row.user_id
        };
        // Two accepted rows describe one friendship; keep the first.
        if entries.iter().any(|e| e.user_id == other_id) {
            continue;
        }
        let Some(other) = repos::users::find_by_id(state.db(), other_id)
            .await
            .map_err(|e| AppError::db("failed to load user", e))?
        else {
            continue;
        };
        entries.push(FriendEntry {
            user_id: other_id,
            username: other.username,
            status: row.status,
            incoming_request: row.status == FriendshipStatus::Pending && row.friend_id == user_id,
        });
    }
    Ok(entries)
}

pub async fn request(state: &AppState, user_id: i64, target_id: i64) -> Result<(), AppError> {
    if user_id == target_id {
        return Err(AppError::bad_request(
            ErrorCode::BadRequest,
            "cannot befriend yourself",
        ));
    }
    repos::users::find_by_id(state.db(), target_id)
        .await
        .map_err(|e| AppError::db("failed to load user", e))?
        .ok_or_else(|| AppError::not_found(ErrorCode::UserNotFound, format!("user {target_id}")))?;

    let existing = repos::friendships::find_between(state.db(), user_id, target_id)
        .await
        .map_err(|e| AppError::db("failed to check friendship", e))?;
    if existing
        .iter()
        .any(|row| row.status == FriendshipStatus::Accepted)
    {
        return Err(AppError::conflict(
            ErrorCode::AlreadyFriends,
            "already friends",
        ));
    }
    if existing
        .iter()
        .any(|row| row.status == FriendshipStatus::Blocked)
    {
        return Err(AppError::forbidden(
            ErrorCode::Forbidden,
            "friendship is blocked",
        ));
    }
    if existing
        .iter()
        .any(|row| row.status == FriendshipStatus::Pending)
    {
        return Err(AppError::conflict(
            ErrorCode::AlreadyRequested,
            "a request is already pending",
        ));
    }

    repos::friendships::insert_if_absent(state.db(), user_id, target_id, FriendshipStatus::Pending)
        .await
        .map_err(|e| AppError::db("failed to create request", e))?;
    notifications::notify(state, target_id, kinds::FRIEND_REQUEST, Some(user_id), None).await?;
    info!(user_id, target_id, "friend request sent");
    Ok(())
}

/// Accept a pending request from `requester_id`.
pub async fn accept(state: &AppState, user_id: i64, requester_id: i64) -> Result<(), AppError> {
    let existing = repos::friendships::find_between(state.db(), user_id, requester_id)
        .await
        .map_err(|e| AppError::db("failed to check friendship", e))?;
    let pending = existing.iter().any(|row| {
        row.status == FriendshipStatus::Pending
            && row.user_id == requester_id
            && row.friend_id == user_id
    });
    if !pending {
        return Err(AppError::not_found(
            ErrorCode::NotFound,
            "no pending request from that user",
        ));
    }

    repos::friendships::set_status(
        state.db(),
        requester_id,
        user_id,
        FriendshipStatus::Accepted,
    )
    .await
    .map_err(|e| AppError::db("failed to accept request", e))?;
    repos::friendships::insert_if_absent(
        state.db(),
        user_id,
        requester_id,
        FriendshipStatus::Accepted,
    )
    .await
    .map_err(|e| AppError::db("failed to write reverse row", e))?;

    notifications::notify(state, requester_id, kinds::FRIEND_ACCEPTED, Some(user_id), None)
        .await?;
    info!(user_id, requester_id, "friend request accepted");
    Ok(())
}

/// Block a user; both directions become `BLOCKED`.
pub async fn block(state: &AppState, user_id: i64, target_id: i64) -> Result<(), AppError> {
    if user_id == target_id {
        return Err(AppError::bad_request(
            ErrorCode::BadRequest,
            "cannot block yourself",
        ));
    }
    repos::users::find_by_id(state.db(), target_id)
        .await
        .map_err(|e| AppError::db("failed to load user", e))?
        .ok_or_else(|| AppError::not_found(ErrorCode::UserNotFound, format!("user {target_id}")))?;

    repos::friendships::insert_if_absent(state.db(), user_id, target_id, FriendshipStatus::Blocked)
        .await
        .map_err(|e| AppError::db("failed to write block", e))?;
    repos::friendships::set_status(state.db(), user_id, target_id, FriendshipStatus::Blocked)
        .await
        .map_err(|e| AppError::db("failed to write block", e))?;
    repos::friendships::set_status(state.db(), target_id, user_id, FriendshipStatus::Blocked)
        .await
        .map_err(|e| AppError::db("failed to write reverse block", e))?;

    notifications::notify(state, target_id, kinds::FRIEND_BLOCKED, Some(user_id), None).await?;
    info!(user_id, target_id, "user blocked");
    Ok(())
}
