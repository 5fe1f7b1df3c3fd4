//! Notification persistence and delivery.
//!
//! Delivery policy: always persist a row so late-connecting clients can
//! fetch history, then push immediately to every live socket of the
//! target. Notifications are never serialized through a game's command
//! queue.

use time::format_description::well_known::Rfc3339;
use tracing::debug;

use crate::entities::notifications;
use crate::error::AppError;
use crate::repos;
use crate::state::app_state::AppState;
use crate::ws::protocol::{NotificationPush, ServerMsg};

/// Notification kinds as they appear on the wire and in the table.
pub mod kinds {
    pub const GAME_INVITATION: &str = "gameInvitation";
    pub const GAME_DELETED: &str = "gameDeleted";
    pub const FRIEND_REQUEST: &str = "friendRequest";
    pub const FRIEND_ACCEPTED: &str = "friendAccepted";
    pub const FRIEND_BLOCKED: &str = "friendBlocked";
    pub const GAME_NUDGE: &str = "gameNudge";
}

pub fn to_push(row: &notifications::Model) -> NotificationPush {
    NotificationPush {
        id: row.id,
        kind: row.kind.clone(),
        from_user_id: row.from_user_id,
        game_id: row.game_id,
        created_at: row
            .created_at
            .format(&Rfc3339)
            .unwrap_or_else(|_| row.created_at.to_string()),
        status: match row.status {
            notifications::NotificationStatus::Unread => "unread".to_string(),
            notifications::NotificationStatus::Read => "read".to_string(),
        },
    }
}

/// Persist and deliver one notification.
pub async fn notify(
    state: &AppState,
    user_id: i64,
    kind: &str,
    from_user_id: Option<i64>,
    game_id: Option<i64>,
) -> Result<(), AppError> {
    let row = repos::notifications::create(state.db(), user_id, kind, from_user_id, game_id)
        .await
        .map_err(|e| AppError::db("failed to persist notification", e))?;

    let delivered = state.hub.send_to_user(
        user_id,
        ServerMsg::Notification {
            notification: to_push(&row),
        },
    );
    debug!(user_id, kind, delivered, "notification dispatched");
    Ok(())
}

pub async fn list(state: &AppState, user_id: i64) -> Result<Vec<NotificationPush>, AppError> {
    let rows = repos::notifications::list_for_user(state.db(), user_id, 200)
        .await
        .map_err(|e| AppError::db("failed to list notifications", e))?;
    Ok(rows.iter().map(to_push).collect())
}

pub async fn mark_read(state: &AppState, user_id: i64, ids: &[i64]) -> Result<(), AppError> {
    repos::notifications::mark_read(state.db(), user_id, ids)
        .await
        .map_err(|e| AppError::db("failed to mark notifications read", e))
}

pub async fn delete(state: &AppState, user_id: i64, id: i64) -> Result<(), AppError> {
    let deleted = repos::notifications::delete(state.db(), user_id, id)
        .await
        .map_err(|e| AppError::db("failed to delete notification", e))?;
    if !deleted {
        return Err(AppError::not_found(
            crate::errors::ErrorCode::NotificationNotFound,
            format!("notification {id}"),
        ));
    }
    Ok(())
}
