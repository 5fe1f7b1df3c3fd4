//! Game repository functions.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, JoinType, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use time::OffsetDateTime;

use crate::entities::game_players;
use crate::entities::games::{self, GameStatus};
use crate::error::AppError;
use crate::errors::ErrorCode;

pub async fn create<C: ConnectionTrait>(
    conn: &C,
    created_by: i64,
    max_players: i16,
    rng_seed: i64,
) -> Result<games::Model, DbErr> {
    games::ActiveModel {
        status: Set(GameStatus::Lobby),
        created_by: Set(created_by),
        max_players: Set(max_players),
        rng_seed: Set(rng_seed),
        created_at: Set(OffsetDateTime::now_utc()),
        finished_at: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
) -> Result<Option<games::Model>, DbErr> {
    games::Entity::find_by_id(game_id).one(conn).await
}

/// Find a game or fail with a 404.
pub async fn require_game<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
) -> Result<games::Model, AppError> {
    find_by_id(conn, game_id)
        .await
        .map_err(|e| AppError::db("failed to load game", e))?
        .ok_or_else(|| AppError::not_found(ErrorCode::GameNotFound, format!("game {game_id}")))
}

/// Every game the user is seated in, newest first.
pub async fn list_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<Vec<games::Model>, DbErr> {
    games::Entity::find()
        .join(JoinType::InnerJoin, games::Relation::GamePlayers.def())
        .filter(game_players::Column::UserId.eq(user_id))
        .order_by_desc(games::Column::CreatedAt)
        .all(conn)
        .await
}

pub async fn set_status<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
    status: GameStatus,
) -> Result<(), DbErr> {
    let finished_at = match status {
        GameStatus::Finished => Some(OffsetDateTime::now_utc()),
        _ => None,
    };
    games::Entity::update_many()
        .set(games::ActiveModel {
            status: Set(status),
            finished_at: Set(finished_at),
            ..Default::default()
        })
        .filter(games::Column::Id.eq(game_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Hard delete; memberships, events, and notifications cascade via FKs.
pub async fn delete<C: ConnectionTrait>(conn: &C, game_id: i64) -> Result<(), DbErr> {
    games::Entity::delete_by_id(game_id).exec(conn).await?;
    Ok(())
}

/// Ids of every Active game, for rehydration at startup.
pub async fn active_game_ids<C: ConnectionTrait>(conn: &C) -> Result<Vec<i64>, DbErr> {
    Ok(games::Entity::find()
        .filter(games::Column::Status.eq(GameStatus::Active))
        .select_only()
        .column(games::Column::Id)
        .into_tuple::<i64>()
        .all(conn)
        .await?)
}
