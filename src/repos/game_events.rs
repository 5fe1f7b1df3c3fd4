//! Append-only event log repository.
//!
//! `seq` numbers are assigned by the single-writer game worker, so each
//! game's log is gap-free and totally ordered without database locking
//! beyond the insert itself.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::entities::game_events;

pub async fn append<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
    seq: i64,
    event_type: &str,
    actor_user_id: Option<i64>,
    payload: serde_json::Value,
) -> Result<game_events::Model, DbErr> {
    game_events::ActiveModel {
        game_id: Set(game_id),
        seq: Set(seq),
        event_type: Set(event_type.to_owned()),
        actor_user_id: Set(actor_user_id),
        payload: Set(payload),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

/// The full log for a game in seq order, for replay.
pub async fn load_all<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
) -> Result<Vec<game_events::Model>, DbErr> {
    game_events::Entity::find()
        .filter(game_events::Column::GameId.eq(game_id))
        .order_by_asc(game_events::Column::Seq)
        .all(conn)
        .await
}

/// Highest persisted seq for a game, or None for an empty log.
pub async fn max_seq<C: ConnectionTrait>(conn: &C, game_id: i64) -> Result<Option<i64>, DbErr> {
    game_events::Entity::find()
        .filter(game_events::Column::GameId.eq(game_id))
        .select_only()
        .column(game_events::Column::Seq)
        .order_by_desc(game_events::Column::Seq)
        .limit(1)
        .into_tuple::<i64>()
        .one(conn)
        .await
}
