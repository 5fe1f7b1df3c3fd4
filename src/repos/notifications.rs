//! Notification repository functions. The table is append-only apart from
//! the read/unread status flip and explicit deletion by the owner.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::entities::notifications::{self, NotificationStatus};

pub async fn create<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    kind: &str,
    from_user_id: Option<i64>,
    game_id: Option<i64>,
) -> Result<notifications::Model, DbErr> {
    notifications::ActiveModel {
        user_id: Set(user_id),
        kind: Set(kind.to_owned()),
        from_user_id: Set(from_user_id),
        game_id: Set(game_id),
        created_at: Set(OffsetDateTime::now_utc()),
        status: Set(NotificationStatus::Unread),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    id: i64,
) -> Result<Option<notifications::Model>, DbErr> {
    notifications::Entity::find_by_id(id).one(conn).await
}

/// Newest first so late-connecting clients can page history.
pub async fn list_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    limit: u64,
) -> Result<Vec<notifications::Model>, DbErr> {
    notifications::Entity::find()
        .filter(notifications::Column::UserId.eq(user_id))
        .order_by_desc(notifications::Column::CreatedAt)
        .limit(limit)
        .all(conn)
        .await
}

pub async fn mark_read<C: ConnectionTrait>(conn: &C, user_id: i64, ids: &[i64]) -> Result<(), DbErr> {
    if ids.is_empty() {
        return Ok(());
    }
    notifications::Entity::update_many()
        .set(notifications::ActiveModel {
            status: Set(NotificationStatus::Read),
            ..Default::default()
        })
        .filter(
            notifications::Column::UserId
                .eq(user_id)
                .and(notifications::Column::Id.is_in(ids.to_vec())),
        )
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn delete<C: ConnectionTrait>(conn: &C, user_id: i64, id: i64) -> Result<bool, DbErr> {
    let res = notifications::Entity::delete_many()
        .filter(
            notifications::Column::UserId
                .eq(user_id)
                .and(notifications::Column::Id.eq(id)),
        )
        .exec(conn)
        .await?;
    Ok(res.rows_affected > 0)
}
