//! Friendship repository functions.
//!
//! Acceptance writes one `ACCEPTED` row per direction, so presence checks
//! always fetch all rows between the pair and test for non-emptiness
//! rather than expecting a single row.

use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, Condition, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set};
use time::OffsetDateTime;

use crate::entities::friendships::{self, FriendshipStatus};

/// All friendship rows between the pair, in either direction.
pub async fn find_between<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    other_id: i64,
) -> Result<Vec<friendships::Model>, DbErr> {
    friendships::Entity::find()
        .filter(
            Condition::any()
                .add(
                    friendships::Column::UserId
                        .eq(user_id)
                        .and(friendships::Column::FriendId.eq(other_id)),
                )
                .add(
                    friendships::Column::UserId
                        .eq(other_id)
                        .and(friendships::Column::FriendId.eq(user_id)),
                ),
        )
        .all(conn)
        .await
}

/// Whether an `ACCEPTED` row exists in either direction.
pub async fn are_friends<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    other_id: i64,
) -> Result<bool, DbErr> {
    let rows = find_between(conn, user_id, other_id).await?;
    Ok(rows
        .iter()
        .any(|row| row.status == FriendshipStatus::Accepted))
}

/// Insert a directed friendship row if the pair is absent; concurrent
/// inserts of the same edge collapse onto the unique (user, friend) index.
pub async fn insert_if_absent<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    friend_id: i64,
    status: FriendshipStatus,
) -> Result<(), DbErr> {
    let row = friendships::ActiveModel {
        user_id: Set(user_id),
        friend_id: Set(friend_id),
        status: Set(status),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    };
    friendships::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([
                friendships::Column::UserId,
                friendships::Column::FriendId,
            ])
            .do_nothing()
            .to_owned(),
        )
        .do_nothing()
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn set_status<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    friend_id: i64,
    status: FriendshipStatus,
) -> Result<(), DbErr> {
    friendships::Entity::update_many()
        .set(friendships::ActiveModel {
            status: Set(status),
            ..Default::default()
        })
        .filter(
            friendships::Column::UserId
                .eq(user_id)
                .and(friendships::Column::FriendId.eq(friend_id)),
        )
        .exec(conn)
        .await?;
    Ok(())
}

/// Every friendship row where the user is on either side.
pub async fn list_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<Vec<friendships::Model>, DbErr> {
    friendships::Entity::find()
        .filter(
            Condition::any()
                .add(friendships::Column::UserId.eq(user_id))
                .add(friendships::Column::FriendId.eq(user_id)),
        )
        .all(conn)
        .await
}
