//! Game membership repository functions.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use time::OffsetDateTime;

use crate::entities::game_players;

pub async fn add<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
    user_id: i64,
    seat: i16,
) -> Result<game_players::Model, DbErr> {
    game_players::ActiveModel {
        game_id: Set(game_id),
        user_id: Set(user_id),
        seat: Set(seat),
        joined_at: Set(OffsetDateTime::now_utc()),
        final_score: Set(None),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn remove<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
    user_id: i64,
) -> Result<(), DbErr> {
    game_players::Entity::delete_many()
        .filter(
            game_players::Column::GameId
                .eq(game_id)
                .and(game_players::Column::UserId.eq(user_id)),
        )
        .exec(conn)
        .await?;
    Ok(())
}

/// Members in seat order.
pub async fn find_all_by_game<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
) -> Result<Vec<game_players::Model>, DbErr> {
    game_players::Entity::find()
        .filter(game_players::Column::GameId.eq(game_id))
        .order_by_asc(game_players::Column::Seat)
        .all(conn)
        .await
}

pub async fn is_member<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
    user_id: i64,
) -> Result<bool, DbErr> {
    let count = game_players::Entity::find()
        .filter(
            game_players::Column::GameId
                .eq(game_id)
                .and(game_players::Column::UserId.eq(user_id)),
        )
        .count(conn)
        .await?;
    Ok(count > 0)
}

pub async fn member_count<C: ConnectionTrait>(conn: &C, game_id: i64) -> Result<u64, DbErr> {
    game_players::Entity::find()
        .filter(game_players::Column::GameId.eq(game_id))
        .count(conn)
        .await
}

/// Re-number seats after a lobby departure so they stay dense.
pub async fn reseat<C: ConnectionTrait>(conn: &C, game_id: i64) -> Result<(), DbErr> {
    let members = find_all_by_game(conn, game_id).await?;
    for (idx, member) in members.into_iter().enumerate() {
        if member.seat != idx as i16 {
            game_players::Entity::update_many()
                .set(game_players::ActiveModel {
                    seat: Set(idx as i16),
                    ..Default::default()
                })
                .filter(game_players::Column::Id.eq(member.id))
                .exec(conn)
                .await?;
        }
    }
    Ok(())
}

pub async fn set_final_score<C: ConnectionTrait>(
    conn: &C,
    game_id: i64,
    user_id: i64,
    final_score: i32,
) -> Result<(), DbErr> {
    game_players::Entity::update_many()
        .set(game_players::ActiveModel {
            final_score: Set(Some(final_score)),
            ..Default::default()
        })
        .filter(
            game_players::Column::GameId
                .eq(game_id)
                .and(game_players::Column::UserId.eq(user_id)),
        )
        .exec(conn)
        .await?;
    Ok(())
}

/// Finished-game rows for a user, for the stats endpoint.
pub async fn finished_rows_for_user<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<Vec<game_players::Model>, DbErr> {
    game_players::Entity::find()
        .filter(
            game_players::Column::UserId
                .eq(user_id)
                .and(game_players::Column::FinalScore.is_not_null()),
        )
        .all(conn)
        .await
}
