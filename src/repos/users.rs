//! User repository functions.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use time::OffsetDateTime;

use crate::entities::users;

pub async fn create_user<C: ConnectionTrait>(
    conn: &C,
    email: &str,
    username: &str,
    password_hash: &str,
) -> Result<users::Model, DbErr> {
    users::ActiveModel {
        email: Set(email.to_owned()),
        username: Set(username.to_owned()),
        password_hash: Set(password_hash.to_owned()),
        email_verified_at: Set(None),
        created_at: Set(OffsetDateTime::now_utc()),
        ..Default::default()
    }
    .insert(conn)
    .await
}

pub async fn find_by_id<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find_by_id(user_id).one(conn).await
}

pub async fn find_by_email<C: ConnectionTrait>(
    conn: &C,
    email: &str,
) -> Result<Option<users::Model>, DbErr> {
    users::Entity::find()
        .filter(users::Column::Email.eq(email))
        .one(conn)
        .await
}

pub async fn mark_email_verified<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
) -> Result<(), DbErr> {
    users::Entity::update_many()
        .set(users::ActiveModel {
            email_verified_at: Set(Some(OffsetDateTime::now_utc())),
            ..Default::default()
        })
        .filter(users::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

pub async fn update_password_hash<C: ConnectionTrait>(
    conn: &C,
    user_id: i64,
    password_hash: &str,
) -> Result<(), DbErr> {
    users::Entity::update_many()
        .set(users::ActiveModel {
            password_hash: Set(password_hash.to_owned()),
            ..Default::default()
        })
        .filter(users::Column::Id.eq(user_id))
        .exec(conn)
        .await?;
    Ok(())
}

/// Case-insensitive username/email prefix search for the invite UI.
pub async fn search<C: ConnectionTrait>(
    conn: &C,
    query: &str,
    limit: u64,
) -> Result<Vec<users::Model>, DbErr> {
    let pattern = format!("{}%", query.replace(['%', '_'], ""));
    users::Entity::find()
        .filter(
            users::Column::Username
                .like(&pattern)
                .or(users::Column::Email.like(&pattern)),
        )
        .order_by_asc(users::Column::Username)
        .limit(limit)
        .all(conn)
        .await
}
