//! User profile routes.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::repos;
use crate::services::users as user_service;
use crate::state::app_state::AppState;

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserSearchEntry {
    id: i64,
    username: String,
}

async fn me(current_user: CurrentUser) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(current_user))
}

async fn search(
    app_state: web::Data<AppState>,
    _current_user: CurrentUser,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse, AppError> {
    let trimmed = query.q.trim();
    if trimmed.len() < 2 {
        return Ok(HttpResponse::Ok().json(Vec::<UserSearchEntry>::new()));
    }
    let users = repos::users::search(app_state.db(), trimmed, 20)
        .await
        .map_err(|e| AppError::db("failed to search users", e))?;
    let entries: Vec<UserSearchEntry> = users
        .into_iter()
        .map(|u| UserSearchEntry {
            id: u.id,
            username: u.username,
        })
        .collect();
    Ok(HttpResponse::Ok().json(entries))
}

async fn my_stats(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let stats = user_service::stats(&app_state, current_user.id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/users")
            .route("/me", web::get().to(me))
            .route("/me/stats", web::get().to(my_stats))
            .route("/search", web::get().to(search)),
    );
}
