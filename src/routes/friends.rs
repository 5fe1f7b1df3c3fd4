//! Friendship routes.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::errors::ErrorCode;
use crate::extractors::CurrentUser;
use crate::services::friends as friend_service;
use crate::state::app_state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FriendActionRequest {
    action: String,
    user_id: i64,
}

async fn list_friends(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let friends = friend_service::list(&app_state, current_user.id).await?;
    Ok(HttpResponse::Ok().json(friends))
}

async fn friend_action(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    body: web::Json<FriendActionRequest>,
) -> Result<HttpResponse, AppError> {
    match body.action.as_str() {
        "request" => friend_service::request(&app_state, current_user.id, body.user_id).await?,
        "accept" => friend_service::accept(&app_state, current_user.id, body.user_id).await?,
        "block" => friend_service::block(&app_state, current_user.id, body.user_id).await?,
        other => {
            return Err(AppError::bad_request(
                ErrorCode::BadRequest,
                format!("unknown friend action: {other}"),
            ))
        }
    }
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/friends")
            .route("", web::get().to(list_friends))
            .route("", web::post().to(friend_action)),
    );
}
