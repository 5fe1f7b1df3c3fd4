//! Notification history routes. Live delivery happens on the socket.

use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::error::AppError;
use crate::extractors::CurrentUser;
use crate::services::notifications as notification_service;
use crate::state::app_state::AppState;

#[derive(Deserialize)]
struct MarkReadRequest {
    ids: Vec<i64>,
}

async fn list_notifications(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let notifications = notification_service::list(&app_state, current_user.id).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

async fn mark_read(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    body: web::Json<MarkReadRequest>,
) -> Result<HttpResponse, AppError> {
    notification_service::mark_read(&app_state, current_user.id, &body.ids).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn delete_notification(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    notification_service::delete(&app_state, current_user.id, path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .route("", web::get().to(list_notifications))
            .route("/read", web::post().to(mark_read))
            .route("/{id}", web::delete().to(delete_notification)),
    );
}
