//! Game CRUD and game-scoped actions over HTTP. Realtime play happens on
//! the socket; these routes cover the lobby lifecycle the hub reads back.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::extractors::{CurrentUser, GameId};
use crate::services::games as game_service;
use crate::state::app_state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest {
    max_players: i16,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InviteRequest {
    user_id: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MediaTokenResponse {
    token: String,
    url: String,
}

async fn list_games(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
) -> Result<HttpResponse, AppError> {
    let games = game_service::list_games(&app_state, current_user.id).await?;
    Ok(HttpResponse::Ok().json(games))
}

async fn create_game(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    body: web::Json<CreateGameRequest>,
) -> Result<HttpResponse, AppError> {
    let game = game_service::create_game(&app_state, current_user.id, body.max_players).await?;
    Ok(HttpResponse::Created().json(game))
}

async fn get_game(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    game_id: GameId,
) -> Result<HttpResponse, AppError> {
    let game = game_service::get_game(&app_state, current_user.id, game_id.0).await?;
    Ok(HttpResponse::Ok().json(game))
}

async fn delete_game(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    game_id: GameId,
) -> Result<HttpResponse, AppError> {
    game_service::delete_game(&app_state, current_user.id, game_id.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn invite(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    game_id: GameId,
    body: web::Json<InviteRequest>,
) -> Result<HttpResponse, AppError> {
    game_service::invite(&app_state, current_user.id, game_id.0, body.user_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn leave(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    game_id: GameId,
) -> Result<HttpResponse, AppError> {
    game_service::leave_game(&app_state, current_user.id, game_id.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn nudge(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    game_id: GameId,
) -> Result<HttpResponse, AppError> {
    game_service::nudge_lobby(&app_state, current_user.id, game_id.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn nudge_player(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    game_id: GameId,
) -> Result<HttpResponse, AppError> {
    game_service::nudge_current_player(&app_state, current_user.id, game_id.0).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn livekit_token(
    app_state: web::Data<AppState>,
    current_user: CurrentUser,
    game_id: GameId,
) -> Result<HttpResponse, AppError> {
    let token = game_service::media_room_token(&app_state, current_user.id, game_id.0).await?;
    Ok(HttpResponse::Ok().json(MediaTokenResponse {
        token,
        url: app_state.media.url.clone(),
    }))
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/games")
            .route("", web::get().to(list_games))
            .route("", web::post().to(create_game))
            .route("/{game_id}", web::get().to(get_game))
            .route("/{game_id}", web::delete().to(delete_game))
            .route("/{game_id}/invite", web::post().to(invite))
            .route("/{game_id}/leave", web::post().to(leave))
            .route("/{game_id}/nudge", web::post().to(nudge))
            .route("/{game_id}/nudge-player", web::post().to(nudge_player))
            .route("/{game_id}/livekit-token", web::post().to(livekit_token)),
    );
}
