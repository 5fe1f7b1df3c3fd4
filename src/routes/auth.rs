//! Public authentication routes under `/auth`.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::services::users as user_service;
use crate::state::app_state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignupRequest {
    email: String,
    username: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: i64,
    email: String,
    username: String,
    email_verified: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: UserResponse,
    access_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct VerifyRequest {
    token: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshResponse {
    access_token: String,
}

#[derive(Deserialize)]
struct PasswordResetRequest {
    email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResetConfirm {
    token: String,
    new_password: String,
}

fn user_response(user: &crate::entities::users::Model) -> UserResponse {
    UserResponse {
        id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        email_verified: user.email_verified_at.is_some(),
    }
}

async fn signup(
    app_state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, AppError> {
    let user = user_service::signup(&app_state, &body.email, &body.username, &body.password).await?;
    Ok(HttpResponse::Created().json(user_response(&user)))
}

async fn login(
    app_state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    let (user, tokens) = user_service::login(&app_state, &body.email, &body.password).await?;
    Ok(HttpResponse::Ok().json(LoginResponse {
        user: user_response(&user),
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
    }))
}

async fn verify(
    app_state: web::Data<AppState>,
    body: web::Json<VerifyRequest>,
) -> Result<HttpResponse, AppError> {
    user_service::verify_email(&app_state, &body.token).await?;
    Ok(HttpResponse::NoContent().finish())
}

async fn refresh(
    app_state: web::Data<AppState>,
    body: web::Json<RefreshRequest>,
) -> Result<HttpResponse, AppError> {
    let access_token = user_service::refresh(&app_state, &body.refresh_token).await?;
    Ok(HttpResponse::Ok().json(RefreshResponse { access_token }))
}

async fn password_reset(
    app_state: web::Data<AppState>,
    body: web::Json<PasswordResetRequest>,
) -> Result<HttpResponse, AppError> {
    user_service::request_password_reset(&app_state, &body.email).await?;
    Ok(HttpResponse::Accepted().finish())
}

async fn password_reset_confirm(
    app_state: web::Data<AppState>,
    body: web::Json<PasswordResetConfirm>,
) -> Result<HttpResponse, AppError> {
    user_service::confirm_password_reset(&app_state, &body.token, &body.new_password).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(signup))
            .route("/login", web::post().to(login))
            .route("/verify", web::post().to(verify))
            .route("/refresh", web::post().to(refresh))
            .route("/password-reset", web::post().to(password_reset))
            .route("/password-reset/confirm", web::post().to(password_reset_confirm)),
    );
}
