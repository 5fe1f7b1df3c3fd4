//! Bearer-token authentication extractor.
//!
//! Verifies the `Authorization: Bearer` access token and resolves the user
//! row, so handlers receive an authenticated `CurrentUser` or the request
//! fails with 401/403 before any handler code runs.

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use serde::Serialize;

use crate::auth::claims::TokenKind;
use crate::auth::jwt::verify_token;
use crate::error::AppError;
use crate::repos;
use crate::state::app_state::AppState;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentUser {
    pub id: i64,
    pub email: String,
    pub username: String,
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = std::pin::Pin<Box<dyn std::future::Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();

        Box::pin(async move {
            let token = req
                .headers()
                .get(AUTHORIZATION)
                .and_then(|value| value.to_str().ok())
                .and_then(|value| value.strip_prefix("Bearer "))
                .ok_or_else(AppError::unauthorized_missing_bearer)?
                .to_owned();

            let app_state = req
                .app_data::<web::Data<AppState>>()
                .ok_or_else(|| AppError::internal("AppState not available"))?;

            let claims = verify_token(&token, TokenKind::Access, &app_state.security)?;
            let user_id = claims
                .user_id()
                .ok_or_else(AppError::unauthorized_invalid_jwt)?;

            let user = repos::users::find_by_id(app_state.db(), user_id)
                .await
                .map_err(|e| AppError::db("failed to load current user", e))?
                .ok_or_else(AppError::unauthorized)?;

            Ok(CurrentUser {
                id: user.id,
                email: user.email,
                username: user.username,
            })
        })
    }
}
