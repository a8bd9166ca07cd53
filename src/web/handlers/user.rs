//! User handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::auth::{register, RegistrationRequest};
use crate::web::dto::{SignupRequest, UserResponse};
use crate::web::error::ApiError;
use crate::web::middleware::SessionToken;

/// POST /users - Create an account.
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SignupRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), ApiError> {
    let Json(req) = payload?;

    let request = RegistrationRequest {
        email: req.email,
        password: req.password,
    };
    let user = register(&state.db, state.jobs.as_ref(), &request).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// GET /users/me - The user behind the session token.
pub async fn me(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
) -> Result<Json<UserResponse>, ApiError> {
    let user = state.sessions.current_user(&token).await?;
    Ok(Json(UserResponse::from(&user)))
}
