//! Authentication handlers.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::{
    headers::{authorization::Basic, Authorization},
    TypedHeader,
};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::TokenResponse;
use crate::web::error::ApiError;
use crate::web::middleware::SessionToken;

/// GET /connect - Exchange Basic credentials for a session token.
pub async fn connect(
    State(state): State<Arc<AppState>>,
    credentials: Option<TypedHeader<Authorization<Basic>>>,
) -> Result<Json<TokenResponse>, ApiError> {
    let TypedHeader(Authorization(basic)) = credentials.ok_or_else(ApiError::unauthorized)?;

    let token = state
        .sessions
        .login(basic.username(), basic.password())
        .await?;

    Ok(Json(TokenResponse { token }))
}

/// GET /disconnect - Revoke the current session token.
pub async fn disconnect(
    State(state): State<Arc<AppState>>,
    SessionToken(token): SessionToken,
) -> Result<StatusCode, ApiError> {
    state.sessions.logout(&token).await?;
    Ok(StatusCode::NO_CONTENT)
}
