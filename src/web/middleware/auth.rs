//! Token authentication extractors.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Header carrying the session token.
pub const TOKEN_HEADER: &str = "x-token";

fn token_from_parts(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extractor for authenticated requests.
///
/// Resolves the `X-Token` header to a user ID; a missing, unknown or expired
/// token rejects the request with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or_else(ApiError::unauthorized)?;
        let user_id = state.sessions.resolve(token).await?;
        Ok(AuthUser(user_id))
    }
}

/// Extractor that resolves the token when one is sent.
///
/// Anonymous and unresolvable tokens both yield `None`.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuthUser(pub Option<i64>);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for OptionalAuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = token_from_parts(parts) else {
            return Ok(OptionalAuthUser(None));
        };
        match state.sessions.resolve(token).await {
            Ok(user_id) => Ok(OptionalAuthUser(Some(user_id))),
            Err(crate::FileboxError::Auth(_)) => Ok(OptionalAuthUser(None)),
            Err(e) => Err(e.into()),
        }
    }
}

/// Raw session token of an authenticated request.
#[derive(Debug, Clone)]
pub struct SessionToken(pub String);

#[axum::async_trait]
impl FromRequestParts<Arc<AppState>> for SessionToken {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        token_from_parts(parts)
            .map(|t| SessionToken(t.to_string()))
            .ok_or_else(ApiError::unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    #[test]
    fn test_token_from_parts() {
        let (parts, _) = Request::builder()
            .header("X-Token", " abc ")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(token_from_parts(&parts), Some("abc"));

        let (parts, _) = Request::builder()
            .header("X-Token", "")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(token_from_parts(&parts), None);

        let (parts, _) = Request::builder().body(()).unwrap().into_parts();
        assert_eq!(token_from_parts(&parts), None);
    }
}
