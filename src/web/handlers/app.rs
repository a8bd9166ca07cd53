//! Health and statistics handlers.

use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppState;
use crate::db::UserRepository;
use crate::file::FileRepository;
use crate::web::dto::{StatsResponse, StatusResponse};
use crate::web::error::ApiError;

/// GET /status - Backing store liveness.
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let db = state.db.ping().await;
    let sessions = state.sessions.store().is_alive().await;
    Json(StatusResponse { db, sessions })
}

/// GET /stats - Number of users and files.
pub async fn stats(State(state): State<Arc<AppState>>) -> Result<Json<StatsResponse>, ApiError> {
    let users = UserRepository::new(state.db.pool()).count().await?;
    let files = FileRepository::new(state.db.pool()).count().await?;
    Ok(Json(StatsResponse { users, files }))
}
