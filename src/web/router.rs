//! Router configuration for the HTTP API.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use super::handlers::{
    connect, create_user, disconnect, get_file, get_file_data, list_files, me, publish_file,
    stats, status, unpublish_file, upload_file, AppState,
};

/// Headroom for JSON framing around a base64 payload.
const BODY_OVERHEAD: usize = 64 * 1024;

/// Create the API router.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Base64 inflates payloads by 4/3.
    let max_upload = usize::try_from(app_state.files.max_upload_bytes()).unwrap_or(usize::MAX);
    let body_limit = (max_upload / 3 + 1).saturating_mul(4).saturating_add(BODY_OVERHEAD);

    let app_routes = Router::new()
        .route("/status", get(status))
        .route("/stats", get(stats));

    let auth_routes = Router::new()
        .route("/connect", get(connect))
        .route("/disconnect", get(disconnect));

    let user_routes = Router::new()
        .route("/users", post(create_user))
        .route("/users/me", get(me));

    let file_routes = Router::new()
        .route("/files", post(upload_file).get(list_files))
        .route("/files/:id", get(get_file))
        .route("/files/:id/publish", put(publish_file))
        .route("/files/:id/unpublish", put(unpublish_file))
        .route("/files/:id/data", get(get_file_data));

    Router::new()
        .merge(app_routes)
        .merge(auth_routes)
        .merge(user_routes)
        .merge(file_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(app_state)
}
