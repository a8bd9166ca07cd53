//! File handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::file::{ROOT_PARENT_ID, THUMBNAIL_SIZES};
use crate::web::dto::{FileDataQuery, FileResponse, ListFilesQuery, UploadFileRequest};
use crate::web::error::ApiError;
use crate::web::middleware::{AuthUser, OptionalAuthUser};

/// Path IDs that are not numbers name no file.
fn parse_file_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found())
}

/// Thumbnail widths only; anything else is a bad request.
fn parse_size(raw: &str) -> Result<u32, ApiError> {
    raw.trim()
        .parse()
        .ok()
        .filter(|size| THUMBNAIL_SIZES.contains(size))
        .ok_or_else(|| ApiError::bad_request("Invalid size"))
}

/// POST /files - Upload a file or create a folder.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    payload: Result<Json<UploadFileRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<FileResponse>), ApiError> {
    let Json(req) = payload?;
    let file = state.files.create(user_id, &req.into()).await?;
    Ok((StatusCode::CREATED, Json(FileResponse::from(&file))))
}

/// GET /files/:id - One file the caller owns or that is public.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    let file_id = parse_file_id(&id)?;
    let file = state.files.get(user_id, file_id).await?;
    Ok(Json(FileResponse::from(&file)))
}

/// GET /files?parentId=&page= - One page of a folder's visible children.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<Vec<FileResponse>>, ApiError> {
    let parent_id = match query.parent_id.as_deref().map(str::trim) {
        None | Some("") => ROOT_PARENT_ID,
        Some(raw) => raw
            .parse()
            .map_err(|_| ApiError::bad_request("Invalid parentId"))?,
    };
    let page = query
        .page
        .as_deref()
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(0);

    let files = state.files.list(user_id, parent_id, page).await?;
    Ok(Json(files.iter().map(FileResponse::from).collect()))
}

/// PUT /files/:id/publish
pub async fn publish_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    set_visibility(&state, user_id, &id, true).await
}

/// PUT /files/:id/unpublish
pub async fn unpublish_file(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<String>,
) -> Result<Json<FileResponse>, ApiError> {
    set_visibility(&state, user_id, &id, false).await
}

async fn set_visibility(
    state: &AppState,
    user_id: i64,
    id: &str,
    is_public: bool,
) -> Result<Json<FileResponse>, ApiError> {
    let file_id = parse_file_id(id)?;
    let file = state.files.set_visibility(user_id, file_id, is_public).await?;
    Ok(Json(FileResponse::from(&file)))
}

/// GET /files/:id/data?size= - Original payload, or a thumbnail when `size`
/// is given.
pub async fn get_file_data(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(viewer): OptionalAuthUser,
    Path(id): Path<String>,
    Query(query): Query<FileDataQuery>,
) -> Result<Response, ApiError> {
    // The size is checked before the id is looked at.
    let size = query.size.as_deref().map(parse_size).transpose()?;
    let file_id = parse_file_id(&id)?;

    let data = match size {
        Some(size) => state.files.get_thumbnail(file_id, size).await?,
        None => state.files.get_data(viewer, file_id).await?,
    };

    Ok(([(header::CONTENT_TYPE, data.mime_type)], data.content).into_response())
}
