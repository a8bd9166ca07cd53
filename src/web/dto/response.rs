//! Response DTOs for the HTTP API.

use serde::Serialize;

use crate::db::User;
use crate::file::File;

/// `GET /status` response.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Metadata store reachable.
    pub db: bool,
    /// Session store reachable.
    pub sessions: bool,
}

/// `GET /stats` response.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub users: i64,
    pub files: i64,
}

/// Public view of a user.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

/// `GET /connect` response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Public view of a file entry. Storage details stay server-side.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub file_type: &'static str,
    pub is_public: bool,
    pub parent_id: i64,
}

impl From<&File> for FileResponse {
    fn from(file: &File) -> Self {
        Self {
            id: file.id,
            user_id: file.user_id,
            name: file.name.clone(),
            file_type: file.file_type().as_str(),
            is_public: file.is_public,
            parent_id: file.parent_id,
        }
    }
}
