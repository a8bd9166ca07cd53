//! Request DTOs for the HTTP API.

use serde::Deserialize;

use crate::file::UploadRequest;

/// User signup request. Missing fields are reported by the handler.
#[derive(Debug, Default, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// A parent folder reference sent either as a number or as a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ParentRef {
    Id(i64),
    Text(String),
}

impl ParentRef {
    /// Numeric ID. Text that is not a number refers to no folder, which maps
    /// to `-1` so the parent lookup fails.
    pub fn to_id(&self) -> i64 {
        match self {
            ParentRef::Id(id) => *id,
            ParentRef::Text(text) => text.trim().parse().unwrap_or(-1),
        }
    }
}

/// File upload request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadFileRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub file_type: Option<String>,
    #[serde(default)]
    pub parent_id: Option<ParentRef>,
    #[serde(default)]
    pub is_public: Option<bool>,
    /// Base64 payload.
    #[serde(default)]
    pub data: Option<String>,
}

impl From<UploadFileRequest> for UploadRequest {
    fn from(req: UploadFileRequest) -> Self {
        UploadRequest {
            name: req.name,
            file_type: req.file_type,
            parent_id: req.parent_id.map(|p| p.to_id()).unwrap_or(0),
            is_public: req.is_public.unwrap_or(false),
            data: req.data,
        }
    }
}

/// Query for `GET /files`. Values are parsed by the handler.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListFilesQuery {
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

/// Query for `GET /files/:id/data`.
#[derive(Debug, Default, Deserialize)]
pub struct FileDataQuery {
    #[serde(default)]
    pub size: Option<String>,
}
