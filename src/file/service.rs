//! File service for filebox.
//!
//! This module provides the access-controlled file operations:
//! - Upload with validation, blob write and thumbnail scheduling
//! - Lookup and listing filtered by ownership and visibility
//! - Publishing and unpublishing
//! - Serving original payloads and thumbnails

use std::sync::Arc;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use tracing::{debug, info};

use super::metadata::{File, FileKind, FileRepository, FileType, NewFile, StoredBlob};
use super::storage::BlobStore;
use super::thumbnail::thumbnail_path;
use super::{DEFAULT_MAX_UPLOAD_BYTES, PAGE_SIZE, ROOT_PARENT_ID, THUMBNAIL_SIZES};
use crate::db::Database;
use crate::jobs::ThumbnailJob;
use crate::queue::{self, JobQueue};
use crate::{FileboxError, Result};

/// Standard alphabet, padding optional.
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Request data for an upload. Absent and empty fields are treated alike.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    /// Display name.
    pub name: Option<String>,
    /// One of `folder`, `file`, `image`.
    pub file_type: Option<String>,
    /// Parent folder ID, 0 for the root.
    pub parent_id: i64,
    pub is_public: bool,
    /// Base64 payload; required for non-folders.
    pub data: Option<String>,
}

impl UploadRequest {
    /// Create a request for a root-level private entry.
    pub fn new(name: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            file_type: Some(file_type.into()),
            ..Self::default()
        }
    }

    /// Set the base64 payload.
    pub fn with_data(mut self, data: impl Into<String>) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = parent_id;
        self
    }

    /// Set the visibility.
    pub fn with_public(mut self, is_public: bool) -> Self {
        self.is_public = is_public;
        self
    }
}

/// Bytes to serve plus their content type.
#[derive(Debug, Clone)]
pub struct FileContent {
    pub mime_type: String,
    pub content: Vec<u8>,
}

/// Access-controlled file operations.
#[derive(Clone)]
pub struct FileService {
    db: Database,
    blobs: Arc<dyn BlobStore>,
    jobs: Arc<dyn JobQueue>,
    max_upload_bytes: u64,
}

impl FileService {
    /// Create a new FileService.
    pub fn new(db: Database, blobs: Arc<dyn BlobStore>, jobs: Arc<dyn JobQueue>) -> Self {
        Self {
            db,
            blobs,
            jobs,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Set the maximum decoded upload size.
    pub fn with_max_upload_bytes(mut self, max_bytes: u64) -> Self {
        self.max_upload_bytes = max_bytes;
        self
    }

    /// Maximum decoded upload size.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_bytes
    }

    /// Create a file or folder owned by `user_id`.
    ///
    /// Every check runs before the blob or the record is written. Images get
    /// one thumbnail job.
    pub async fn create(&self, user_id: i64, request: &UploadRequest) -> Result<File> {
        let name = request
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| FileboxError::Validation("Missing name".to_string()))?;

        let file_type: FileType = request
            .file_type
            .as_deref()
            .ok_or_else(|| FileboxError::Validation("Missing type".to_string()))?
            .parse()?;

        let data = match file_type {
            FileType::Folder => None,
            _ => Some(
                request
                    .data
                    .as_deref()
                    .filter(|d| !d.is_empty())
                    .ok_or_else(|| FileboxError::Validation("Missing data".to_string()))?,
            ),
        };

        let repo = FileRepository::new(self.db.pool());

        if request.parent_id != ROOT_PARENT_ID {
            let parent = repo
                .get_by_id(request.parent_id)
                .await?
                .ok_or_else(|| FileboxError::Validation("Parent not found".to_string()))?;
            if !parent.is_folder() {
                return Err(FileboxError::Validation(
                    "Parent is not a folder".to_string(),
                ));
            }
        }

        let content = data.map(|d| self.decode_payload(d)).transpose()?;

        let kind = match content {
            None => FileKind::Folder,
            Some(content) => {
                let local_path = self.blobs.allocate(name);
                self.blobs.write(&local_path, &content).await?;
                debug!(path = %local_path, bytes = content.len(), "Stored payload");

                let blob = StoredBlob {
                    local_path,
                    mime_type: mime_guess::from_path(name)
                        .first_or_octet_stream()
                        .essence_str()
                        .to_string(),
                };
                if file_type == FileType::Image {
                    FileKind::Image(blob)
                } else {
                    FileKind::Document(blob)
                }
            }
        };

        let new_file = NewFile::new(user_id, name, kind)
            .with_parent(request.parent_id)
            .with_public(request.is_public);
        let file = repo.create(&new_file).await?;

        info!(
            user_id,
            file_id = file.id,
            file_type = %file.file_type(),
            "File created"
        );

        if file.file_type() == FileType::Image {
            let job = ThumbnailJob::new(user_id, file.id);
            let job_id = queue::enqueue(self.jobs.as_ref(), &job).await?;
            debug!(file_id = file.id, job_id, "Thumbnail job enqueued");
        }

        Ok(file)
    }

    fn decode_payload(&self, data: &str) -> Result<Vec<u8>> {
        let content = PAYLOAD_ENGINE
            .decode(data.trim())
            .map_err(|_| FileboxError::Validation("Invalid data".to_string()))?;
        if content.len() as u64 > self.max_upload_bytes {
            return Err(FileboxError::Validation("File too large".to_string()));
        }
        Ok(content)
    }

    /// Get a file the caller owns or that is public.
    pub async fn get(&self, user_id: i64, file_id: i64) -> Result<File> {
        let file = self.find(file_id).await?;
        if !file.is_visible_to(user_id) {
            return Err(FileboxError::Permission(format!(
                "file {file_id} is private"
            )));
        }
        Ok(file)
    }

    /// One page of the children of `parent_id`, keeping only entries the
    /// caller may see.
    ///
    /// Filtering happens after pagination, so a page may hold fewer than
    /// [`PAGE_SIZE`] entries even when more exist.
    pub async fn list(&self, user_id: i64, parent_id: i64, page: u32) -> Result<Vec<File>> {
        let files = FileRepository::new(self.db.pool())
            .list_by_parent(parent_id, page, PAGE_SIZE)
            .await?;
        Ok(files
            .into_iter()
            .filter(|f| f.is_visible_to(user_id))
            .collect())
    }

    /// Publish or unpublish a file the caller owns.
    pub async fn set_visibility(&self, user_id: i64, file_id: i64, is_public: bool) -> Result<File> {
        let file = self.find(file_id).await?;
        if !file.is_owned_by(user_id) {
            return Err(FileboxError::Permission(format!(
                "file {file_id} belongs to another user"
            )));
        }

        let updated = FileRepository::new(self.db.pool())
            .set_public(file_id, is_public)
            .await?
            .ok_or_else(|| FileboxError::NotFound(format!("file {file_id}")))?;

        info!(user_id, file_id, is_public, "File visibility changed");
        Ok(updated)
    }

    /// Serve a derived thumbnail. Not access controlled.
    ///
    /// Fails `NotFound` until the thumbnail job has written the size.
    pub async fn get_thumbnail(&self, file_id: i64, size: u32) -> Result<FileContent> {
        if !THUMBNAIL_SIZES.contains(&size) {
            return Err(FileboxError::Validation("Invalid size".to_string()));
        }

        let file = self.find(file_id).await?;
        let FileKind::Image(blob) = &file.kind else {
            return Err(FileboxError::NotFound(format!("image {file_id}")));
        };

        let content = self.blobs.read(&thumbnail_path(&blob.local_path, size)).await?;
        Ok(FileContent {
            mime_type: blob.mime_type.clone(),
            content,
        })
    }

    /// Serve the original payload.
    ///
    /// Private files look absent to anyone but their owner.
    pub async fn get_data(&self, viewer: Option<i64>, file_id: i64) -> Result<FileContent> {
        let file = self.find(file_id).await?;
        if !file.is_public && viewer != Some(file.user_id) {
            return Err(FileboxError::NotFound(format!("file {file_id}")));
        }

        let blob = file.blob().ok_or_else(|| {
            FileboxError::Validation("A folder doesn't have content".to_string())
        })?;

        let content = self.blobs.read(&blob.local_path).await?;
        Ok(FileContent {
            mime_type: blob.mime_type.clone(),
            content,
        })
    }

    async fn find(&self, file_id: i64) -> Result<File> {
        FileRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| FileboxError::NotFound(format!("file {file_id}")))
    }
}

impl std::fmt::Debug for FileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileService")
            .field("max_upload_bytes", &self.max_upload_bytes)
            .finish()
    }
}
