//! File metadata types and repository for filebox.

use std::str::FromStr;

use super::ROOT_PARENT_ID;
use crate::db::DbPool;
use crate::{FileboxError, Result};

/// Kind of entry as exposed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Folder,
    File,
    Image,
}

impl FileType {
    /// Wire and database representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Folder => "folder",
            FileType::File => "file",
            FileType::Image => "image",
        }
    }
}

impl FromStr for FileType {
    type Err = FileboxError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "folder" => Ok(FileType::Folder),
            "file" => Ok(FileType::File),
            "image" => Ok(FileType::Image),
            _ => Err(FileboxError::Validation("Missing type".to_string())),
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location and MIME type of a stored payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Absolute path in the blob store.
    pub local_path: String,
    pub mime_type: String,
}

/// What a file entry is. Only non-folders carry a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileKind {
    Folder,
    Document(StoredBlob),
    Image(StoredBlob),
}

impl FileKind {
    pub fn file_type(&self) -> FileType {
        match self {
            FileKind::Folder => FileType::Folder,
            FileKind::Document(_) => FileType::File,
            FileKind::Image(_) => FileType::Image,
        }
    }

    pub fn blob(&self) -> Option<&StoredBlob> {
        match self {
            FileKind::Folder => None,
            FileKind::Document(blob) | FileKind::Image(blob) => Some(blob),
        }
    }
}

/// A file or folder entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    /// Unique file ID.
    pub id: i64,
    /// Owner's user ID. Immutable.
    pub user_id: i64,
    /// Display name.
    pub name: String,
    /// Whether non-owners may read it.
    pub is_public: bool,
    /// Parent folder ID, or 0 for the root.
    pub parent_id: i64,
    pub kind: FileKind,
}

impl File {
    pub fn file_type(&self) -> FileType {
        self.kind.file_type()
    }

    pub fn blob(&self) -> Option<&StoredBlob> {
        self.kind.blob()
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, FileKind::Folder)
    }

    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.user_id == user_id
    }

    /// Owner or public.
    pub fn is_visible_to(&self, user_id: i64) -> bool {
        self.is_public || self.is_owned_by(user_id)
    }
}

/// Raw `files` row.
#[derive(Debug, sqlx::FromRow)]
struct FileRow {
    id: i64,
    user_id: i64,
    name: String,
    file_type: String,
    is_public: bool,
    parent_id: i64,
    local_path: Option<String>,
    mime_type: Option<String>,
}

impl TryFrom<FileRow> for File {
    type Error = FileboxError;

    fn try_from(row: FileRow) -> Result<Self> {
        let file_type = FileType::from_str(&row.file_type).map_err(|_| {
            FileboxError::Database(format!(
                "file {} has unknown type {:?}",
                row.id, row.file_type
            ))
        })?;

        let kind = match (file_type, row.local_path, row.mime_type) {
            (FileType::Folder, None, None) => FileKind::Folder,
            (FileType::File, Some(local_path), Some(mime_type)) => FileKind::Document(StoredBlob {
                local_path,
                mime_type,
            }),
            (FileType::Image, Some(local_path), Some(mime_type)) => FileKind::Image(StoredBlob {
                local_path,
                mime_type,
            }),
            (file_type, ..) => {
                return Err(FileboxError::Database(format!(
                    "file {} of type {} has inconsistent blob columns",
                    row.id, file_type
                )))
            }
        };

        Ok(File {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            is_public: row.is_public,
            parent_id: row.parent_id,
            kind,
        })
    }
}

/// Data for creating a new file entry.
#[derive(Debug, Clone)]
pub struct NewFile {
    pub user_id: i64,
    pub name: String,
    pub is_public: bool,
    pub parent_id: i64,
    pub kind: FileKind,
}

impl NewFile {
    /// A private entry at the root.
    pub fn new(user_id: i64, name: impl Into<String>, kind: FileKind) -> Self {
        Self {
            user_id,
            name: name.into(),
            is_public: false,
            parent_id: ROOT_PARENT_ID,
            kind,
        }
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

const FILE_COLUMNS: &str = "id, user_id, name, file_type, is_public, parent_id, local_path, mime_type";

/// Repository for file metadata.
pub struct FileRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRepository<'a> {
    /// Create a new FileRepository with the given database pool reference.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new file entry.
    pub async fn create(&self, file: &NewFile) -> Result<File> {
        let blob = file.kind.blob();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO files (user_id, name, file_type, is_public, parent_id, local_path, mime_type)
             VALUES (?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(file.user_id)
        .bind(&file.name)
        .bind(file.kind.file_type().as_str())
        .bind(file.is_public)
        .bind(file.parent_id)
        .bind(blob.map(|b| b.local_path.as_str()))
        .bind(blob.map(|b| b.mime_type.as_str()))
        .fetch_one(self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| FileboxError::Database(format!("file {id} vanished after insert")))
    }

    /// Get a file by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<File>> {
        let row = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(File::try_from).transpose()
    }

    /// One page of the children of `parent_id`, ordered by ID.
    pub async fn list_by_parent(&self, parent_id: i64, page: u32, page_size: u32) -> Result<Vec<File>> {
        let offset = i64::from(page) * i64::from(page_size);
        let rows = sqlx::query_as::<_, FileRow>(&format!(
            "SELECT {FILE_COLUMNS} FROM files WHERE parent_id = ? ORDER BY id LIMIT ? OFFSET ?"
        ))
        .bind(parent_id)
        .bind(i64::from(page_size))
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(File::try_from).collect()
    }

    /// Set the visibility flag. Returns the updated file, or `None` if absent.
    pub async fn set_public(&self, id: i64, is_public: bool) -> Result<Option<File>> {
        let result = sqlx::query("UPDATE files SET is_public = ? WHERE id = ?")
            .bind(is_public)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Count all entries.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM files")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
