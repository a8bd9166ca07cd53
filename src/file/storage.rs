//! Blob storage for filebox.
//!
//! Payloads are stored flat under a base directory with UUID names that keep
//! the extension of the uploaded name:
//! ```text
//! {base_path}/
//! ├── 0b7c2f4e-3c1d-4a8e-9a55-7e0c3b1d2f60.png
//! ├── 0b7c2f4e-3c1d-4a8e-9a55-7e0c3b1d2f60_500.png
//! ├── 0b7c2f4e-3c1d-4a8e-9a55-7e0c3b1d2f60_250.png
//! └── 9d1e6a02-5b0f-4c27-8f0e-2b6a4d3c9e11.txt
//! ```

use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use uuid::Uuid;

use crate::{FileboxError, Result};

/// Path-addressed byte storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Allocate a fresh path for a payload uploaded as `original_name`.
    fn allocate(&self, original_name: &str) -> String;

    /// Write (or overwrite) the blob at `path`.
    async fn write(&self, path: &str, content: &[u8]) -> Result<()>;

    /// Read the blob at `path`. Missing blobs are `NotFound`.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Whether a blob exists at `path`.
    async fn exists(&self, path: &str) -> bool;
}

/// [`BlobStore`] on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a store rooted at `base_path`, creating the directory if needed.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        std::fs::create_dir_all(&base_path)?;
        Ok(Self { base_path })
    }

    /// Get the base path of this store.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Extract a short alphanumeric extension, if any.
    fn extract_extension(filename: &str) -> Option<String> {
        Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 10)
            .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| ext.to_ascii_lowercase())
    }

    /// Resolve `path`, refusing anything outside the base directory.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let path = Path::new(path);
        let escapes = path
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if escapes || !path.starts_with(&self.base_path) {
            return Err(FileboxError::NotFound(format!("blob {}", path.display())));
        }
        Ok(path.to_path_buf())
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    fn allocate(&self, original_name: &str) -> String {
        let stored_name = match Self::extract_extension(original_name) {
            Some(ext) => format!("{}.{ext}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        self.base_path.join(stored_name).to_string_lossy().into_owned()
    }

    async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
        let path = self.resolve(path)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let resolved = self.resolve(path)?;
        match tokio::fs::read(&resolved).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileboxError::NotFound(format!("blob {path}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, path: &str) -> bool {
        match self.resolve(path) {
            Ok(resolved) => tokio::fs::try_exists(&resolved).await.unwrap_or(false),
            Err(_) => false,
        }
    }
}
