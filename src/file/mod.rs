//! File management module for filebox.
//!
//! This module provides:
//! - File and folder metadata with owner/visibility rules
//! - Blob storage with UUID naming
//! - The access-controlled file service
//! - Thumbnail derivation for images

mod metadata;
mod service;
mod storage;
mod thumbnail;

pub use metadata::{File, FileKind, FileRepository, FileType, NewFile, StoredBlob};
pub use service::{FileContent, FileService, UploadRequest};
pub use storage::{BlobStore, LocalBlobStore};
pub use thumbnail::{resize_to_width, thumbnail_path};

/// `parent_id` of entries at the root.
pub const ROOT_PARENT_ID: i64 = 0;

/// Entries per listing page.
pub const PAGE_SIZE: u32 = 20;

/// Thumbnail widths, largest first.
pub const THUMBNAIL_SIZES: [u32; 3] = [500, 250, 100];

/// Default maximum upload size (10MB).
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;
