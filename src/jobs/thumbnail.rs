//! Thumbnail generation jobs.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::db::Database;
use crate::file::{
    resize_to_width, thumbnail_path, BlobStore, FileKind, FileRepository, THUMBNAIL_SIZES,
};
use crate::queue::{JobHandler, JobOutcome, JobPayload};
use crate::{FileboxError, Result};

/// Request to derive the thumbnails of one uploaded image.
///
/// Both fields are optional on the wire so that a malformed job is
/// dead-lettered with a clear reason instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailJob {
    pub user_id: Option<i64>,
    pub file_id: Option<i64>,
}

impl ThumbnailJob {
    pub fn new(user_id: i64, file_id: i64) -> Self {
        Self {
            user_id: Some(user_id),
            file_id: Some(file_id),
        }
    }
}

impl JobPayload for ThumbnailJob {
    const QUEUE: &'static str = "fileQueue";
}

/// Writes every thumbnail size next to the original image.
///
/// Outputs go to deterministic paths, so redelivered or duplicate jobs just
/// overwrite them with identical bytes.
pub struct ThumbnailHandler {
    db: Database,
    blobs: Arc<dyn BlobStore>,
}

impl ThumbnailHandler {
    pub fn new(db: Database, blobs: Arc<dyn BlobStore>) -> Self {
        Self { db, blobs }
    }

    async fn generate(&self, local_path: &str, size: u32) -> Result<String> {
        let original = self.blobs.read(local_path).await?;
        let resized = tokio::task::spawn_blocking(move || resize_to_width(&original, size))
            .await
            .map_err(|e| FileboxError::Image(format!("resize task failed: {e}")))??;

        let path = thumbnail_path(local_path, size);
        self.blobs.write(&path, &resized).await?;
        Ok(path)
    }
}

#[async_trait]
impl JobHandler for ThumbnailHandler {
    type Payload = ThumbnailJob;

    async fn handle(&self, job_id: i64, job: ThumbnailJob) -> JobOutcome {
        let Some(file_id) = job.file_id else {
            return JobOutcome::permanent("Missing fileId");
        };
        let Some(user_id) = job.user_id else {
            return JobOutcome::permanent("Missing userId");
        };

        let file = match FileRepository::new(self.db.pool()).get_by_id(file_id).await {
            Ok(Some(file)) if file.is_owned_by(user_id) => file,
            Ok(_) => return JobOutcome::permanent("File not found"),
            Err(e) => return JobOutcome::retryable(e.to_string()),
        };

        let FileKind::Image(blob) = &file.kind else {
            return JobOutcome::permanent("File is not an image");
        };

        let results = join_all(
            THUMBNAIL_SIZES
                .iter()
                .map(|&size| self.generate(&blob.local_path, size)),
        )
        .await;

        let failures: Vec<String> = THUMBNAIL_SIZES
            .iter()
            .zip(results)
            .filter_map(|(size, result)| match result {
                Ok(path) => {
                    debug!(job_id, file_id, size, path = %path, "Thumbnail written");
                    None
                }
                Err(e) => Some(format!("{size}: {e}")),
            })
            .collect();

        if !failures.is_empty() {
            return JobOutcome::retryable(format!(
                "thumbnail generation failed for {}",
                failures.join("; ")
            ));
        }

        info!(job_id, file_id, "Thumbnails generated");
        JobOutcome::Completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::file::{LocalBlobStore, NewFile, StoredBlob};
    use image::{ImageFormat, RgbImage};
    use std::io::Cursor;
    use tempfile::TempDir;

    struct Fixture {
        _temp_dir: TempDir,
        db: Database,
        blobs: Arc<LocalBlobStore>,
        handler: ThumbnailHandler,
        owner: i64,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open_in_memory().await.unwrap();
        let owner = UserRepository::new(db.pool())
            .create(&NewUser::new("owner@x.com", "d"))
            .await
            .unwrap()
            .id;
        let blobs = Arc::new(LocalBlobStore::new(temp_dir.path()).unwrap());
        let handler = ThumbnailHandler::new(db.clone(), blobs.clone());
        Fixture {
            _temp_dir: temp_dir,
            db,
            blobs,
            handler,
            owner,
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, image::Rgb([200, 30, 30]));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png).unwrap();
        out.into_inner()
    }

    async fn store(fx: &Fixture, name: &str, content: &[u8], image: bool) -> (i64, String) {
        let local_path = fx.blobs.allocate(name);
        fx.blobs.write(&local_path, content).await.unwrap();
        let blob = StoredBlob {
            local_path: local_path.clone(),
            mime_type: "image/png".to_string(),
        };
        let kind = if image {
            FileKind::Image(blob)
        } else {
            FileKind::Document(blob)
        };
        let file = FileRepository::new(fx.db.pool())
            .create(&NewFile::new(fx.owner, name, kind))
            .await
            .unwrap();
        (file.id, local_path)
    }

    #[test]
    fn test_job_wire_format() {
        let job = ThumbnailJob::new(3, 9);
        assert_eq!(
            serde_json::to_value(&job).unwrap(),
            serde_json::json!({"userId": 3, "fileId": 9})
        );

        let partial: ThumbnailJob = serde_json::from_str(r#"{"userId": 3}"#).unwrap();
        assert_eq!(partial.file_id, None);
    }

    #[tokio::test]
    async fn test_generates_all_sizes() {
        let fx = setup().await;
        let (file_id, local_path) = store(&fx, "pic.png", &png(1000, 500), true).await;

        let outcome = fx
            .handler
            .handle(1, ThumbnailJob::new(fx.owner, file_id))
            .await;
        assert_eq!(outcome, JobOutcome::Completed);

        for size in THUMBNAIL_SIZES {
            let bytes = fx.blobs.read(&thumbnail_path(&local_path, size)).await.unwrap();
            let img = image::load_from_memory(&bytes).unwrap();
            assert_eq!(img.width(), size);
            assert_eq!(img.height(), size / 2);
        }
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let fx = setup().await;
        let (file_id, local_path) = store(&fx, "pic.png", &png(600, 600), true).await;
        let job = ThumbnailJob::new(fx.owner, file_id);

        assert_eq!(fx.handler.handle(1, job.clone()).await, JobOutcome::Completed);
        let first = fx.blobs.read(&thumbnail_path(&local_path, 250)).await.unwrap();

        assert_eq!(fx.handler.handle(2, job).await, JobOutcome::Completed);
        let second = fx.blobs.read(&thumbnail_path(&local_path, 250)).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_permanent_failures() {
        let fx = setup().await;
        let (doc_id, _) = store(&fx, "a.txt", b"text", false).await;
        let (image_id, _) = store(&fx, "pic.png", &png(10, 10), true).await;

        let cases = [
            (
                ThumbnailJob {
                    user_id: Some(fx.owner),
                    file_id: None,
                },
                "Missing fileId",
            ),
            (
                ThumbnailJob {
                    user_id: None,
                    file_id: Some(image_id),
                },
                "Missing userId",
            ),
            (ThumbnailJob::new(fx.owner, 9999), "File not found"),
            (ThumbnailJob::new(fx.owner + 1, image_id), "File not found"),
            (ThumbnailJob::new(fx.owner, doc_id), "File is not an image"),
        ];

        for (job, reason) in cases {
            assert_eq!(fx.handler.handle(1, job).await, JobOutcome::permanent(reason));
        }
    }

    /// Local store that refuses writes to one thumbnail size.
    struct RejectingBlobStore {
        inner: Arc<LocalBlobStore>,
        rejected_suffix: &'static str,
    }

    #[async_trait]
    impl BlobStore for RejectingBlobStore {
        fn allocate(&self, original_name: &str) -> String {
            self.inner.allocate(original_name)
        }

        async fn write(&self, path: &str, content: &[u8]) -> Result<()> {
            if path.contains(self.rejected_suffix) {
                return Err(FileboxError::Io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "write rejected",
                )));
            }
            self.inner.write(path, content).await
        }

        async fn read(&self, path: &str) -> Result<Vec<u8>> {
            self.inner.read(path).await
        }

        async fn exists(&self, path: &str) -> bool {
            self.inner.exists(path).await
        }
    }

    #[tokio::test]
    async fn test_one_failed_size_keeps_the_others() {
        let fx = setup().await;
        let (file_id, local_path) = store(&fx, "pic.png", &png(1000, 500), true).await;
        let blobs = Arc::new(RejectingBlobStore {
            inner: fx.blobs.clone(),
            rejected_suffix: "_250.",
        });
        let handler = ThumbnailHandler::new(fx.db.clone(), blobs);

        match handler.handle(1, ThumbnailJob::new(fx.owner, file_id)).await {
            JobOutcome::Failed { reason, retryable } => {
                assert!(retryable);
                assert!(reason.contains("250:"), "{reason}");
                assert!(!reason.contains("500:"), "{reason}");
                assert!(!reason.contains("100:"), "{reason}");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        assert!(fx.blobs.exists(&thumbnail_path(&local_path, 500)).await);
        assert!(fx.blobs.exists(&thumbnail_path(&local_path, 100)).await);
        assert!(!fx.blobs.exists(&thumbnail_path(&local_path, 250)).await);
    }

    #[tokio::test]
    async fn test_undecodable_image_is_retryable_and_lists_sizes() {
        let fx = setup().await;
        let (file_id, _) = store(&fx, "pic.png", b"not really a png", true).await;

        match fx.handler.handle(1, ThumbnailJob::new(fx.owner, file_id)).await {
            JobOutcome::Failed { reason, retryable } => {
                assert!(retryable);
                for size in ["500", "250", "100"] {
                    assert!(reason.contains(size), "{reason}");
                }
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
