//! Background jobs: payloads, handlers and worker startup.

mod thumbnail;
mod welcome;

pub use thumbnail::{ThumbnailHandler, ThumbnailJob};
pub use welcome::{WelcomeHandler, WelcomeJob};

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::WorkerConfig;
use crate::db::Database;
use crate::file::BlobStore;
use crate::queue::{JobQueue, Worker, WorkerOptions};

/// Spawn the thumbnail workers and one welcome worker.
///
/// All of them stop once `shutdown` turns true.
pub fn spawn_workers(
    config: &WorkerConfig,
    db: Database,
    blobs: Arc<dyn BlobStore>,
    queue: Arc<dyn JobQueue>,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let options = WorkerOptions::from(config);
    let thumbnails = Arc::new(ThumbnailHandler::new(db.clone(), blobs));
    let welcome = Arc::new(WelcomeHandler::new(db));

    let count = config.thumbnail_concurrency.max(1);
    let mut handles = Vec::with_capacity(count + 1);

    for _ in 0..count {
        let worker = Worker::new(queue.clone(), thumbnails.clone(), options);
        handles.push(tokio::spawn(worker.run(shutdown.clone())));
    }

    let worker = Worker::new(queue, welcome, options);
    handles.push(tokio::spawn(worker.run(shutdown)));

    info!(thumbnail_workers = count, "Background workers started");
    handles
}
