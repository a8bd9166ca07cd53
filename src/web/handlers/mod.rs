//! API handlers for the HTTP API.

pub mod app;
pub mod auth;
pub mod file;
pub mod user;

pub use app::*;
pub use auth::*;
pub use file::*;
pub use user::*;

use std::sync::Arc;
use std::time::Duration;

use crate::auth::SessionManager;
use crate::config::Config;
use crate::db::Database;
use crate::file::{BlobStore, FileService};
use crate::kv::KvStore;
use crate::queue::JobQueue;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub sessions: SessionManager,
    pub files: FileService,
    pub jobs: Arc<dyn JobQueue>,
}

impl AppState {
    /// Create a new application state with default limits.
    pub fn new(
        db: Database,
        session_store: Arc<dyn KvStore>,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(db.clone(), session_store),
            files: FileService::new(db.clone(), blobs, jobs.clone()),
            db,
            jobs,
        }
    }

    /// Create an application state honoring the session and upload settings.
    pub fn from_config(
        config: &Config,
        db: Database,
        session_store: Arc<dyn KvStore>,
        blobs: Arc<dyn BlobStore>,
        jobs: Arc<dyn JobQueue>,
    ) -> Self {
        Self::new(db, session_store, blobs, jobs)
            .with_session_ttl(config.session.ttl())
            .with_max_upload_bytes(config.files.max_upload_bytes())
    }

    /// Set the session lifetime.
    pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
        self.sessions =
            SessionManager::with_ttl(self.db.clone(), self.sessions.store().clone(), ttl);
        self
    }

    /// Set the maximum decoded upload size.
    pub fn with_max_upload_bytes(mut self, max_bytes: u64) -> Self {
        self.files = self.files.with_max_upload_bytes(max_bytes);
        self
    }
}
