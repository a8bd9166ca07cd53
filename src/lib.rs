//! filebox - multi-user file storage service
//!
//! Users sign up, open token sessions and store files and folders in a
//! per-user tree. Image uploads get thumbnails from background workers.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod file;
pub mod jobs;
pub mod kv;
pub mod logging;
pub mod queue;
pub mod web;

pub use auth::{
    hash_password, register, verify_password, PasswordError, RegistrationError,
    RegistrationRequest, SessionError, SessionManager,
};
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{FileboxError, Result};
pub use file::{
    BlobStore, File, FileKind, FileService, FileType, LocalBlobStore, UploadRequest,
};
pub use kv::{KvStore, MemoryKvStore, SqliteKvStore};
pub use queue::{JobQueue, JobState, SqliteJobQueue, Worker};
pub use web::{create_router, AppState, WebServer};
