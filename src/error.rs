//! Error types for filebox.

use thiserror::Error;

/// Common error type for filebox.
#[derive(Error, Debug)]
pub enum FileboxError {
    /// Missing, malformed or expired credentials.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Authenticated, but not allowed to touch the resource.
    #[error("permission denied: {0}")]
    Permission(String),

    /// Malformed caller input. The message is shown to the client as-is.
    #[error("{0}")]
    Validation(String),

    /// Resource not found (or not visible to the caller).
    #[error("{0} not found")]
    NotFound(String),

    /// Database error.
    ///
    /// Database errors from sqlx are automatically converted.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Job queue error.
    #[error("queue error: {0}")]
    Queue(String),

    /// Image decoding or encoding error.
    #[error("image error: {0}")]
    Image(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl FileboxError {
    /// Whether the error was caused by the caller rather than by a backing service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            FileboxError::Auth(_)
                | FileboxError::Permission(_)
                | FileboxError::Validation(_)
                | FileboxError::NotFound(_)
        )
    }
}

impl From<sqlx::Error> for FileboxError {
    fn from(e: sqlx::Error) -> Self {
        FileboxError::Database(e.to_string())
    }
}

impl From<image::ImageError> for FileboxError {
    fn from(e: image::ImageError) -> Self {
        FileboxError::Image(e.to_string())
    }
}

/// Result type alias for filebox operations.
pub type Result<T> = std::result::Result<T, FileboxError>;
