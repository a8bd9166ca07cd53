//! User registration for filebox.

use thiserror::Error;
use tracing::{info, warn};

use super::password::hash_password_blocking;
use crate::db::{Database, NewUser, User, UserRepository};
use crate::jobs::WelcomeJob;
use crate::queue::{self, JobQueue};
use crate::FileboxError;

/// Registration-specific errors.
///
/// Display strings are the client-facing messages.
#[derive(Error, Debug)]
pub enum RegistrationError {
    #[error("Missing email")]
    MissingEmail,

    #[error("Missing password")]
    MissingPassword,

    #[error("Already exist")]
    EmailExists,
}

impl From<RegistrationError> for FileboxError {
    fn from(e: RegistrationError) -> Self {
        FileboxError::Validation(e.to_string())
    }
}

/// Registration request data. Empty strings count as missing.
#[derive(Debug, Clone, Default)]
pub struct RegistrationRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegistrationRequest {
    /// Create a request with both fields present.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    fn validate(&self) -> Result<(&str, &str), RegistrationError> {
        let email = self
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or(RegistrationError::MissingEmail)?;
        let password = self
            .password
            .as_deref()
            .filter(|p| !p.is_empty())
            .ok_or(RegistrationError::MissingPassword)?;
        Ok((email, password))
    }
}

/// Register a new user and queue their welcome job.
///
/// The welcome job is best-effort: a failed enqueue is logged and the
/// registration still succeeds.
pub async fn register(
    db: &Database,
    jobs: &dyn JobQueue,
    request: &RegistrationRequest,
) -> crate::Result<User> {
    let (email, password) = request.validate()?;

    let repo = UserRepository::new(db.pool());
    if repo.email_exists(email).await? {
        return Err(RegistrationError::EmailExists.into());
    }

    let digest = hash_password_blocking(password.to_string()).await?;
    let user = repo.create(&NewUser::new(email, digest)).await?;

    info!(user_id = user.id, "New user registered");

    if let Err(e) = queue::enqueue(jobs, &WelcomeJob { user_id: user.id }).await {
        warn!(user_id = user.id, "Failed to enqueue welcome job: {}", e);
    }

    Ok(user)
}
