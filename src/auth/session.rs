//! Token sessions for filebox.
//!
//! A login mints a random token and stores `auth_<token> -> user id` in the
//! key-value store with the configured time-to-live. Every authenticated
//! request resolves its `X-Token` header through the same store.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::password::{verify_password_blocking, PasswordError};
use crate::db::{Database, User, UserRepository};
use crate::kv::KvStore;
use crate::{FileboxError, Result};

/// Key prefix for session entries.
pub const SESSION_KEY_PREFIX: &str = "auth_";

/// Default session lifetime (24 hours).
pub const DEFAULT_SESSION_DURATION_SECS: u64 = 24 * 60 * 60;

/// Session-related errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Token is unknown or expired.
    #[error("session not found")]
    SessionNotFound,

    /// Token resolves to a user that no longer exists.
    #[error("session user no longer exists")]
    UserNotFound,
}

impl From<SessionError> for FileboxError {
    fn from(e: SessionError) -> Self {
        FileboxError::Auth(e.to_string())
    }
}

/// Store key for a session token.
pub fn session_key(token: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{token}")
}

/// Issues, resolves and revokes session tokens.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    store: Arc<dyn KvStore>,
    ttl: Duration,
}

impl SessionManager {
    /// Create a session manager with the default lifetime.
    pub fn new(db: Database, store: Arc<dyn KvStore>) -> Self {
        Self::with_ttl(db, store, Duration::from_secs(DEFAULT_SESSION_DURATION_SECS))
    }

    /// Create a session manager with a custom lifetime.
    pub fn with_ttl(db: Database, store: Arc<dyn KvStore>, ttl: Duration) -> Self {
        Self { db, store, ttl }
    }

    /// Session lifetime.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The backing token store.
    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    /// Check credentials and mint a new token.
    ///
    /// Each successful login yields a distinct token; earlier tokens stay
    /// valid until they expire or are revoked.
    pub async fn login(&self, email: &str, password: &str) -> Result<String> {
        if email.is_empty() || password.is_empty() {
            return Err(SessionError::InvalidCredentials.into());
        }

        let repo = UserRepository::new(self.db.pool());
        let Some(user) = repo.get_by_email(email).await? else {
            debug!("Login attempt for unknown email");
            return Err(SessionError::InvalidCredentials.into());
        };

        match verify_password_blocking(password.to_string(), user.password.clone()).await {
            Ok(()) => {}
            Err(PasswordError::InvalidHash) => {
                warn!(user_id = user.id, "Stored password digest is malformed");
                return Err(SessionError::InvalidCredentials.into());
            }
            Err(PasswordError::VerificationFailed) => {
                return Err(SessionError::InvalidCredentials.into());
            }
            Err(e) => return Err(e.into()),
        }

        let token = Uuid::new_v4().to_string();
        self.store
            .set(&session_key(&token), &user.id.to_string(), self.ttl)
            .await?;

        info!(user_id = user.id, "User logged in");
        Ok(token)
    }

    /// Resolve a token to its user ID.
    pub async fn resolve(&self, token: &str) -> Result<i64> {
        if token.is_empty() {
            return Err(SessionError::SessionNotFound.into());
        }

        let value = self
            .store
            .get(&session_key(token))
            .await?
            .ok_or(SessionError::SessionNotFound)?;

        value.parse::<i64>().map_err(|_| {
            warn!("Session entry holds a non-numeric user id");
            SessionError::SessionNotFound.into()
        })
    }

    /// Resolve a token to its user record.
    pub async fn current_user(&self, token: &str) -> Result<User> {
        let user_id = self.resolve(token).await?;
        UserRepository::new(self.db.pool())
            .get_by_id(user_id)
            .await?
            .ok_or_else(|| SessionError::UserNotFound.into())
    }

    /// Revoke a token.
    pub async fn logout(&self, token: &str) -> Result<()> {
        let user_id = self.resolve(token).await?;
        self.store.del(&session_key(token)).await?;
        info!(user_id, "User logged out");
        Ok(())
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("ttl", &self.ttl)
            .finish()
    }
}
