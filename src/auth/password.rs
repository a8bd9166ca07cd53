//! Password hashing for filebox.
//!
//! Uses Argon2id. Digests are PHC strings carrying their own salt and
//! parameters, so verification works across parameter changes.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand_core::OsRng;
use thiserror::Error;

use crate::FileboxError;

/// Password-related errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),

    /// Stored digest is not a valid PHC string.
    #[error("invalid password hash format")]
    InvalidHash,

    /// Password does not match the digest.
    #[error("password verification failed")]
    VerificationFailed,
}

impl From<PasswordError> for FileboxError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::VerificationFailed => FileboxError::Auth(e.to_string()),
            other => FileboxError::Database(other.to_string()),
        }
    }
}

/// Create the Argon2 hasher.
///
/// Parameters:
/// - Memory cost: 19 MiB (19456 KiB)
/// - Time cost: 2 iterations
/// - Parallelism: 1 lane
fn create_argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(19456, 2, 1, None)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        params,
    ))
}

/// Hash a password using Argon2id.
///
/// # Examples
///
/// ```
/// use filebox::hash_password;
///
/// let hash = hash_password("secret").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = create_argon2()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored digest.
///
/// # Examples
///
/// ```
/// use filebox::{hash_password, verify_password};
///
/// let hash = hash_password("secret").unwrap();
/// assert!(verify_password("secret", &hash).is_ok());
/// assert!(verify_password("wrong", &hash).is_err());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    // Parameters come from the parsed hash.
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::VerificationFailed)
}

/// Hash on the blocking pool; Argon2 is deliberately slow.
pub(crate) async fn hash_password_blocking(password: String) -> crate::Result<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| FileboxError::Database(format!("hash task failed: {e}")))?
        .map_err(FileboxError::from)
}

/// Verify on the blocking pool.
pub(crate) async fn verify_password_blocking(
    password: String,
    hash: String,
) -> Result<(), PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::HashError(format!("verify task failed: {e}")))?
}
