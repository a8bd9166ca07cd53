//! User model for filebox.

/// A registered user.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login email (unique).
    pub email: String,
    /// Password digest (Argon2 PHC string). Never sent to clients.
    pub password: String,
    /// Account creation timestamp.
    pub created_at: String,
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login email.
    pub email: String,
    /// Password digest, already hashed.
    pub password: String,
}

impl NewUser {
    /// Create a new user record from an email and a pre-hashed password.
    pub fn new(email: impl Into<String>, password_digest: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password_digest.into(),
        }
    }
}
