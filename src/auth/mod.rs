//! Authentication module for filebox.
//!
//! This module provides password hashing, token sessions and user
//! registration.

mod password;
mod registration;
mod session;

pub use password::{hash_password, verify_password, PasswordError};
pub use registration::{register, RegistrationError, RegistrationRequest};
pub use session::{
    session_key, SessionError, SessionManager, DEFAULT_SESSION_DURATION_SECS, SESSION_KEY_PREFIX,
};
