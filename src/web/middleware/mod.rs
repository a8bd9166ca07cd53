//! Request extractors for the HTTP API.

mod auth;

pub use auth::{AuthUser, OptionalAuthUser, SessionToken, TOKEN_HEADER};
