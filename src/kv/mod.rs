//! Expiring key-value store.
//!
//! Session tokens are held here as `auth_<token> -> user id` entries with a
//! fixed time-to-live. Expiry is passive: a lookup after the deadline returns
//! nothing, and `purge_expired` reclaims space in the background.

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::SessionBackend;
use crate::db::Database;
use crate::Result;

/// Storage contract for expiring string entries.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous entry, for `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Fetch the value under `key` if present and not expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Remove `key`. Returns whether a live entry was removed.
    async fn del(&self, key: &str) -> Result<bool>;

    /// Drop expired entries. Returns how many were removed.
    async fn purge_expired(&self) -> Result<u64>;

    /// Whether the backing store is reachable.
    async fn is_alive(&self) -> bool;
}

/// Build the store selected by the configuration.
pub fn open(backend: SessionBackend, db: &Database) -> Arc<dyn KvStore> {
    match backend {
        SessionBackend::Sqlite => Arc::new(SqliteKvStore::new(db.clone())),
        SessionBackend::Memory => Arc::new(MemoryKvStore::new()),
    }
}
