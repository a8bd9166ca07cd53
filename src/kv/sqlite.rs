//! Durable expiring entries in the `kv_entries` table.

use std::time::Duration;

use async_trait::async_trait;

use super::KvStore;
use crate::db::{now_millis, Database};
use crate::Result;

/// [`KvStore`] backed by the main SQLite database.
///
/// Survives restarts and is shared by every process opening the same file.
#[derive(Debug, Clone)]
pub struct SqliteKvStore {
    db: Database,
}

impl SqliteKvStore {
    /// Create a store over an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn deadline(ttl: Duration) -> i64 {
    now_millis().saturating_add(i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX))
}

#[async_trait]
impl KvStore for SqliteKvStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        sqlx::query(
            "INSERT INTO kv_entries (key, value, expires_at) VALUES ($1, $2, $3)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, expires_at = excluded.expires_at",
        )
        .bind(key)
        .bind(value)
        .bind(deadline(ttl))
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let value = sqlx::query_scalar::<_, String>(
            "SELECT value FROM kv_entries WHERE key = $1 AND expires_at > $2",
        )
        .bind(key)
        .bind(now_millis())
        .fetch_optional(self.db.pool())
        .await?;
        Ok(value)
    }

    async fn del(&self, key: &str) -> Result<bool> {
        let deleted = sqlx::query_scalar::<_, i64>(
            "DELETE FROM kv_entries WHERE key = $1 RETURNING expires_at",
        )
        .bind(key)
        .fetch_optional(self.db.pool())
        .await?;
        Ok(deleted.is_some_and(|expires_at| expires_at > now_millis()))
    }

    async fn purge_expired(&self) -> Result<u64> {
        let result = sqlx::query("DELETE FROM kv_entries WHERE expires_at <= $1")
            .bind(now_millis())
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }

    async fn is_alive(&self) -> bool {
        self.db.ping().await
    }
}
