//! Job queue stored in the `jobs` table.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{Job, JobQueue, JobState, QueueStats};
use crate::db::{now_millis, Database};
use crate::{FileboxError, Result};

const JOB_COLUMNS: &str =
    "id, queue, payload, state, attempts, last_error, available_at, claimed_at, created_at, updated_at";

fn millis(d: Duration) -> i64 {
    i64::try_from(d.as_millis()).unwrap_or(i64::MAX)
}

/// [`JobQueue`] backed by SQLite.
///
/// A claim is a single `UPDATE ... RETURNING`, so concurrent workers, in this
/// process or another one sharing the database file, never claim the same
/// delivery twice.
#[derive(Debug, Clone)]
pub struct SqliteJobQueue {
    db: Database,
}

impl SqliteJobQueue {
    /// Create a queue over an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Move a delivery out of `claimed`.
    ///
    /// `attempts` grows on every claim, so it identifies the delivery; a
    /// worker whose claim went stale and was handed to another worker no
    /// longer matches and gets a `Queue` error.
    async fn transition(
        &self,
        job: &Job,
        to: JobState,
        last_error: Option<&str>,
        available_at: Option<i64>,
    ) -> Result<()> {
        let now = now_millis();
        let result = sqlx::query(
            "UPDATE jobs
             SET state = ?, last_error = COALESCE(?, last_error),
                 available_at = COALESCE(?, available_at), claimed_at = NULL, updated_at = ?
             WHERE id = ? AND state = 'claimed' AND attempts = ?",
        )
        .bind(to.as_str())
        .bind(last_error)
        .bind(available_at)
        .bind(now)
        .bind(job.id)
        .bind(job.attempts)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() == 0 {
            return Err(FileboxError::Queue(format!(
                "job {} delivery {} is no longer claimed; cannot move it to {}",
                job.id,
                job.attempts,
                to.as_str()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for SqliteJobQueue {
    async fn enqueue(&self, queue: &str, payload: &serde_json::Value) -> Result<i64> {
        let now = now_millis();
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO jobs (queue, payload, state, available_at, created_at, updated_at)
             VALUES (?, ?, 'enqueued', ?, ?, ?) RETURNING id",
        )
        .bind(queue)
        .bind(payload.to_string())
        .bind(now)
        .bind(now)
        .bind(now)
        .fetch_one(self.db.pool())
        .await?;

        debug!(job_id = id, queue, "Job enqueued");
        Ok(id)
    }

    async fn claim(&self, queue: &str, claim_timeout: Duration) -> Result<Option<Job>> {
        let now = now_millis();
        let stale_before = now.saturating_sub(millis(claim_timeout));

        let sql = format!(
            "UPDATE jobs
             SET state = 'claimed', attempts = attempts + 1, claimed_at = ?, updated_at = ?
             WHERE id = (
                 SELECT id FROM jobs
                 WHERE queue = ?
                   AND ((state = 'enqueued' AND available_at <= ?)
                        OR (state = 'claimed' AND claimed_at <= ?))
                 ORDER BY id
                 LIMIT 1
             )
             RETURNING {JOB_COLUMNS}"
        );

        let job = sqlx::query_as::<_, Job>(&sql)
            .bind(now)
            .bind(now)
            .bind(queue)
            .bind(now)
            .bind(stale_before)
            .fetch_optional(self.db.pool())
            .await?;

        if let Some(ref job) = job {
            debug!(job_id = job.id, queue, attempts = job.attempts, "Job claimed");
        }
        Ok(job)
    }

    async fn complete(&self, job: &Job) -> Result<()> {
        self.transition(job, JobState::Completed, None, None).await
    }

    async fn retry(&self, job: &Job, reason: &str, delay: Duration) -> Result<()> {
        let available_at = now_millis().saturating_add(millis(delay));
        self.transition(job, JobState::Enqueued, Some(reason), Some(available_at))
            .await
    }

    async fn dead_letter(&self, job: &Job, reason: &str) -> Result<()> {
        self.transition(job, JobState::Failed, Some(reason), None)
            .await
    }

    async fn get(&self, job_id: i64) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
            .bind(job_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(job)
    }

    async fn stats(&self, queue: &str) -> Result<QueueStats> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM jobs WHERE queue = ? GROUP BY state")
                .bind(queue)
                .fetch_all(self.db.pool())
                .await?;

        let mut stats = QueueStats::default();
        for (state, count) in rows {
            match JobState::try_from(state) {
                Ok(JobState::Enqueued) => stats.enqueued = count,
                Ok(JobState::Claimed) => stats.claimed = count,
                Ok(JobState::Completed) => stats.completed = count,
                Ok(JobState::Failed) => stats.failed = count,
                Err(e) => return Err(FileboxError::Database(e)),
            }
        }
        Ok(stats)
    }

    async fn dead_letters(&self, queue: &str) -> Result<Vec<Job>> {
        let jobs = sqlx::query_as::<_, Job>(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE queue = ? AND state = 'failed' ORDER BY id"
        ))
        .bind(queue)
        .fetch_all(self.db.pool())
        .await?;
        Ok(jobs)
    }

    async fn purge_completed(&self, older_than: Duration) -> Result<u64> {
        let cutoff = now_millis().saturating_sub(millis(older_than));
        let result = sqlx::query("DELETE FROM jobs WHERE state = 'completed' AND updated_at <= ?")
            .bind(cutoff)
            .execute(self.db.pool())
            .await?;
        Ok(result.rows_affected())
    }
}
