//! Durable job queue.
//!
//! Producers call [`enqueue`] with a typed [`JobPayload`]; consumers run a
//! [`Worker`] that claims jobs and hands them to a [`JobHandler`]. Delivery is
//! at-least-once: a job whose worker vanished is redelivered after the claim
//! timeout, so handlers must be safe to re-run.
//!
//! Job lifecycle:
//!
//! ```text
//! enqueued -> claimed -> completed
//!    ^           |
//!    +-- retry --+--> failed (dead letter)
//! ```

mod sqlite;
mod worker;

pub use sqlite::SqliteJobQueue;
pub use worker::{JobHandler, Processed, Worker, WorkerOptions};

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::{FileboxError, Result};

/// State of a job record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Waiting to be claimed (possibly not before `available_at`).
    Enqueued,
    /// Claimed by a worker.
    Claimed,
    /// Handler finished successfully.
    Completed,
    /// Dead letter: permanent failure or retries exhausted.
    Failed,
}

impl JobState {
    /// Database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Enqueued => "enqueued",
            JobState::Claimed => "claimed",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}

impl TryFrom<String> for JobState {
    type Error = String;

    fn try_from(s: String) -> std::result::Result<Self, Self::Error> {
        match s.as_str() {
            "enqueued" => Ok(JobState::Enqueued),
            "claimed" => Ok(JobState::Claimed),
            "completed" => Ok(JobState::Completed),
            "failed" => Ok(JobState::Failed),
            _ => Err(format!("unknown job state: {s}")),
        }
    }
}

/// A job record as stored in the queue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Job {
    /// Job ID.
    pub id: i64,
    /// Queue name.
    pub queue: String,
    /// JSON payload.
    pub payload: String,
    /// Current state.
    #[sqlx(try_from = "String")]
    pub state: JobState,
    /// Number of times the job has been claimed.
    pub attempts: i64,
    /// Reason of the most recent failure.
    pub last_error: Option<String>,
    /// Earliest claim time (unix millis).
    pub available_at: i64,
    /// Time of the current claim (unix millis).
    pub claimed_at: Option<i64>,
    /// Creation time (unix millis).
    pub created_at: i64,
    /// Last state change (unix millis).
    pub updated_at: i64,
}

/// Per-state job counts for one queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub enqueued: i64,
    pub claimed: i64,
    pub completed: i64,
    pub failed: i64,
}

/// What a handler reports back for one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The job is done.
    Completed,
    /// The job failed. Retryable failures are re-enqueued with backoff until
    /// the retry policy gives up; the rest are dead-lettered immediately.
    Failed { reason: String, retryable: bool },
}

impl JobOutcome {
    /// A failure that will not succeed on another attempt.
    pub fn permanent(reason: impl Into<String>) -> Self {
        JobOutcome::Failed {
            reason: reason.into(),
            retryable: false,
        }
    }

    /// A failure that may succeed on another attempt.
    pub fn retryable(reason: impl Into<String>) -> Self {
        JobOutcome::Failed {
            reason: reason.into(),
            retryable: true,
        }
    }
}

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total deliveries allowed, including the first.
    pub max_attempts: u32,
    /// Delay before the second delivery; doubles after each further failure.
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Whether a job that has been delivered `attempts` times may run again.
    pub fn allows_retry(&self, attempts: u32) -> bool {
        attempts < self.max_attempts
    }

    /// Whether a delivery is past the cap. Only redelivered stale claims get
    /// here, since failed deliveries stop retrying at `max_attempts`.
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts > self.max_attempts
    }

    /// Delay before the next delivery after `attempts` failed deliveries.
    pub fn backoff(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1 << exponent)
    }
}

/// A typed job payload bound to a queue name.
pub trait JobPayload: Serialize + DeserializeOwned + Send + 'static {
    /// Queue the payload travels on.
    const QUEUE: &'static str;
}

/// Storage contract for the job queue.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Append a job. Returns the new job ID.
    async fn enqueue(&self, queue: &str, payload: &serde_json::Value) -> Result<i64>;

    /// Atomically claim the oldest available job on `queue`.
    ///
    /// Jobs claimed more than `claim_timeout` ago count as available again.
    async fn claim(&self, queue: &str, claim_timeout: Duration) -> Result<Option<Job>>;

    /// Mark a claimed delivery completed.
    ///
    /// `complete`, `retry` and `dead_letter` take the [`Job`] returned by
    /// `claim` and fail with a `Queue` error once that delivery has been
    /// settled or handed to another worker.
    async fn complete(&self, job: &Job) -> Result<()>;

    /// Put a claimed delivery back, claimable after `delay`.
    async fn retry(&self, job: &Job, reason: &str, delay: Duration) -> Result<()>;

    /// Move a claimed delivery to the dead-letter state.
    async fn dead_letter(&self, job: &Job, reason: &str) -> Result<()>;

    /// Fetch a job by ID.
    async fn get(&self, job_id: i64) -> Result<Option<Job>>;

    /// Per-state counts for `queue`.
    async fn stats(&self, queue: &str) -> Result<QueueStats>;

    /// Dead-lettered jobs on `queue`, oldest first.
    async fn dead_letters(&self, queue: &str) -> Result<Vec<Job>>;

    /// Delete completed jobs last touched more than `older_than` ago.
    async fn purge_completed(&self, older_than: Duration) -> Result<u64>;
}

/// Serialize a typed payload and enqueue it on its queue.
pub async fn enqueue<J: JobPayload>(queue: &dyn JobQueue, job: &J) -> Result<i64> {
    let payload =
        serde_json::to_value(job).map_err(|e| FileboxError::Queue(format!("encode job: {e}")))?;
    queue.enqueue(J::QUEUE, &payload).await
}
