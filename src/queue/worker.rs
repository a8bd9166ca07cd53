//! Claim-and-dispatch loop.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use super::{JobOutcome, JobPayload, JobQueue, JobState, RetryPolicy};
use crate::config::WorkerConfig;
use crate::Result;

/// Processes one kind of job.
#[async_trait]
pub trait JobHandler: Send + Sync + 'static {
    /// Payload type; its `QUEUE` decides which queue the worker polls.
    type Payload: JobPayload;

    /// Handle one delivery.
    async fn handle(&self, job_id: i64, payload: Self::Payload) -> JobOutcome;
}

/// Timing and retry knobs for a [`Worker`].
#[derive(Debug, Clone, Copy)]
pub struct WorkerOptions {
    pub policy: RetryPolicy,
    pub poll_interval: Duration,
    pub job_timeout: Duration,
    pub claim_timeout: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for WorkerOptions {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            policy: RetryPolicy {
                max_attempts: config.max_attempts,
                backoff_base: Duration::from_millis(config.backoff_base_ms),
            },
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            job_timeout: Duration::from_secs(config.job_timeout_secs),
            claim_timeout: Duration::from_secs(config.claim_timeout_secs),
        }
    }
}

/// Result of processing one claimed job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Processed {
    pub job_id: i64,
    /// State the job was left in.
    pub state: JobState,
}

/// Polls one queue and feeds jobs to a handler.
pub struct Worker<H: JobHandler> {
    queue: Arc<dyn JobQueue>,
    handler: Arc<H>,
    options: WorkerOptions,
}

impl<H: JobHandler> Worker<H> {
    pub fn new(queue: Arc<dyn JobQueue>, handler: Arc<H>, options: WorkerOptions) -> Self {
        Self {
            queue,
            handler,
            options,
        }
    }

    /// Name of the queue this worker consumes.
    pub fn queue_name(&self) -> &'static str {
        H::Payload::QUEUE
    }

    /// Claim and process at most one job.
    ///
    /// Returns `None` when nothing was claimable.
    pub async fn run_once(&self) -> Result<Option<Processed>> {
        let queue_name = self.queue_name();
        let Some(job) = self
            .queue
            .claim(queue_name, self.options.claim_timeout)
            .await?
        else {
            return Ok(None);
        };

        let attempts = u32::try_from(job.attempts).unwrap_or(u32::MAX);
        if self.options.policy.is_exhausted(attempts) {
            error!(
                job_id = job.id,
                queue = queue_name,
                attempts,
                "Job redelivered past its attempt limit"
            );
            self.queue.dead_letter(&job, "retries exhausted").await?;
            return Ok(Some(Processed {
                job_id: job.id,
                state: JobState::Failed,
            }));
        }

        let payload: H::Payload = match serde_json::from_str(&job.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(job_id = job.id, queue = queue_name, error = %e, "Undecodable job payload");
                self.queue
                    .dead_letter(&job, &format!("invalid payload: {e}"))
                    .await?;
                return Ok(Some(Processed {
                    job_id: job.id,
                    state: JobState::Failed,
                }));
            }
        };

        let outcome = tokio::time::timeout(
            self.options.job_timeout,
            self.handler.handle(job.id, payload),
        )
        .await
        .unwrap_or_else(|_| {
            JobOutcome::retryable(format!(
                "timed out after {}s",
                self.options.job_timeout.as_secs()
            ))
        });

        let state = match outcome {
            JobOutcome::Completed => {
                self.queue.complete(&job).await?;
                debug!(job_id = job.id, queue = queue_name, "Job completed");
                JobState::Completed
            }
            JobOutcome::Failed { reason, retryable }
                if retryable && self.options.policy.allows_retry(attempts) =>
            {
                let delay = self.options.policy.backoff(attempts);
                warn!(
                    job_id = job.id,
                    queue = queue_name,
                    attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Job failed, will retry: {}",
                    reason
                );
                self.queue.retry(&job, &reason, delay).await?;
                JobState::Enqueued
            }
            JobOutcome::Failed { reason, .. } => {
                error!(
                    job_id = job.id,
                    queue = queue_name,
                    attempts,
                    "Job failed permanently: {}",
                    reason
                );
                self.queue.dead_letter(&job, &reason).await?;
                JobState::Failed
            }
        };

        Ok(Some(Processed {
            job_id: job.id,
            state,
        }))
    }

    /// Process jobs until none are claimable. Returns how many were processed.
    pub async fn drain(&self) -> Result<usize> {
        let mut processed = 0;
        while self.run_once().await?.is_some() {
            processed += 1;
        }
        Ok(processed)
    }

    /// Poll until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let queue_name = self.queue_name();
        info!(queue = queue_name, "Worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await {
                Ok(Some(_)) => continue,
                Ok(None) => {}
                Err(e) => error!(queue = queue_name, "Worker error: {}", e),
            }

            tokio::select! {
                _ = tokio::time::sleep(self.options.poll_interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(queue = queue_name, "Worker stopped");
    }
}
