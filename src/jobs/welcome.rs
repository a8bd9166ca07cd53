//! Welcome jobs for new users.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::db::{Database, UserRepository};
use crate::queue::{JobHandler, JobOutcome, JobPayload};

/// Greets a freshly registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WelcomeJob {
    pub user_id: i64,
}

impl JobPayload for WelcomeJob {
    const QUEUE: &'static str = "userQueue";
}

pub struct WelcomeHandler {
    db: Database,
}

impl WelcomeHandler {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl JobHandler for WelcomeHandler {
    type Payload = WelcomeJob;

    async fn handle(&self, job_id: i64, job: WelcomeJob) -> JobOutcome {
        match UserRepository::new(self.db.pool()).get_by_id(job.user_id).await {
            Ok(Some(user)) => {
                info!(job_id, user_id = user.id, "Welcome {}!", user.email);
                JobOutcome::Completed
            }
            Ok(None) => JobOutcome::permanent("User not found"),
            Err(e) => JobOutcome::retryable(e.to_string()),
        }
    }
}
