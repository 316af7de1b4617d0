use roam_common::lifecycle::Sweeper;

use async_trait::async_trait;
use zeroize::Zeroizing;

use crate::jobs::{Job, JobError};

/// Triggers the deletion sweep the same way an external caller would, by presenting the
/// configured trigger secret.
pub struct SweepDeletionRequestsJob {
    sweeper: Sweeper,
    trigger_secret: Zeroizing<String>,
}

impl SweepDeletionRequestsJob {
    pub fn new(sweeper: Sweeper, trigger_secret: Zeroizing<String>) -> Self {
        Self {
            sweeper,
            trigger_secret,
        }
    }
}

#[async_trait]
impl Job for SweepDeletionRequestsJob {
    fn name(&self) -> &'static str {
        "Sweep Deletion Requests"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        let summary = self.sweeper.sweep(Some(self.trigger_secret.as_str())).await?;

        for failure in summary.failed.iter() {
            log::warn!(
                "Deletion request {} for user {} was not completed: {}",
                failure.request_id,
                failure.user_id,
                failure.reason,
            );
        }

        Ok(())
    }
}
