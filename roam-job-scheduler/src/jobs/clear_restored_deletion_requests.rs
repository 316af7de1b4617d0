use roam_common::lifecycle::{DeletionStore, SharedClock};

use async_trait::async_trait;
use std::time::{Duration, UNIX_EPOCH};

use crate::jobs::{Job, JobError};

/// Prunes restored deletion requests once they age out of the retention window.
pub struct ClearRestoredDeletionRequestsJob {
    store: DeletionStore,
    clock: SharedClock,
    retention: Duration,
}

impl ClearRestoredDeletionRequestsJob {
    pub fn new(store: DeletionStore, clock: SharedClock, retention: Duration) -> Self {
        Self {
            store,
            clock,
            retention,
        }
    }
}

#[async_trait]
impl Job for ClearRestoredDeletionRequestsJob {
    fn name(&self) -> &'static str {
        "Clear Restored Deletion Requests"
    }

    fn is_ready(&self) -> bool {
        true
    }

    async fn execute(&mut self) -> Result<(), JobError> {
        let cutoff = self
            .clock
            .now()
            .checked_sub(self.retention)
            .unwrap_or(UNIX_EPOCH);

        let removed = self.store.delete_restored_before(cutoff).await?;
        log::info!("Removed {removed} restored deletion request(s)");

        Ok(())
    }
}
