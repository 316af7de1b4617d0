use futures::future;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::identity::{IdentityDeletion, IdentityProvider};
use crate::models::deletion_request::DeletionRequest;

use super::{secrets_match, DeletionStore, LifecycleError, SharedClock};

#[derive(Clone)]
pub struct SweepSettings {
    pub trigger_secret: Zeroizing<String>,
    pub max_concurrent_deletions: usize,
    /// A claim older than this is treated as abandoned by a crashed sweep.
    pub claim_ttl: Duration,
    pub item_timeout: Duration,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub processed: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: Vec<SweepFailure>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepFailure {
    pub request_id: Uuid,
    pub user_id: Uuid,
    pub reason: String,
}

enum ItemOutcome {
    Deleted,
    Skipped,
    Failed(String),
}

/// Hard-deletes every user whose grace period has lapsed without a restore.
pub struct Sweeper {
    store: DeletionStore,
    identity_provider: IdentityProvider,
    clock: SharedClock,
    settings: SweepSettings,
}

impl Sweeper {
    pub fn new(
        store: DeletionStore,
        identity_provider: IdentityProvider,
        clock: SharedClock,
        settings: SweepSettings,
    ) -> Self {
        Self {
            store,
            identity_provider,
            clock,
            settings,
        }
    }

    /// Runs one sweep. The trigger secret is checked before anything else is touched. A failure
    /// on one request is recorded in the summary and never stops the others.
    pub async fn sweep(&self, presented_secret: Option<&str>) -> Result<SweepSummary, LifecycleError> {
        if !self.is_trigger_authorized(presented_secret) {
            log::warn!("Rejected deletion sweep trigger with a missing or incorrect secret");
            return Err(LifecycleError::Unauthorized);
        }

        let now = self.clock.now();
        let stale_claim_before = now.checked_sub(self.settings.claim_ttl).unwrap_or(UNIX_EPOCH);

        let candidates = match self.store.find_overdue(now, stale_claim_before).await {
            Ok(c) => c,
            Err(e) => {
                log::error!("Failed to load overdue deletion requests: {e}");
                return Err(e.into());
            }
        };

        log::info!("Deletion sweep found {} overdue request(s)", candidates.len());

        let limiter = Arc::new(Semaphore::new(self.settings.max_concurrent_deletions.max(1)));
        let mut ids = Vec::with_capacity(candidates.len());
        let mut handles = Vec::with_capacity(candidates.len());

        for request in candidates {
            ids.push((request.id, request.user_id));
            handles.push(tokio::spawn(Self::process_request(
                Arc::clone(&self.store),
                Arc::clone(&self.identity_provider),
                Arc::clone(&self.clock),
                Arc::clone(&limiter),
                self.settings.item_timeout,
                stale_claim_before,
                request,
            )));
        }

        let results = future::join_all(handles).await;

        let mut summary = SweepSummary {
            processed: ids.len(),
            ..Default::default()
        };

        for ((request_id, user_id), result) in ids.into_iter().zip(results) {
            let reason = match result {
                Ok(ItemOutcome::Deleted) => {
                    summary.succeeded += 1;
                    continue;
                }
                Ok(ItemOutcome::Skipped) => {
                    summary.skipped += 1;
                    continue;
                }
                Ok(ItemOutcome::Failed(reason)) => reason,
                Err(e) => {
                    log::error!("Deletion task for request {request_id} did not finish: {e}");
                    format!("Deletion task did not finish: {e}")
                }
            };

            summary.failed.push(SweepFailure {
                request_id,
                user_id,
                reason,
            });
        }

        log::info!(
            "Deletion sweep finished: {} processed, {} succeeded, {} skipped, {} failed",
            summary.processed,
            summary.succeeded,
            summary.skipped,
            summary.failed.len(),
        );

        Ok(summary)
    }

    async fn process_request(
        store: DeletionStore,
        identity_provider: IdentityProvider,
        clock: SharedClock,
        limiter: Arc<Semaphore>,
        item_timeout: Duration,
        stale_claim_before: SystemTime,
        request: DeletionRequest,
    ) -> ItemOutcome {
        let _permit = match limiter.acquire_owned().await {
            Ok(p) => p,
            Err(e) => return ItemOutcome::Failed(format!("Sweep limiter closed: {e}")),
        };

        match store.claim(request.id, clock.now(), stale_claim_before).await {
            Ok(true) => (),
            Ok(false) => {
                log::info!(
                    "Deletion request {} was restored or claimed elsewhere; skipping",
                    request.id
                );
                return ItemOutcome::Skipped;
            }
            Err(e) => {
                log::error!("Failed to claim deletion request {}: {e}", request.id);
                return ItemOutcome::Failed(format!("Failed to claim request: {e}"));
            }
        }

        let deletion = tokio::time::timeout(
            item_timeout,
            identity_provider.delete_identity(request.user_id),
        )
        .await;

        let failure = match deletion {
            Ok(Ok(IdentityDeletion::Deleted)) => None,
            Ok(Ok(IdentityDeletion::AlreadyGone)) => {
                log::info!("User {} was already gone from the identity provider", request.user_id);
                None
            }
            Ok(Err(e)) => Some(e.to_string()),
            Err(_) => Some(format!(
                "Identity deletion timed out after {}ms",
                item_timeout.as_millis()
            )),
        };

        if let Some(reason) = failure {
            log::error!("Failed to delete user {}: {reason}", request.user_id);

            // Left in place, the claim goes stale and the next sweep retries anyway
            if let Err(e) = store.release_claim(request.id).await {
                log::warn!("Failed to release claim on deletion request {}: {e}", request.id);
            }

            return ItemOutcome::Failed(reason);
        }

        if let Err(e) = store.delete_request(request.id).await {
            log::warn!(
                "User {} was deleted but deletion request {} could not be removed: {e}",
                request.user_id,
                request.id,
            );
        }

        log::info!("Deleted user {} (deletion request {})", request.user_id, request.id);
        ItemOutcome::Deleted
    }

    fn is_trigger_authorized(&self, presented_secret: Option<&str>) -> bool {
        match presented_secret {
            Some(presented) => secrets_match(
                self.settings.trigger_secret.as_bytes(),
                presented.as_bytes(),
            ),
            None => false,
        }
    }
}
