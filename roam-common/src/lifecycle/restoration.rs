use uuid::Uuid;

use super::{
    hash_restoration_token, DeletionStore, LifecycleError, SharedClock,
    MAX_RESTORATION_TOKEN_LENGTH,
};

#[derive(Clone, Debug, PartialEq)]
pub struct RestoredAccount {
    pub message: String,
    pub user_id: Uuid,
}

pub struct RestorationHandler {
    store: DeletionStore,
    clock: SharedClock,
}

impl RestorationHandler {
    pub fn new(store: DeletionStore, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    /// Cancels a pending deletion. The token is the only credential; no session is needed.
    pub async fn restore(&self, restoration_token: &str) -> Result<RestoredAccount, LifecycleError> {
        let restoration_token = restoration_token.trim();

        if restoration_token.is_empty() {
            return Err(LifecycleError::MissingToken);
        }

        // Generated tokens are far shorter; anything this long cannot match a stored hash
        if restoration_token.len() > MAX_RESTORATION_TOKEN_LENGTH {
            return Err(LifecycleError::InvalidToken);
        }

        let token_hash = hash_restoration_token(restoration_token);

        let request = self
            .store
            .find_by_token_hash(&token_hash)
            .await?
            .ok_or(LifecycleError::InvalidToken)?;

        if request.is_restored {
            return Err(LifecycleError::AlreadyRestored);
        }

        // A stale claim from a crashed sweeper also blocks restoring until the next sweep
        // retakes the row and either deletes the user or releases the claim
        if request.claimed_at.is_some() {
            return Err(LifecycleError::DeletionInProgress);
        }

        let was_restored = self
            .store
            .restore_request(request.id, request.user_id, self.clock.now())
            .await?;

        if !was_restored {
            // Another restore or a sweeper got to the row between the read and the update
            let current = self.store.find_by_token_hash(&token_hash).await?;
            return Err(match current {
                Some(r) if r.is_restored => LifecycleError::AlreadyRestored,
                Some(_) => LifecycleError::DeletionInProgress,
                None => LifecycleError::InvalidToken,
            });
        }

        log::info!(
            "Restored account for user {} (deletion request {})",
            request.user_id,
            request.id
        );

        Ok(RestoredAccount {
            message: String::from("Your account has been restored. Welcome back!"),
            user_id: request.user_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use std::sync::Arc;
    use std::time::{Duration, SystemTime};

    use crate::db::DaoError;
    use crate::lifecycle::{Clock, DeletionInitiator, DeletionRequestStore};
    use crate::models::deletion_request::{DeletionRequest, NewDeletionRequest};
    use crate::testing::{
        deletion_settings, ManualClock, MemoryDeletionStore, MockIdentityGateway,
        RecordingSender,
    };

    struct Harness {
        store: Arc<MemoryDeletionStore>,
        sender: Arc<RecordingSender>,
        clock: Arc<ManualClock>,
        identity: Arc<MockIdentityGateway>,
        initiator: DeletionInitiator,
        handler: RestorationHandler,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryDeletionStore::new());
        let identity = Arc::new(MockIdentityGateway::new());
        let sender = Arc::new(RecordingSender::new());
        let clock = Arc::new(ManualClock::new());

        let initiator = DeletionInitiator::new(
            store.clone(),
            identity.clone(),
            sender.clone(),
            clock.clone(),
            deletion_settings(),
        );
        let handler = RestorationHandler::new(store.clone(), clock.clone());

        Harness {
            store,
            sender,
            clock,
            identity,
            initiator,
            handler,
        }
    }

    impl Harness {
        async fn schedule_deletion(&self) -> (Uuid, String) {
            let user_id = self.identity.add_password_user("traveler@roam.test");
            self.store.add_profile(user_id);

            self.initiator
                .initiate(user_id)
                .await
                .unwrap()
                .notification
                .await
                .unwrap();

            (user_id, self.sender.last_restoration_token().unwrap())
        }
    }

    #[tokio::test]
    async fn restore_clears_deactivation_and_marks_request() {
        let h = harness();
        let (user_id, token) = h.schedule_deletion().await;
        h.clock.advance(Duration::from_secs(3600));

        let restored = h.handler.restore(&token).await.unwrap();

        assert_eq!(restored.user_id, user_id);
        assert!(h.store.profile_deactivated_at(user_id).await.unwrap().is_none());

        let request = &h.store.requests_for_user(user_id)[0];
        assert!(request.is_restored);
        assert_eq!(request.restored_at, Some(h.clock.now()));
        assert!(h.store.find_open_request_for_user(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_restore_reports_already_restored_and_clears_once() {
        let h = harness();
        let (user_id, token) = h.schedule_deletion().await;

        h.handler.restore(&token).await.unwrap();
        assert!(matches!(
            h.handler.restore(&token).await,
            Err(LifecycleError::AlreadyRestored)
        ));

        assert_eq!(h.store.clear_deactivation_calls(user_id), 1);
    }

    #[tokio::test]
    async fn empty_token_is_rejected_without_store_access() {
        let h = harness();

        assert!(matches!(
            h.handler.restore("").await,
            Err(LifecycleError::MissingToken)
        ));
        assert!(matches!(
            h.handler.restore("   ").await,
            Err(LifecycleError::MissingToken)
        ));
        assert_eq!(h.store.accesses(), 0);
    }

    #[tokio::test]
    async fn oversized_token_is_rejected_without_store_access() {
        let h = harness();
        let token = "a".repeat(MAX_RESTORATION_TOKEN_LENGTH + 1);

        assert!(matches!(
            h.handler.restore(&token).await,
            Err(LifecycleError::InvalidToken)
        ));
        assert_eq!(h.store.accesses(), 0);
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let h = harness();
        h.schedule_deletion().await;

        assert!(matches!(
            h.handler.restore("not-a-real-token").await,
            Err(LifecycleError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn claimed_request_cannot_be_restored() {
        let h = harness();
        let (user_id, token) = h.schedule_deletion().await;
        let request_id = h.store.requests_for_user(user_id)[0].id;

        let now = h.clock.now();
        assert!(h.store.claim(request_id, now, now).await.unwrap());

        assert!(matches!(
            h.handler.restore(&token).await,
            Err(LifecycleError::DeletionInProgress)
        ));
        assert!(!h.store.requests_for_user(user_id)[0].is_restored);
        assert_eq!(h.store.clear_deactivation_calls(user_id), 0);
    }

    #[tokio::test]
    async fn restore_still_works_after_deadline_until_swept() {
        let h = harness();
        let (user_id, token) = h.schedule_deletion().await;
        h.clock.advance(Duration::from_secs(31 * 24 * 60 * 60));

        assert_eq!(h.handler.restore(&token).await.unwrap().user_id, user_id);
        assert!(h.store.find_overdue(h.clock.now(), h.clock.now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_surfaced() {
        let h = harness();
        let (_, token) = h.schedule_deletion().await;
        h.store.fail_reads(true);

        assert!(matches!(
            h.handler.restore(&token).await,
            Err(LifecycleError::StoreFailure(_))
        ));
    }

    /// Lets a sweeper claim the request after the handler has read it but before the
    /// restore is written.
    struct ClaimBeforeRestoreStore {
        inner: Arc<MemoryDeletionStore>,
        clock: Arc<ManualClock>,
    }

    #[async_trait]
    impl DeletionRequestStore for ClaimBeforeRestoreStore {
        async fn create_request(&self, request: &NewDeletionRequest) -> Result<(), DaoError> {
            self.inner.create_request(request).await
        }

        async fn find_by_token_hash(
            &self,
            restoration_token_hash: &[u8],
        ) -> Result<Option<DeletionRequest>, DaoError> {
            self.inner.find_by_token_hash(restoration_token_hash).await
        }

        async fn find_open_request_for_user(
            &self,
            user_id: Uuid,
        ) -> Result<Option<DeletionRequest>, DaoError> {
            self.inner.find_open_request_for_user(user_id).await
        }

        async fn restore_request(
            &self,
            request_id: Uuid,
            user_id: Uuid,
            restored_at: SystemTime,
        ) -> Result<bool, DaoError> {
            let now = self.clock.now();
            assert!(self.inner.claim(request_id, now, now).await?);

            self.inner
                .restore_request(request_id, user_id, restored_at)
                .await
        }

        async fn find_overdue(
            &self,
            now: SystemTime,
            stale_claim_before: SystemTime,
        ) -> Result<Vec<DeletionRequest>, DaoError> {
            self.inner.find_overdue(now, stale_claim_before).await
        }

        async fn claim(
            &self,
            request_id: Uuid,
            claimed_at: SystemTime,
            stale_claim_before: SystemTime,
        ) -> Result<bool, DaoError> {
            self.inner
                .claim(request_id, claimed_at, stale_claim_before)
                .await
        }

        async fn release_claim(&self, request_id: Uuid) -> Result<(), DaoError> {
            self.inner.release_claim(request_id).await
        }

        async fn delete_request(&self, request_id: Uuid) -> Result<(), DaoError> {
            self.inner.delete_request(request_id).await
        }

        async fn delete_restored_before(&self, cutoff: SystemTime) -> Result<usize, DaoError> {
            self.inner.delete_restored_before(cutoff).await
        }

        async fn profile_deactivated_at(
            &self,
            user_id: Uuid,
        ) -> Result<Option<SystemTime>, DaoError> {
            self.inner.profile_deactivated_at(user_id).await
        }
    }

    #[tokio::test]
    async fn losing_race_to_sweeper_keeps_profile_deactivated() {
        let h = harness();
        let (user_id, token) = h.schedule_deletion().await;
        let request_id = h.store.requests_for_user(user_id)[0].id;

        let racing_handler = RestorationHandler::new(
            Arc::new(ClaimBeforeRestoreStore {
                inner: h.store.clone(),
                clock: h.clock.clone(),
            }),
            h.clock.clone(),
        );

        assert!(matches!(
            racing_handler.restore(&token).await,
            Err(LifecycleError::DeletionInProgress)
        ));

        // The sweeper's identity deletion fails and it gives the row back
        h.store.release_claim(request_id).await.unwrap();

        assert!(h.store.profile_deactivated_at(user_id).await.unwrap().is_some());
        assert!(h.store.find_open_request_for_user(user_id).await.unwrap().is_some());
        assert_eq!(h.store.clear_deactivation_calls(user_id), 0);

        // With the claim gone, the same token still restores the account
        h.handler.restore(&token).await.unwrap();
        assert!(h.store.profile_deactivated_at(user_id).await.unwrap().is_none());
    }
}
