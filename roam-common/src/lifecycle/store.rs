use async_trait::async_trait;
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::DaoError;
use crate::models::deletion_request::{DeletionRequest, NewDeletionRequest};

/// Durable state for deletion requests and the profile deactivation flag they mirror.
///
/// Every state transition on a request row is conditional, so concurrent callers racing on the
/// same row see at most one winner.
#[async_trait]
pub trait DeletionRequestStore: Send + Sync {
    /// Sets the owner's profile `deactivated_at` to the request's creation time and inserts the
    /// request, atomically. Fails with `DaoError::Conflict` if the user already has an open
    /// request and with a not-found query failure if the user has no profile.
    async fn create_request(&self, request: &NewDeletionRequest) -> Result<(), DaoError>;

    async fn find_by_token_hash(
        &self,
        restoration_token_hash: &[u8],
    ) -> Result<Option<DeletionRequest>, DaoError>;

    async fn find_open_request_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DeletionRequest>, DaoError>;

    /// Marks the request restored and clears the owner's profile `deactivated_at`, atomically.
    /// Does nothing if the request is already restored or claimed by a sweeper. Returns whether
    /// this call performed the transition.
    async fn restore_request(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        restored_at: SystemTime,
    ) -> Result<bool, DaoError>;

    /// Unrestored requests whose deadline is strictly before `now` and that are either unclaimed
    /// or hold a claim older than `stale_claim_before`.
    async fn find_overdue(
        &self,
        now: SystemTime,
        stale_claim_before: SystemTime,
    ) -> Result<Vec<DeletionRequest>, DaoError>;

    /// Returns whether this call won the claim.
    async fn claim(
        &self,
        request_id: Uuid,
        claimed_at: SystemTime,
        stale_claim_before: SystemTime,
    ) -> Result<bool, DaoError>;

    async fn release_claim(&self, request_id: Uuid) -> Result<(), DaoError>;

    async fn delete_request(&self, request_id: Uuid) -> Result<(), DaoError>;

    /// Returns the number of rows removed.
    async fn delete_restored_before(&self, cutoff: SystemTime) -> Result<usize, DaoError>;

    async fn profile_deactivated_at(&self, user_id: Uuid) -> Result<Option<SystemTime>, DaoError>;
}

pub type DeletionStore = Arc<dyn DeletionRequestStore>;
