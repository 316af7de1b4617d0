use diesel::{Identifiable, Insertable, Queryable, QueryableByName};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::deletion_requests;

#[derive(
    Clone, Debug, PartialEq, Serialize, Deserialize, Identifiable, Queryable, QueryableByName,
)]
#[diesel(table_name = deletion_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DeletionRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scheduled_for_deletion_at: SystemTime,

    #[serde(skip)]
    pub restoration_token_hash: Vec<u8>,

    pub is_restored: bool,
    pub restored_at: Option<SystemTime>,
    pub claimed_at: Option<SystemTime>,

    pub created_at: SystemTime,
}

impl DeletionRequest {
    /// A request may be hard-deleted iff it was never restored and its deadline has passed.
    pub fn is_overdue(&self, now: SystemTime) -> bool {
        !self.is_restored && self.scheduled_for_deletion_at < now
    }
}

#[derive(Clone, Debug, Insertable)]
#[diesel(table_name = deletion_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewDeletionRequest {
    pub id: Uuid,
    pub user_id: Uuid,
    pub scheduled_for_deletion_at: SystemTime,
    pub restoration_token_hash: Vec<u8>,
    pub is_restored: bool,
    pub created_at: SystemTime,
}

impl From<NewDeletionRequest> for DeletionRequest {
    fn from(new_request: NewDeletionRequest) -> Self {
        Self {
            id: new_request.id,
            user_id: new_request.user_id,
            scheduled_for_deletion_at: new_request.scheduled_for_deletion_at,
            restoration_token_hash: new_request.restoration_token_hash,
            is_restored: new_request.is_restored,
            restored_at: None,
            claimed_at: None,
            created_at: new_request.created_at,
        }
    }
}
