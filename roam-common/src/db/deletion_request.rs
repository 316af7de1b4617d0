use async_trait::async_trait;
use diesel::result::DatabaseErrorKind;
use diesel::{dsl, BoolExpressionMethods, ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbAsyncPool};
use crate::lifecycle::DeletionRequestStore;
use crate::models::deletion_request::{DeletionRequest, NewDeletionRequest};

use crate::schema::deletion_requests as deletion_request_fields;
use crate::schema::deletion_requests::dsl::deletion_requests;
use crate::schema::profiles as profile_fields;
use crate::schema::profiles::dsl::profiles;

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }
}

#[async_trait]
impl DeletionRequestStore for Dao {
    async fn create_request(&self, request: &NewDeletionRequest) -> Result<(), DaoError> {
        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                Box::pin(async move {
                    let affected_row_count = dsl::update(profiles.find(request.user_id))
                        .set(profile_fields::deactivated_at.eq(request.created_at))
                        .execute(conn)
                        .await?;

                    if affected_row_count == 0 {
                        return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
                    }

                    // The partial unique index on open requests rejects a second one per user
                    dsl::insert_into(deletion_requests)
                        .values(request)
                        .execute(conn)
                        .await
                        .map_err(|e| match e {
                            diesel::result::Error::DatabaseError(
                                DatabaseErrorKind::UniqueViolation,
                                _,
                            ) => DaoError::Conflict("User already has an open deletion request"),
                            e => DaoError::QueryFailure(e),
                        })?;

                    Ok(())
                })
            })
            .await
    }

    async fn find_by_token_hash(
        &self,
        restoration_token_hash: &[u8],
    ) -> Result<Option<DeletionRequest>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(deletion_requests
            .filter(deletion_request_fields::restoration_token_hash.eq(restoration_token_hash))
            .first::<DeletionRequest>(&mut conn)
            .await
            .optional()?)
    }

    async fn find_open_request_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Option<DeletionRequest>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(deletion_requests
            .filter(deletion_request_fields::user_id.eq(user_id))
            .filter(deletion_request_fields::is_restored.eq(false))
            .first::<DeletionRequest>(&mut conn)
            .await
            .optional()?)
    }

    async fn restore_request(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        restored_at: SystemTime,
    ) -> Result<bool, DaoError> {
        let mut db_connection = self.db_async_pool.get().await?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                Box::pin(async move {
                    let affected_row_count = dsl::update(
                        deletion_requests
                            .find(request_id)
                            .filter(deletion_request_fields::is_restored.eq(false))
                            .filter(deletion_request_fields::claimed_at.is_null()),
                    )
                    .set((
                        deletion_request_fields::is_restored.eq(true),
                        deletion_request_fields::restored_at.eq(restored_at),
                    ))
                    .execute(conn)
                    .await?;

                    // A claimed or already restored row leaves the profile untouched
                    if affected_row_count == 0 {
                        return Ok(false);
                    }

                    dsl::update(profiles.find(user_id))
                        .set(profile_fields::deactivated_at.eq(None::<SystemTime>))
                        .execute(conn)
                        .await?;

                    Ok(true)
                })
            })
            .await
    }

    async fn find_overdue(
        &self,
        now: SystemTime,
        stale_claim_before: SystemTime,
    ) -> Result<Vec<DeletionRequest>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(deletion_requests
            .filter(deletion_request_fields::is_restored.eq(false))
            .filter(deletion_request_fields::scheduled_for_deletion_at.lt(now))
            .filter(
                deletion_request_fields::claimed_at
                    .is_null()
                    .or(deletion_request_fields::claimed_at.lt(stale_claim_before)),
            )
            .order(deletion_request_fields::scheduled_for_deletion_at.asc())
            .load::<DeletionRequest>(&mut conn)
            .await?)
    }

    async fn claim(
        &self,
        request_id: Uuid,
        claimed_at: SystemTime,
        stale_claim_before: SystemTime,
    ) -> Result<bool, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        let affected_row_count = dsl::update(
            deletion_requests
                .find(request_id)
                .filter(deletion_request_fields::is_restored.eq(false))
                .filter(
                    deletion_request_fields::claimed_at
                        .is_null()
                        .or(deletion_request_fields::claimed_at.lt(stale_claim_before)),
                ),
        )
        .set(deletion_request_fields::claimed_at.eq(claimed_at))
        .execute(&mut conn)
        .await?;

        Ok(affected_row_count == 1)
    }

    async fn release_claim(&self, request_id: Uuid) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        dsl::update(deletion_requests.find(request_id))
            .set(deletion_request_fields::claimed_at.eq(None::<SystemTime>))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn delete_request(&self, request_id: Uuid) -> Result<(), DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        diesel::delete(deletion_requests.find(request_id))
            .execute(&mut conn)
            .await?;

        Ok(())
    }

    async fn delete_restored_before(&self, cutoff: SystemTime) -> Result<usize, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(diesel::delete(
            deletion_requests
                .filter(deletion_request_fields::is_restored.eq(true))
                .filter(deletion_request_fields::restored_at.lt(cutoff)),
        )
        .execute(&mut conn)
        .await?)
    }

    async fn profile_deactivated_at(&self, user_id: Uuid) -> Result<Option<SystemTime>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(profiles
            .select(profile_fields::deactivated_at)
            .find(user_id)
            .first::<Option<SystemTime>>(&mut conn)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use crate::db::test_utils;
    use crate::lifecycle::{hash_restoration_token, RestorationToken};
    use crate::models::profile::ProfileDeactivation;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    async fn dao_with_profile() -> (Dao, Uuid) {
        let pool = test_utils::db_async_pool().await;
        let user_id = Uuid::now_v7();

        let mut conn = pool.get().await.unwrap();
        dsl::insert_into(profiles)
            .values(&ProfileDeactivation {
                user_id,
                deactivated_at: None,
            })
            .execute(&mut conn)
            .await
            .unwrap();
        drop(conn);

        (Dao::new(&pool), user_id)
    }

    fn new_request(user_id: Uuid, created_at: SystemTime) -> (NewDeletionRequest, RestorationToken) {
        let token = RestorationToken::generate();
        let request = NewDeletionRequest {
            id: Uuid::now_v7(),
            user_id,
            scheduled_for_deletion_at: created_at + 30 * DAY,
            restoration_token_hash: token.hash(),
            is_restored: false,
            created_at,
        };

        (request, token)
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn create_request_deactivates_profile_and_rejects_duplicates() {
        let (dao, user_id) = dao_with_profile().await;
        let now = SystemTime::now();
        let (request, token) = new_request(user_id, now);

        dao.create_request(&request).await.unwrap();

        assert!(dao.profile_deactivated_at(user_id).await.unwrap().is_some());

        let found = dao
            .find_by_token_hash(&hash_restoration_token(token.as_str()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, request.id);
        assert!(!found.is_restored);

        let (duplicate, _) = new_request(user_id, now);
        assert!(matches!(
            dao.create_request(&duplicate).await,
            Err(DaoError::Conflict(_))
        ));
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn create_request_without_profile_is_not_found_and_rolls_back() {
        let pool = test_utils::db_async_pool().await;
        let dao = Dao::new(&pool);
        let user_id = Uuid::now_v7();
        let (request, _) = new_request(user_id, SystemTime::now());

        assert!(dao.create_request(&request).await.unwrap_err().is_not_found());
        assert!(dao.find_open_request_for_user(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn restore_is_conditional_on_claim_and_state() {
        let (dao, user_id) = dao_with_profile().await;
        let now = SystemTime::now();
        let (request, _) = new_request(user_id, now);
        dao.create_request(&request).await.unwrap();

        assert!(dao.claim(request.id, now, now - DAY).await.unwrap());
        assert!(!dao.restore_request(request.id, user_id, now).await.unwrap());
        assert!(dao.profile_deactivated_at(user_id).await.unwrap().is_some());

        dao.release_claim(request.id).await.unwrap();
        assert!(dao.restore_request(request.id, user_id, now).await.unwrap());
        assert!(dao.profile_deactivated_at(user_id).await.unwrap().is_none());
        assert!(!dao.restore_request(request.id, user_id, now).await.unwrap());

        assert!(dao.find_open_request_for_user(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn overdue_requests_respect_deadline_and_claims() {
        let (dao, user_id) = dao_with_profile().await;
        let created_at = SystemTime::now() - 31 * DAY;
        let (request, _) = new_request(user_id, created_at);
        dao.create_request(&request).await.unwrap();

        let now = SystemTime::now();
        let stale_claim_before = now - Duration::from_secs(15 * 60);

        let overdue = dao.find_overdue(now, stale_claim_before).await.unwrap();
        assert!(overdue.iter().any(|r| r.id == request.id));

        assert!(dao.claim(request.id, now, stale_claim_before).await.unwrap());
        assert!(!dao.claim(request.id, now, stale_claim_before).await.unwrap());

        let overdue = dao.find_overdue(now, stale_claim_before).await.unwrap();
        assert!(overdue.iter().all(|r| r.id != request.id));

        // Claim has gone stale
        let later = now + Duration::from_secs(20 * 60);
        let later_stale_before = later - Duration::from_secs(15 * 60);
        assert!(dao.claim(request.id, later, later_stale_before).await.unwrap());

        dao.delete_request(request.id).await.unwrap();
        assert!(dao.find_open_request_for_user(user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn restored_requests_are_pruned_after_cutoff() {
        let (dao, user_id) = dao_with_profile().await;
        let long_ago = SystemTime::now() - 120 * DAY;
        let (request, token) = new_request(user_id, long_ago);
        dao.create_request(&request).await.unwrap();
        assert!(dao
            .restore_request(request.id, user_id, long_ago)
            .await
            .unwrap());

        let removed = dao
            .delete_restored_before(SystemTime::now() - 90 * DAY)
            .await
            .unwrap();

        assert!(removed >= 1);
        assert!(dao
            .find_by_token_hash(&token.hash())
            .await
            .unwrap()
            .is_none());
    }
}
