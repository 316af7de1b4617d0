use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl};
use diesel_async::RunQueryDsl;
use std::time::SystemTime;

use crate::db::{DaoError, DbAsyncPool};
use crate::models::job_registry_item::NewJobRegistryItem;
use crate::schema::job_registry as job_registry_fields;
use crate::schema::job_registry::dsl::job_registry;

pub struct Dao {
    db_async_pool: DbAsyncPool,
}

impl Dao {
    pub fn new(db_async_pool: &DbAsyncPool) -> Self {
        Self {
            db_async_pool: db_async_pool.clone(),
        }
    }

    pub async fn get_job_last_run_timestamp(
        &self,
        job_name: &str,
    ) -> Result<Option<SystemTime>, DaoError> {
        let mut conn = self.db_async_pool.get().await?;

        Ok(job_registry
            .select(job_registry_fields::last_run_timestamp)
            .find(job_name)
            .first::<SystemTime>(&mut conn)
            .await
            .optional()?)
    }

    pub async fn set_job_last_run_timestamp(
        &self,
        job_name: &str,
        timestamp: SystemTime,
    ) -> Result<(), DaoError> {
        let registry_item = NewJobRegistryItem {
            job_name,
            last_run_timestamp: timestamp,
        };

        let mut conn = self.db_async_pool.get().await?;

        dsl::insert_into(job_registry)
            .values(&registry_item)
            .on_conflict(job_registry_fields::job_name)
            .do_update()
            .set(job_registry_fields::last_run_timestamp.eq(timestamp))
            .execute(&mut conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;
    use uuid::Uuid;

    use crate::db::test_utils;

    #[tokio::test]
    #[ignore = "requires a PostgreSQL database"]
    async fn job_registry_persists_and_updates_timestamps() {
        let dao = Dao::new(&test_utils::db_async_pool().await);
        let job_name = format!("test-job-{}", Uuid::now_v7());

        assert!(dao.get_job_last_run_timestamp(&job_name).await.unwrap().is_none());

        // Postgres timestamps hold microseconds
        let timestamp = SystemTime::UNIX_EPOCH + Duration::from_secs(1_780_000_000);
        dao.set_job_last_run_timestamp(&job_name, timestamp)
            .await
            .unwrap();
        assert_eq!(
            dao.get_job_last_run_timestamp(&job_name).await.unwrap(),
            Some(timestamp)
        );

        let later = timestamp + Duration::from_secs(60);
        dao.set_job_last_run_timestamp(&job_name, later)
            .await
            .unwrap();
        assert_eq!(
            dao.get_job_last_run_timestamp(&job_name).await.unwrap(),
            Some(later)
        );
    }
}
