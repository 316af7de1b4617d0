mod clear_restored_deletion_requests;
mod sweep_deletion_requests;

pub use clear_restored_deletion_requests::ClearRestoredDeletionRequestsJob;
pub use sweep_deletion_requests::SweepDeletionRequestsJob;

use roam_common::db::DaoError;
use roam_common::lifecycle::LifecycleError;

use async_trait::async_trait;
use std::fmt;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(DaoError),
    LifecycleFailure(LifecycleError),
}

impl std::error::Error for JobError {}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => write!(f, "JobError: {e}"),
            JobError::LifecycleFailure(e) => write!(f, "JobError: {e}"),
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(e)
    }
}

impl From<LifecycleError> for JobError {
    fn from(e: LifecycleError) -> Self {
        JobError::LifecycleFailure(e)
    }
}

#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<(), JobError>;
}

#[cfg(test)]
pub mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::Notify;

    pub struct MockJob {
        pub name: &'static str,
        pub runs: Arc<AtomicUsize>,
        pub ready: bool,
        pub fail: bool,
        // When set, each run waits for a notification before finishing
        pub gate: Option<Arc<Notify>>,
    }

    impl MockJob {
        pub fn new(name: &'static str) -> Self {
            Self {
                name,
                runs: Arc::new(AtomicUsize::new(0)),
                ready: true,
                fail: false,
                gate: None,
            }
        }

        pub fn runs(&self) -> Arc<AtomicUsize> {
            Arc::clone(&self.runs)
        }
    }

    #[async_trait]
    impl Job for MockJob {
        fn name(&self) -> &'static str {
            self.name
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        async fn execute(&mut self) -> Result<(), JobError> {
            self.runs.fetch_add(1, Ordering::SeqCst);

            if let Some(gate) = &self.gate {
                gate.notified().await;
            }

            if self.fail {
                return Err(JobError::LifecycleFailure(LifecycleError::Unauthorized));
            }

            Ok(())
        }
    }

    #[tokio::test]
    async fn test_job_execute() {
        let mut job = MockJob::new("Mock");
        let runs = job.runs();

        job.execute().await.unwrap();
        job.execute().await.unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);

        job.fail = true;
        assert!(matches!(
            job.execute().await.unwrap_err(),
            JobError::LifecycleFailure(LifecycleError::Unauthorized)
        ));
    }
}
