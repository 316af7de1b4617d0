use roam_common::db::job_registry::Dao as JobRegistryDao;
use roam_common::db::DaoError;
use roam_common::lifecycle::SharedClock;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time;

use crate::jobs::Job;

/// Where each job's last run time is kept so a restart doesn't reset the schedule.
#[async_trait]
pub trait JobRegistry: Send + Sync {
    async fn last_run_time(&self, job_name: &str) -> Result<Option<SystemTime>, DaoError>;
    async fn record_run(&self, job_name: &str, run_time: SystemTime) -> Result<(), DaoError>;
}

#[async_trait]
impl JobRegistry for JobRegistryDao {
    async fn last_run_time(&self, job_name: &str) -> Result<Option<SystemTime>, DaoError> {
        self.get_job_last_run_timestamp(job_name).await
    }

    async fn record_run(&self, job_name: &str, run_time: SystemTime) -> Result<(), DaoError> {
        self.set_job_last_run_timestamp(job_name, run_time).await
    }
}

struct JobContainer {
    name: &'static str,
    job: Arc<Mutex<Box<dyn Job>>>,
    run_frequency: Duration,
    last_run_time: SystemTime,
}

pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    registry: Arc<dyn JobRegistry>,
    clock: SharedClock,
}

impl JobRunner {
    pub fn new(
        update_frequency: Duration,
        registry: Arc<dyn JobRegistry>,
        clock: SharedClock,
    ) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            registry,
            clock,
        }
    }

    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let name = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            name,
            run_frequency.as_secs()
        );

        let last_run_time = self
            .registry
            .last_run_time(name)
            .await
            .unwrap_or_else(|e| {
                log::error!("Failed to get last run timestamp for job '{}': {}", name, e);
                None
            });

        self.jobs.push(JobContainer {
            name,
            job: Arc::new(Mutex::new(job)),
            run_frequency,
            last_run_time: last_run_time.unwrap_or_else(|| self.clock.now()),
        });
    }

    /// Starts every job that is due and not already running. Each job runs on its own task so a
    /// slow job never delays the others.
    pub fn run_due_jobs(&mut self) -> Vec<JoinHandle<()>> {
        let now = self.clock.now();
        let mut handles = Vec::new();

        for container in &mut self.jobs {
            let elapsed = now
                .duration_since(container.last_run_time)
                .unwrap_or(Duration::ZERO);

            if elapsed < container.run_frequency {
                continue;
            }

            let Ok(mut job) = Arc::clone(&container.job).try_lock_owned() else {
                log::info!(
                    "Job \"{}\" is still running; skipping this run",
                    container.name
                );
                continue;
            };

            if !job.is_ready() {
                continue;
            }

            container.last_run_time = now;

            let name = container.name;
            let registry = Arc::clone(&self.registry);

            handles.push(tokio::spawn(async move {
                if let Err(e) = registry.record_run(name, now).await {
                    log::error!("Error recording run of job \"{}\": {}", name, e);
                }

                log::info!("Executing job \"{}\"", name);

                match job.execute().await {
                    Ok(()) => log::info!("Job \"{}\" finished successfully", name),
                    Err(e) => log::error!("Job \"{}\" failed: {}", name, e),
                }
            }));
        }

        handles
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();

            self.run_due_jobs();

            let delta = before.elapsed();
            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use roam_common::lifecycle::Clock;
    use roam_common::testing::ManualClock;
    use std::collections::HashMap;
    use std::sync::atomic::Ordering;
    use tokio::sync::Notify;

    use crate::jobs::tests::MockJob;

    #[derive(Default)]
    struct MemoryJobRegistry {
        runs: std::sync::Mutex<HashMap<String, SystemTime>>,
    }

    impl MemoryJobRegistry {
        fn with_run(job_name: &str, run_time: SystemTime) -> Self {
            let registry = Self::default();
            registry
                .runs
                .lock()
                .unwrap()
                .insert(String::from(job_name), run_time);
            registry
        }

        fn run_of(&self, job_name: &str) -> Option<SystemTime> {
            self.runs.lock().unwrap().get(job_name).copied()
        }
    }

    #[async_trait]
    impl JobRegistry for MemoryJobRegistry {
        async fn last_run_time(&self, job_name: &str) -> Result<Option<SystemTime>, DaoError> {
            Ok(self.run_of(job_name))
        }

        async fn record_run(&self, job_name: &str, run_time: SystemTime) -> Result<(), DaoError> {
            self.runs
                .lock()
                .unwrap()
                .insert(String::from(job_name), run_time);
            Ok(())
        }
    }

    const HOUR: Duration = Duration::from_secs(3600);

    async fn run_all(handles: Vec<JoinHandle<()>>) -> usize {
        let count = handles.len();
        for handle in handles {
            handle.await.unwrap();
        }
        count
    }

    #[tokio::test]
    async fn test_register() {
        let clock = Arc::new(ManualClock::new());
        let mut job_runner = JobRunner::new(
            Duration::from_micros(200),
            Arc::new(MemoryJobRegistry::default()),
            clock,
        );
        assert_eq!(job_runner.update_frequency, Duration::from_micros(200));
        assert!(job_runner.jobs.is_empty());

        job_runner.register(Box::new(MockJob::new("One")), HOUR).await;
        assert_eq!(job_runner.jobs.len(), 1);

        job_runner.register(Box::new(MockJob::new("Two")), HOUR).await;
        assert_eq!(job_runner.jobs.len(), 2);
    }

    #[tokio::test]
    async fn jobs_run_on_their_own_frequency() {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(MemoryJobRegistry::default());
        let mut job_runner = JobRunner::new(Duration::from_secs(1), registry.clone(), clock.clone());

        let hourly = MockJob::new("Hourly");
        let daily = MockJob::new("Daily");
        let hourly_runs = hourly.runs();
        let daily_runs = daily.runs();

        job_runner.register(Box::new(hourly), HOUR).await;
        job_runner.register(Box::new(daily), 24 * HOUR).await;

        assert_eq!(run_all(job_runner.run_due_jobs()).await, 0);

        clock.advance(HOUR);
        assert_eq!(run_all(job_runner.run_due_jobs()).await, 1);
        assert_eq!(hourly_runs.load(Ordering::SeqCst), 1);
        assert_eq!(daily_runs.load(Ordering::SeqCst), 0);
        assert_eq!(registry.run_of("Hourly"), Some(clock.now()));

        clock.advance(23 * HOUR);
        assert_eq!(run_all(job_runner.run_due_jobs()).await, 2);
        assert_eq!(hourly_runs.load(Ordering::SeqCst), 2);
        assert_eq!(daily_runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn persisted_last_run_survives_restart() {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(MemoryJobRegistry::with_run("Sweep", clock.now() - 2 * HOUR));
        let mut job_runner = JobRunner::new(Duration::from_secs(1), registry, clock);

        let job = MockJob::new("Sweep");
        let runs = job.runs();
        job_runner.register(Box::new(job), HOUR).await;

        assert_eq!(run_all(job_runner.run_due_jobs()).await, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn running_job_is_never_started_twice() {
        let clock = Arc::new(ManualClock::new());
        let mut job_runner = JobRunner::new(
            Duration::from_secs(1),
            Arc::new(MemoryJobRegistry::default()),
            clock.clone(),
        );

        let gate = Arc::new(Notify::new());
        let mut job = MockJob::new("Slow");
        job.gate = Some(Arc::clone(&gate));
        let runs = job.runs();
        job_runner.register(Box::new(job), HOUR).await;

        clock.advance(HOUR);
        let first = job_runner.run_due_jobs();
        assert_eq!(first.len(), 1);

        clock.advance(HOUR);
        assert!(job_runner.run_due_jobs().is_empty());

        gate.notify_one();
        run_all(first).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        gate.notify_one();
        assert_eq!(run_all(job_runner.run_due_jobs()).await, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failing_or_unready_jobs_do_not_affect_others() {
        let clock = Arc::new(ManualClock::new());
        let mut job_runner = JobRunner::new(
            Duration::from_secs(1),
            Arc::new(MemoryJobRegistry::default()),
            clock.clone(),
        );

        let mut failing = MockJob::new("Failing");
        failing.fail = true;
        let mut unready = MockJob::new("Unready");
        unready.ready = false;
        let healthy = MockJob::new("Healthy");

        let failing_runs = failing.runs();
        let unready_runs = unready.runs();
        let healthy_runs = healthy.runs();

        job_runner.register(Box::new(failing), HOUR).await;
        job_runner.register(Box::new(unready), HOUR).await;
        job_runner.register(Box::new(healthy), HOUR).await;

        clock.advance(HOUR);
        assert_eq!(run_all(job_runner.run_due_jobs()).await, 2);

        assert_eq!(failing_runs.load(Ordering::SeqCst), 1);
        assert_eq!(unready_runs.load(Ordering::SeqCst), 0);
        assert_eq!(healthy_runs.load(Ordering::SeqCst), 1);
    }
}
