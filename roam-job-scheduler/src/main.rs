use roam_common::db::{self, create_db_async_pool};
use roam_common::identity::{HttpIdentityGateway, IdentityProvider};
use roam_common::lifecycle::{DeletionStore, SharedClock, Sweeper, SystemClock};

use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};
use runner::JobRunner;
use std::sync::Arc;

mod env;
mod jobs;
mod runner;

use jobs::{ClearRestoredDeletionRequestsJob, SweepDeletionRequestsJob};

fn main() {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(env::CONF.worker_threads)
        .max_blocking_threads(env::CONF.max_blocking_threads)
        .enable_all()
        .build()
        .expect("Failed to launch asynchronous runtime")
        .block_on(async move {
            let _logger = Logger::with(
                LogSpecification::parse(&env::CONF.log_level)
                    .unwrap_or_else(|_| LogSpecification::info()),
            )
            .log_to_file(FileSpec::default().directory("./logs"))
            .rotate(
                Criterion::Age(Age::Day),
                Naming::Timestamps,
                Cleanup::KeepLogAndCompressedFiles(60, 365),
            )
            .cleanup_in_background_thread(true)
            .duplicate_to_stdout(Duplicate::All)
            .write_mode(WriteMode::BufferAndFlush)
            .format(|writer, now, record| {
                write!(
                    writer,
                    "{:5} | {} | {}:{} | {}",
                    record.level(),
                    now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                    record.module_path().unwrap_or("<unknown>"),
                    record.line().unwrap_or(0),
                    record.args()
                )
            })
            .use_utc()
            .start()
            .expect("Failed to start logger");

            log::info!("Connecting to database...");

            let db_async_pool = match create_db_async_pool(
                &env::CONF.database_uri(),
                env::CONF.db_max_connections,
            )
            .await
            {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("ERROR: Failed to connect to database: {e}");
                    std::process::exit(1);
                }
            };

            log::info!("Successfully connected to database");

            let identity_provider: IdentityProvider = match HttpIdentityGateway::new(
                &env::CONF.identity_api_url,
                &env::CONF.identity_service_key,
                env::CONF.identity_timeout,
            ) {
                Ok(g) => Arc::new(g),
                Err(e) => {
                    eprintln!("ERROR: Failed to create identity provider client: {e}");
                    std::process::exit(1);
                }
            };

            let store: DeletionStore = Arc::new(db::deletion_request::Dao::new(&db_async_pool));
            let clock: SharedClock = Arc::new(SystemClock);

            let sweep_settings = env::CONF.sweep_settings();
            let trigger_secret = sweep_settings.trigger_secret.clone();
            let sweeper = Sweeper::new(
                Arc::clone(&store),
                identity_provider,
                Arc::clone(&clock),
                sweep_settings,
            );

            let mut job_runner = JobRunner::new(
                env::CONF.update_frequency,
                Arc::new(db::job_registry::Dao::new(&db_async_pool)),
                Arc::clone(&clock),
            );

            job_runner
                .register(
                    Box::new(SweepDeletionRequestsJob::new(sweeper, trigger_secret)),
                    env::CONF.sweep_deletion_requests_job_frequency,
                )
                .await;

            job_runner
                .register(
                    Box::new(ClearRestoredDeletionRequestsJob::new(
                        store,
                        clock,
                        env::CONF.restored_request_retention,
                    )),
                    env::CONF.clear_restored_deletion_requests_job_frequency,
                )
                .await;

            job_runner.start().await;
        });

    unsafe {
        env::CONF.zeroize();
    }
}
