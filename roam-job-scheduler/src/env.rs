use once_cell::sync::Lazy;
use roam_common::conf::{days_var_or, env_var, env_var_or, postgres_uri, ConfigError};
use roam_common::lifecycle::SweepSettings;
use std::cell::UnsafeCell;
use std::ops::Deref;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

const DB_USERNAME_VAR: &str = "ROAM_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "ROAM_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "ROAM_DB_HOSTNAME";
const DB_PORT_VAR: &str = "ROAM_DB_PORT";
const DB_NAME_VAR: &str = "ROAM_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "ROAM_DB_MAX_CONNECTIONS";

const IDENTITY_API_URL_VAR: &str = "ROAM_IDENTITY_API_URL";
const IDENTITY_SERVICE_KEY_VAR: &str = "ROAM_IDENTITY_SERVICE_KEY";
const IDENTITY_TIMEOUT_SECS_VAR: &str = "ROAM_IDENTITY_TIMEOUT_SECS";

const SWEEP_TRIGGER_SECRET_VAR: &str = "ROAM_SWEEP_TRIGGER_SECRET";
const SWEEP_MAX_CONCURRENT_DELETIONS_VAR: &str = "ROAM_SWEEP_MAX_CONCURRENT_DELETIONS";
const SWEEP_CLAIM_TTL_SECS_VAR: &str = "ROAM_SWEEP_CLAIM_TTL_SECS";
const SWEEP_ITEM_TIMEOUT_SECS_VAR: &str = "ROAM_SWEEP_ITEM_TIMEOUT_SECS";

const RUNNER_UPDATE_FREQUENCY_SECS_VAR: &str = "ROAM_RUNNER_UPDATE_FREQUENCY_SECS";
const SWEEP_JOB_FREQUENCY_SECS_VAR: &str = "ROAM_SWEEP_JOB_FREQUENCY_SECS";
const CLEAR_RESTORED_JOB_FREQUENCY_SECS_VAR: &str = "ROAM_CLEAR_RESTORED_JOB_FREQUENCY_SECS";
const RESTORED_REQUEST_RETENTION_DAYS_VAR: &str = "ROAM_RESTORED_REQUEST_RETENTION_DAYS";
const WORKER_THREADS_VAR: &str = "ROAM_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "ROAM_MAX_BLOCKING_THREADS";

const LOG_LEVEL_VAR: &str = "ROAM_LOG_LEVEL";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,

    #[zeroize(skip)]
    pub identity_api_url: String,
    pub identity_service_key: String,
    #[zeroize(skip)]
    pub identity_timeout: Duration,

    pub sweep_trigger_secret: String,
    #[zeroize(skip)]
    pub sweep_max_concurrent_deletions: usize,
    #[zeroize(skip)]
    pub sweep_claim_ttl: Duration,
    #[zeroize(skip)]
    pub sweep_item_timeout: Duration,

    #[zeroize(skip)]
    pub update_frequency: Duration,
    #[zeroize(skip)]
    pub sweep_deletion_requests_job_frequency: Duration,
    #[zeroize(skip)]
    pub clear_restored_deletion_requests_job_frequency: Duration,
    #[zeroize(skip)]
    pub restored_request_retention: Duration,

    #[zeroize(skip)]
    pub worker_threads: usize,
    #[zeroize(skip)]
    pub max_blocking_threads: usize,

    #[zeroize(skip)]
    pub log_level: String,
}

impl ConfigInner {
    pub fn database_uri(&self) -> Zeroizing<String> {
        Zeroizing::new(postgres_uri(
            &self.db_username,
            &self.db_password,
            &self.db_hostname,
            self.db_port,
            &self.db_name,
        ))
    }

    pub fn sweep_settings(&self) -> SweepSettings {
        SweepSettings {
            trigger_secret: Zeroizing::new(self.sweep_trigger_secret.clone()),
            max_concurrent_deletions: self.sweep_max_concurrent_deletions,
            claim_ttl: self.sweep_claim_ttl,
            item_timeout: self.sweep_item_timeout,
        }
    }
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),

            identity_api_url: env_var(IDENTITY_API_URL_VAR)?,
            identity_service_key: env_var(IDENTITY_SERVICE_KEY_VAR)?,
            identity_timeout: Duration::from_secs(env_var_or(IDENTITY_TIMEOUT_SECS_VAR, 15)),

            sweep_trigger_secret: env_var(SWEEP_TRIGGER_SECRET_VAR)?,
            sweep_max_concurrent_deletions: env_var_or(SWEEP_MAX_CONCURRENT_DELETIONS_VAR, 8),
            sweep_claim_ttl: Duration::from_secs(env_var_or(SWEEP_CLAIM_TTL_SECS_VAR, 900)),
            sweep_item_timeout: Duration::from_secs(env_var_or(SWEEP_ITEM_TIMEOUT_SECS_VAR, 60)),

            update_frequency: Duration::from_secs(env_var_or(
                RUNNER_UPDATE_FREQUENCY_SECS_VAR,
                10,
            )),
            sweep_deletion_requests_job_frequency: Duration::from_secs(env_var_or(
                SWEEP_JOB_FREQUENCY_SECS_VAR,
                3600,
            )),
            clear_restored_deletion_requests_job_frequency: Duration::from_secs(env_var_or(
                CLEAR_RESTORED_JOB_FREQUENCY_SECS_VAR,
                86400,
            )),
            restored_request_retention: days_var_or(RESTORED_REQUEST_RETENTION_DAYS_VAR, 90)?,

            worker_threads: env_var_or(WORKER_THREADS_VAR, num_cpus::get()),
            max_blocking_threads: env_var_or(MAX_BLOCKING_THREADS_VAR, 40),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        if inner.sweep_trigger_secret.is_empty() {
            return Err(ConfigError::InvalidVar(SWEEP_TRIGGER_SECRET_VAR));
        }

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}
