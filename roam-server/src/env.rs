use lettre::message::Mailbox;
use once_cell::sync::Lazy;
use roam_common::conf::{days_var_or, env_var, env_var_or, postgres_uri, ConfigError};
use roam_common::lifecycle::{DeletionSettings, SweepSettings};
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

const EMAIL_ENABLED_VAR: &str = "ROAM_EMAIL_ENABLED";
const EMAIL_FROM_ADDR: &str = "ROAM_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR: &str = "ROAM_EMAIL_REPLY_TO_ADDR";
const SMTP_ADDRESS_VAR: &str = "ROAM_SMTP_ADDRESS";
const SMTP_USERNAME_VAR: &str = "ROAM_SMTP_USERNAME";
const SMTP_PASSWORD_VAR: &str = "ROAM_SMTP_PASSWORD";
const MAX_SMTP_CONNECTIONS_VAR: &str = "ROAM_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "ROAM_SMTP_IDLE_TIMEOUT_SECS";

const DELETION_GRACE_PERIOD_DAYS_VAR: &str = "ROAM_DELETION_GRACE_PERIOD_DAYS";
const ACCOUNT_RESTORATION_URL_VAR: &str = "ROAM_ACCOUNT_RESTORATION_URL";
const SWEEP_TRIGGER_SECRET_VAR: &str = "ROAM_SWEEP_TRIGGER_SECRET";
const SWEEP_MAX_CONCURRENT_DELETIONS_VAR: &str = "ROAM_SWEEP_MAX_CONCURRENT_DELETIONS";
const SWEEP_CLAIM_TTL_SECS_VAR: &str = "ROAM_SWEEP_CLAIM_TTL_SECS";
const SWEEP_ITEM_TIMEOUT_SECS_VAR: &str = "ROAM_SWEEP_ITEM_TIMEOUT_SECS";

const ACTIX_WORKER_COUNT_VAR: &str = "ROAM_ACTIX_WORKER_COUNT";
const HEALTH_ENDPOINT_KEY_VAR: &str = "ROAM_HEALTH_ENDPOINT_KEY";

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

    pub email_enabled: bool,
    #[zeroize(skip)]
    pub email_from_address: Mailbox,
    #[zeroize(skip)]
    pub email_reply_to_address: Mailbox,
    pub smtp_address: String,
    pub smtp_username: String,
    pub smtp_password: String,
    #[zeroize(skip)]
    pub max_smtp_connections: u32,
    #[zeroize(skip)]
    pub smtp_idle_timeout: Duration,

    #[zeroize(skip)]
    pub deletion_grace_period: Duration,
    #[zeroize(skip)]
    pub account_restoration_url: String,
    pub sweep_trigger_secret: String,
    #[zeroize(skip)]
    pub sweep_max_concurrent_deletions: usize,
    #[zeroize(skip)]
    pub sweep_claim_ttl: Duration,
    #[zeroize(skip)]
    pub sweep_item_timeout: Duration,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
    pub health_endpoint_key: String,

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

    pub fn deletion_settings(&self) -> DeletionSettings {
        DeletionSettings {
            grace_period: self.deletion_grace_period,
            restoration_url: self.account_restoration_url.clone(),
            email_from_address: self.email_from_address.clone(),
            email_reply_to_address: self.email_reply_to_address.clone(),
        }
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
        let email_from_address: Mailbox = env_var::<String>(EMAIL_FROM_ADDR)?
            .parse()
            .map_err(|_| ConfigError::InvalidVar(EMAIL_FROM_ADDR))?;
        let email_reply_to_address: Mailbox = env_var::<String>(EMAIL_REPLY_TO_ADDR)?
            .parse()
            .map_err(|_| ConfigError::InvalidVar(EMAIL_REPLY_TO_ADDR))?;

        let email_enabled: bool = env_var(EMAIL_ENABLED_VAR)?;

        let (smtp_address, smtp_username, smtp_password) = if email_enabled {
            (
                env_var(SMTP_ADDRESS_VAR)?,
                env_var(SMTP_USERNAME_VAR)?,
                env_var(SMTP_PASSWORD_VAR)?,
            )
        } else {
            (String::new(), String::new(), String::new())
        };

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

            email_enabled,
            email_from_address,
            email_reply_to_address,
            smtp_address,
            smtp_username,
            smtp_password,
            max_smtp_connections: env_var_or(MAX_SMTP_CONNECTIONS_VAR, 24),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            deletion_grace_period: days_var_or(DELETION_GRACE_PERIOD_DAYS_VAR, 30)?,
            account_restoration_url: env_var(ACCOUNT_RESTORATION_URL_VAR)?,
            sweep_trigger_secret: env_var(SWEEP_TRIGGER_SECRET_VAR)?,
            sweep_max_concurrent_deletions: env_var_or(SWEEP_MAX_CONCURRENT_DELETIONS_VAR, 8),
            sweep_claim_ttl: Duration::from_secs(env_var_or(SWEEP_CLAIM_TTL_SECS_VAR, 900)),
            sweep_item_timeout: Duration::from_secs(env_var_or(SWEEP_ITEM_TIMEOUT_SECS_VAR, 60)),

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            health_endpoint_key: env_var(HEALTH_ENDPOINT_KEY_VAR)?,

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
