use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::lifecycle::SECONDS_PER_DAY;

pub fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

pub fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

/// Reads a whole number of days. A count too large to express in seconds is invalid.
pub fn days_var_or(key: &'static str, default_days: u64) -> Result<Duration, ConfigError> {
    env_var_or(key, default_days)
        .checked_mul(SECONDS_PER_DAY)
        .map(Duration::from_secs)
        .ok_or(ConfigError::InvalidVar(key))
}

pub fn postgres_uri(
    username: &str,
    password: &str,
    hostname: &str,
    port: u16,
    db_name: &str,
) -> String {
    format!("postgres://{username}:{password}@{hostname}:{port}/{db_name}")
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    pub fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    pub fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}
