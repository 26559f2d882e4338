use crate::domain::Amount;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub database_path: String,
    /// Fixed amount the visible price moves per outbid step.
    pub bid_increment: Amount,
    /// Seconds between background settlement sweeps. Zero disables the
    /// background sweeper; expiry is then caught on the read path and by
    /// explicit sweep requests.
    pub sweep_interval_secs: u64,
    /// Outer deadline for one storage-backed operation.
    pub storage_timeout_ms: u64,
    /// How long a submission waits for another writer on the same listing
    /// before giving up.
    pub lock_wait_ms: u64,
    /// Total time budget for retrying a submission that keeps losing races.
    pub retry_max_elapsed_ms: u64,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnv(String),
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = env_map
            .get("PORT")
            .map(|s| s.as_str())
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| {
                ConfigError::InvalidValue("PORT".to_string(), "must be a valid u16".to_string())
            })?;

        let database_path = env_map
            .get("DATABASE_PATH")
            .cloned()
            .ok_or_else(|| ConfigError::MissingEnv("DATABASE_PATH".to_string()))?;

        let bid_increment = env_map
            .get("BID_INCREMENT")
            .map(|s| s.as_str())
            .unwrap_or("5")
            .parse::<Amount>()
            .map_err(|_| {
                ConfigError::InvalidValue(
                    "BID_INCREMENT".to_string(),
                    "must be a decimal amount".to_string(),
                )
            })?;
        if !bid_increment.is_positive() {
            return Err(ConfigError::InvalidValue(
                "BID_INCREMENT".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        let sweep_interval_secs = parse_u64(&env_map, "SWEEP_INTERVAL_SECS", "60")?;
        let storage_timeout_ms = parse_u64(&env_map, "STORAGE_TIMEOUT_MS", "5000")?;
        let lock_wait_ms = parse_u64(&env_map, "LOCK_WAIT_MS", "2000")?;
        let retry_max_elapsed_ms = parse_u64(&env_map, "RETRY_MAX_ELAPSED_MS", "2000")?;

        Ok(Config {
            port,
            database_path,
            bid_increment,
            sweep_interval_secs,
            storage_timeout_ms,
            lock_wait_ms,
            retry_max_elapsed_ms,
        })
    }
}

fn parse_u64(
    env_map: &HashMap<String, String>,
    key: &str,
    default: &str,
) -> Result<u64, ConfigError> {
    env_map
        .get(key)
        .map(|s| s.as_str())
        .unwrap_or(default)
        .parse::<u64>()
        .map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), "must be a non-negative integer".to_string())
        })
}
