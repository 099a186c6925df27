//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::fmt::Display;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use reqwest::Url;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Where and how often to pull the remote household view.
#[derive(Clone, Debug)]
pub struct RemoteConfig {
    pub houses_url: Url,
    pub room_key: String,
    pub refresh_every: Duration,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub snapshot_path: PathBuf,
    pub persist_debounce: Duration,
    pub dnd_sweep_every: Duration,
    /// `None` disables the remote refresh task.
    pub remote: Option<RemoteConfig>,
    pub seed_demo: bool,
    pub cors_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server Settings ---
        let bind_address: SocketAddr = parsed("BIND_ADDRESS", "0.0.0.0:3000")?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let cors_origin = std::env::var("CORS_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:5173".to_string());

        // --- Load Store Settings ---
        let snapshot_path = std::env::var("SNAPSHOT_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/store.json"));
        let persist_debounce = Duration::from_millis(parsed("PERSIST_DEBOUNCE_MS", "500")?);
        let dnd_sweep_every = Duration::from_secs(positive("DND_SWEEP_SECS", "60")?);
        let seed_demo: bool = parsed("SEED_DEMO", "false")?;

        // --- Load Remote Household Settings (optional) ---
        let remote = match std::env::var("REMOTE_HOUSES_URL").ok() {
            Some(raw) => {
                let houses_url = Url::parse(&raw).map_err(|e| {
                    ConfigError::InvalidValue("REMOTE_HOUSES_URL".to_string(), e.to_string())
                })?;
                let room_key = std::env::var("REMOTE_ROOM_KEY")
                    .map_err(|_| ConfigError::MissingVar("REMOTE_ROOM_KEY".to_string()))?;
                let refresh_every = Duration::from_secs(positive("REMOTE_REFRESH_SECS", "300")?);
                Some(RemoteConfig {
                    houses_url,
                    room_key,
                    refresh_every,
                })
            }
            None => None,
        };

        Ok(Self {
            bind_address,
            log_level,
            snapshot_path,
            persist_debounce,
            dnd_sweep_every,
            remote,
            seed_demo,
            cors_origin,
        })
    }
}

fn parsed<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string()))
}

/// Interval settings; zero would spin a timer.
fn positive(name: &str, default: &str) -> Result<u64, ConfigError> {
    match parsed::<u64>(name, default)? {
        0 => Err(ConfigError::InvalidValue(
            name.to_string(),
            "must be greater than zero".to_string(),
        )),
        value => Ok(value),
    }
}
