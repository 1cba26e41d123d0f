//! Environment-driven configuration structures shared by all binaries.

use std::env;
use std::time::Duration;

use thiserror::Error;

const DEFAULT_NEXTDNS_API_URL: &str = "https://api.nextdns.io";
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Configuration required by the monitor engine: the durable state store,
/// the accounts file, and the outbound API endpoints/credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorConfig {
    database_url: String,
    accounts_file: String,
    nextdns_api_url: String,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
    poll_interval_secs: u64,
}

impl MonitorConfig {
    /// Loads configuration by hydrating `.env` (if present) and reading the
    /// process variables. Missing or malformed entries surface as
    /// `ConfigError` so binaries can respond gracefully.
    pub fn load_from_env() -> Result<Self, ConfigError> {
        hydrate_env_file()?;

        let poll_interval_secs = match get_optional_var("MONITOR_POLL_INTERVAL_SECS") {
            Some(raw) => raw.parse().map_err(|source| ConfigError::InvalidNumber {
                key: "MONITOR_POLL_INTERVAL_SECS",
                source,
            })?,
            None => DEFAULT_POLL_INTERVAL_SECS,
        };

        Ok(Self {
            database_url: get_required_var("DATABASE_URL")?,
            accounts_file: get_required_var("ACCOUNTS_FILE")?,
            nextdns_api_url: get_optional_var("NEXTDNS_API_URL")
                .unwrap_or_else(|| DEFAULT_NEXTDNS_API_URL.to_string()),
            telegram_bot_token: get_optional_var("TELEGRAM_BOT_TOKEN"),
            telegram_chat_id: get_optional_var("TELEGRAM_CHAT_ID"),
            poll_interval_secs,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database_url
    }

    pub fn accounts_file(&self) -> &str {
        &self.accounts_file
    }

    pub fn nextdns_api_url(&self) -> &str {
        &self.nextdns_api_url
    }

    pub fn telegram_bot_token(&self) -> Option<&str> {
        self.telegram_bot_token.as_deref()
    }

    pub fn telegram_chat_id(&self) -> Option<&str> {
        self.telegram_chat_id.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// API-specific configuration: the HTTP bind address on top of everything the
/// embedded monitor engine needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    api_bind_address: String,
    monitor: MonitorConfig,
}

impl ApiConfig {
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let monitor = MonitorConfig::load_from_env()?;

        Ok(Self {
            api_bind_address: get_required_var("API_BIND_ADDRESS")?,
            monitor,
        })
    }

    pub fn api_bind_address(&self) -> &str {
        &self.api_bind_address
    }

    pub fn monitor(&self) -> &MonitorConfig {
        &self.monitor
    }
}

fn get_required_var(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::MissingVar { key })
            } else {
                Ok(trimmed.to_string())
            }
        }
        Err(_) => Err(ConfigError::MissingVar { key }),
    }
}

fn get_optional_var(key: &'static str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

pub fn hydrate_env_file() -> Result<(), ConfigError> {
    if env::var_os("DENYWATCH_SKIP_DOTENV").is_some() {
        return Ok(());
    }
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(dotenvy::Error::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {}
        Err(err) => return Err(ConfigError::Dotenv { source: err }),
    }

    Ok(())
}

/// Errors emitted when `.env` hydration or environment parsing fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{key}`")]
    MissingVar { key: &'static str },
    #[error("invalid integer in `{key}`: {source}")]
    InvalidNumber {
        key: &'static str,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("failed to load .env file: {source}")]
    Dotenv {
        #[from]
        source: dotenvy::Error,
    },
}
