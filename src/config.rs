//! Process configuration
//!
//! Everything is read from the environment. Credentials are allowed to be
//! absent at startup: the process still serves, and requests that need them
//! fail with a `ConfigurationError` wrapped in the fetch or write error.

use std::net::SocketAddr;
use thiserror::Error;

pub const API_KEY_VAR: &str = "AIRTABLE_API_KEY";
pub const BASE_ID_VAR: &str = "AIRTABLE_BASE_ID";
pub const API_URL_VAR: &str = "AIRTABLE_API_URL";
pub const BIND_VAR: &str = "DEALFLOW_BIND";

pub const DEFAULT_API_URL: &str = "https://api.airtable.com";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Missing or unusable connection settings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("invalid {var} '{value}': {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Connection settings for the Airtable API.
#[derive(Clone, PartialEq, Eq)]
pub struct AirtableConfig {
    pub api_url: String,
    pub base_id: Option<String>,
    pub api_key: Option<String>,
}

// Hand-written so the key never lands in logs.
impl std::fmt::Debug for AirtableConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AirtableConfig")
            .field("api_url", &self.api_url)
            .field("base_id", &self.base_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl AirtableConfig {
    /// Names of required variables that are unset.
    pub fn missing(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push(API_KEY_VAR);
        }
        if self.base_id.is_none() {
            missing.push(BASE_ID_VAR);
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub airtable: AirtableConfig,
    pub bind: SocketAddr,
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_raw = read(BIND_VAR).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigurationError::Invalid {
                var: BIND_VAR,
                value: bind_raw.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            airtable: AirtableConfig {
                api_url: read(API_URL_VAR).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
                base_id: read(BASE_ID_VAR),
                api_key: read(API_KEY_VAR),
            },
            bind,
        })
    }
}
