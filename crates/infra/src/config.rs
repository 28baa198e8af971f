//! Engine configuration, read from `STOCKWISE_*` environment variables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockwise_core::Page;

pub const ENV_LOCK_TIMEOUT_MS: &str = "STOCKWISE_LOCK_TIMEOUT_MS";
pub const ENV_DEFAULT_MIN_STOCK: &str = "STOCKWISE_DEFAULT_MIN_STOCK";
pub const ENV_PAGE_LIMIT: &str = "STOCKWISE_PAGE_LIMIT";
pub const ENV_MAX_PAGE_LIMIT: &str = "STOCKWISE_MAX_PAGE_LIMIT";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key}: cannot parse '{value}' as a non-negative integer")]
    NotANumber { key: &'static str, value: String },

    #[error("{key}: {reason}")]
    OutOfRange { key: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on waiting for per-product stock locks.
    #[serde(with = "millis")]
    pub lock_timeout: Duration,
    /// Threshold given to products created without one.
    pub default_min_stock: u32,
    /// Listing size when the caller gives none.
    pub page_limit: usize,
    /// Hard cap on any listing size.
    pub max_page_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5_000),
            default_min_stock: 10,
            page_limit: 100,
            max_page_limit: 500,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let lock_timeout_ms = parse(&lookup, ENV_LOCK_TIMEOUT_MS)?.unwrap_or(defaults.lock_timeout.as_millis() as u64);
        let default_min_stock = match parse(&lookup, ENV_DEFAULT_MIN_STOCK)? {
            Some(v) => u32::try_from(v).map_err(|_| ConfigError::OutOfRange {
                key: ENV_DEFAULT_MIN_STOCK,
                reason: format!("{v} does not fit in 32 bits"),
            })?,
            None => defaults.default_min_stock,
        };
        let page_limit = parse(&lookup, ENV_PAGE_LIMIT)?.map_or(defaults.page_limit, |v| v as usize);
        let max_page_limit = parse(&lookup, ENV_MAX_PAGE_LIMIT)?.map_or(defaults.max_page_limit, |v| v as usize);

        let config = Self {
            lock_timeout: Duration::from_millis(lock_timeout_ms),
            default_min_stock,
            page_limit,
            max_page_limit,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lock_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                key: ENV_LOCK_TIMEOUT_MS,
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_page_limit == 0 {
            return Err(ConfigError::OutOfRange {
                key: ENV_MAX_PAGE_LIMIT,
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.page_limit == 0 || self.page_limit > self.max_page_limit {
            return Err(ConfigError::OutOfRange {
                key: ENV_PAGE_LIMIT,
                reason: format!("must be between 1 and {}", self.max_page_limit),
            });
        }
        Ok(())
    }

    /// Resolve optional `skip`/`limit` into a capped page.
    pub fn page(&self, skip: Option<usize>, limit: Option<usize>) -> Page {
        Page::new(skip.unwrap_or(0), limit.unwrap_or(self.page_limit)).capped(self.max_page_limit)
    }
}

fn parse(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::NotANumber { key, value: raw }),
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
