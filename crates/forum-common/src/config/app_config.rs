//! Application configuration structs
//!
//! Loads configuration from environment variables (and a `.env` file if present).

use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app: AppSettings,
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Deserialize)]
pub struct AppSettings {
    #[serde(default = "default_app_name")]
    pub name: String,
    #[serde(default = "default_env")]
    pub env: Environment,
}

/// Environment type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    #[must_use]
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }

    #[must_use]
    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "production" => Ok(Self::Production),
            "staging" => Ok(Self::Staging),
            "development" => Ok(Self::Development),
            other => Err(ConfigError::InvalidValue("APP_ENV", other.to_string())),
        }
    }
}

/// Message cache tuning
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Messages per rendered page
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Upper bound accepted from callers
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
    /// Messages requested per history call (platform maximum is 100)
    #[serde(default = "default_history_fetch_limit")]
    pub history_fetch_limit: usize,
    /// Deadline for one member resolution
    #[serde(default = "default_member_timeout_ms")]
    pub member_timeout_ms: u64,
    /// Channels untouched for this long are evicted (0 disables)
    #[serde(default = "default_idle_eviction_secs")]
    pub idle_eviction_secs: u64,
    /// History pages fetched to fully cache an archived thread
    #[serde(default = "default_inactive_backfill_max_pages")]
    pub inactive_backfill_max_pages: usize,
    /// Gateway events buffered per subscriber before it lags
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl CacheConfig {
    #[must_use]
    pub fn member_timeout(&self) -> Duration {
        Duration::from_millis(self.member_timeout_ms)
    }

    /// Idle eviction threshold, `None` when eviction is disabled
    #[must_use]
    pub fn idle_eviction(&self) -> Option<Duration> {
        (self.idle_eviction_secs > 0).then(|| Duration::from_secs(self.idle_eviction_secs))
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            history_fetch_limit: default_history_fetch_limit(),
            member_timeout_ms: default_member_timeout_ms(),
            idle_eviction_secs: default_idle_eviction_secs(),
            inactive_backfill_max_pages: default_inactive_backfill_max_pages(),
            event_buffer: default_event_buffer(),
        }
    }
}

// Default value functions
fn default_app_name() -> String {
    "forum-viewer".to_string()
}

fn default_env() -> Environment {
    Environment::Development
}

fn default_page_size() -> usize {
    25
}

fn default_max_page_size() -> usize {
    100
}

fn default_history_fetch_limit() -> usize {
    100
}

fn default_member_timeout_ms() -> u64 {
    5000 // 5 seconds
}

fn default_idle_eviction_secs() -> u64 {
    3600 // 1 hour
}

fn default_inactive_backfill_max_pages() -> usize {
    50
}

fn default_event_buffer() -> usize {
    1024
}

/// Parse an optional variable, failing loudly on garbage instead of defaulting
fn parse_var<T: FromStr>(name: &'static str, default: fn() -> T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(default()),
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is set but cannot be parsed
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let config = Self {
            app: AppSettings {
                name: env::var("APP_NAME").unwrap_or_else(|_| default_app_name()),
                env: parse_var("APP_ENV", default_env)?,
            },
            cache: CacheConfig {
                page_size: parse_var("CACHE_PAGE_SIZE", default_page_size)?,
                max_page_size: parse_var("CACHE_MAX_PAGE_SIZE", default_max_page_size)?,
                history_fetch_limit: parse_var(
                    "CACHE_HISTORY_FETCH_LIMIT",
                    default_history_fetch_limit,
                )?,
                member_timeout_ms: parse_var("CACHE_MEMBER_TIMEOUT_MS", default_member_timeout_ms)?,
                idle_eviction_secs: parse_var(
                    "CACHE_IDLE_EVICTION_SECS",
                    default_idle_eviction_secs,
                )?,
                inactive_backfill_max_pages: parse_var(
                    "CACHE_INACTIVE_BACKFILL_MAX_PAGES",
                    default_inactive_backfill_max_pages,
                )?,
                event_buffer: parse_var("CACHE_EVENT_BUFFER", default_event_buffer)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    ///
    /// # Errors
    /// Returns the first constraint that does not hold
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cache = &self.cache;
        if cache.page_size == 0 || cache.page_size > cache.max_page_size {
            return Err(ConfigError::InvalidValue(
                "CACHE_PAGE_SIZE",
                format!("{} (must be 1..={})", cache.page_size, cache.max_page_size),
            ));
        }
        if cache.history_fetch_limit == 0 {
            return Err(ConfigError::InvalidValue(
                "CACHE_HISTORY_FETCH_LIMIT",
                "0".to_string(),
            ));
        }
        if cache.event_buffer == 0 {
            return Err(ConfigError::InvalidValue("CACHE_EVENT_BUFFER", "0".to_string()));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
