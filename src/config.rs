//! Configuration management for Job Fetcher
//!
//! Settings are layered: built-in defaults, then a TOML file, then
//! `JOB_FETCHER_*` environment variables, then command-line flags. Each layer
//! only overrides what it sets.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::app::cache::{CacheConfig, CacheStore};
use crate::app::client::ClientConfig;
use crate::app::coordinator::BackgroundCoordinator;
use crate::app::filter::{FilterConfig, MissingWordsPolicy};
use crate::app::pipeline::RefreshPipeline;
use crate::app::providers::ProvidersConfig;
use crate::app::rate_limiter::{RateLimitConfig, RefreshLimiter};
use crate::constants::{config as paths, env, http, limits};
use crate::errors::{ConfigError, ConfigResult, FetchResult};

/// Log levels accepted in `[logging] level`
const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug", "trace"];

/// Unified application configuration for TOML serialization
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Cache location
    pub cache: CacheConfig,
    /// Marker file and refresh window
    pub refresh: RateLimitConfig,
    /// Banned-word filtering
    pub filter: FilterConfig,
    /// HTTP client settings
    pub client: ClientConfigToml,
    /// Provider endpoints and queries
    pub providers: ProvidersConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// TOML-friendly client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfigToml {
    /// TCP nodelay setting
    pub tcp_nodelay: bool,
    /// Connection pool idle timeout in seconds (None = no timeout)
    pub pool_idle_timeout_secs: Option<u64>,
    /// Request timeout in seconds
    pub request_timeout_secs: u64,
    /// Connect timeout in seconds
    pub connect_timeout_secs: u64,
    /// Minimum spacing between requests to one provider, in milliseconds
    pub request_interval_ms: u64,
    /// Retry attempts on 429, 503 and transport errors
    pub max_retries: u32,
    /// Base retry delay in milliseconds
    pub retry_base_delay_ms: u64,
}

impl Default for ClientConfigToml {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            pool_idle_timeout_secs: Some(http::POOL_IDLE_TIMEOUT.as_secs()),
            request_timeout_secs: http::DEFAULT_TIMEOUT.as_secs(),
            connect_timeout_secs: http::CONNECT_TIMEOUT.as_secs(),
            request_interval_ms: http::DEFAULT_REQUEST_INTERVAL.as_millis() as u64,
            max_retries: limits::MAX_RETRIES,
            retry_base_delay_ms: limits::RETRY_BASE_DELAY_MS,
        }
    }
}

impl ClientConfigToml {
    /// Convert to runtime ClientConfig
    pub fn to_runtime_config(&self) -> ClientConfig {
        ClientConfig {
            tcp_nodelay: self.tcp_nodelay,
            pool_idle_timeout: self.pool_idle_timeout_secs.map(Duration::from_secs),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_interval: Duration::from_millis(self.request_interval_ms),
            max_retries: self.max_retries,
            retry_base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Level used when no verbosity flag is given
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub cache_dir: Option<PathBuf>,
    pub window_hours: Option<f64>,
}

impl AppConfig {
    /// Load configuration with multi-source precedence:
    /// 1. Default values
    /// 2. Config file (if exists)
    /// 3. Environment variables
    /// 4. CLI arguments
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an explicit config file is missing, a file
    /// cannot be parsed, or a resulting value is invalid
    pub async fn resolve(
        config_file: Option<&Path>,
        overrides: &ConfigOverrides,
    ) -> ConfigResult<Self> {
        let mut config = Self::load(config_file).await?;
        config.apply_env()?;
        config.apply_overrides(overrides);
        config.validate()?;
        Ok(config)
    }

    /// Defaults merged with the first config file found
    pub async fn load(config_file: Option<&Path>) -> ConfigResult<Self> {
        let path = match config_file {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.to_path_buf(),
                    });
                }
                Some(path.to_path_buf())
            }
            None => Self::find_config_file(),
        };

        match path {
            Some(path) => Self::load_from_file(&path).await,
            None => {
                debug!("No config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply `JOB_FETCHER_*` variables from the process environment
    pub fn apply_env(&mut self) -> ConfigResult<()> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply environment overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        if let Some(dir) = var(env::CACHE_DIR) {
            self.cache.cache_root = PathBuf::from(dir);
        }
        if let Some(marker) = var(env::MARKER_FILE) {
            self.refresh.marker_file = PathBuf::from(marker);
        }
        if let Some(hours) = var(env::WINDOW_HOURS) {
            self.refresh.window_hours =
                hours
                    .trim()
                    .parse::<f64>()
                    .map_err(|e| ConfigError::InvalidValue {
                        field: env::WINDOW_HOURS.to_string(),
                        value: hours.clone(),
                        reason: e.to_string(),
                    })?;
        }
        if let Some(words) = var(env::BANNED_WORDS) {
            self.filter.banned_words_file = PathBuf::from(words);
        }
        if let Some(policy) = var(env::ON_MISSING_BANNED_WORDS) {
            self.filter.on_missing =
                policy
                    .parse::<MissingWordsPolicy>()
                    .map_err(|reason| ConfigError::InvalidValue {
                        field: env::ON_MISSING_BANNED_WORDS.to_string(),
                        value: policy.clone(),
                        reason,
                    })?;
        }
        if let Some(level) = var(env::LOG) {
            self.logging.level = level.trim().to_lowercase();
        }
        Ok(())
    }

    /// Apply command-line overrides
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(dir) = &overrides.cache_dir {
            self.cache.cache_root = dir.clone();
        }
        if let Some(hours) = overrides.window_hours {
            self.refresh.window_hours = hours;
        }
    }

    /// Validate the merged configuration
    pub fn validate(&self) -> ConfigResult<()> {
        self.refresh
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "refresh.window_hours".to_string(),
                value: self.refresh.window_hours.to_string(),
                reason,
            })?;

        let client = self.client.to_runtime_config();
        client
            .validate()
            .map_err(|reason| ConfigError::InvalidValue {
                field: "client".to_string(),
                value: format!(
                    "request_timeout_secs={}, request_interval_ms={}",
                    self.client.request_timeout_secs, self.client.request_interval_ms
                ),
                reason,
            })?;

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "logging.level".to_string(),
                value: self.logging.level.clone(),
                reason: format!("Expected one of {}", LOG_LEVELS.join(", ")),
            });
        }
        Ok(())
    }

    /// Build the background coordinator over the real providers
    ///
    /// # Errors
    ///
    /// Returns `FetchError` if a provider URL is invalid or the HTTP client
    /// cannot be built
    pub fn build_coordinator(&self) -> FetchResult<BackgroundCoordinator> {
        let pipeline = RefreshPipeline::with_http_providers(
            &self.providers,
            &self.client.to_runtime_config(),
            self.filter.clone(),
            Arc::new(self.cache_store()),
            Arc::new(self.limiter()),
        )?;
        Ok(BackgroundCoordinator::new(Arc::new(pipeline)))
    }

    pub fn cache_store(&self) -> CacheStore {
        CacheStore::new(&self.cache)
    }

    pub fn limiter(&self) -> RefreshLimiter {
        RefreshLimiter::new(&self.refresh)
    }

    /// Find configuration file in standard locations
    fn find_config_file() -> Option<PathBuf> {
        let mut search_paths = vec![PathBuf::from(paths::LOCAL_CONFIG_FILE)];
        if let Some(path) = Self::default_config_path() {
            search_paths.push(path);
        }

        search_paths.into_iter().find(|path| {
            let found = path.exists();
            if found {
                debug!("Found config file: {}", path.display());
            }
            found
        })
    }

    /// The per-user config file path, if the platform has a config directory
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(paths::APP_DIR_NAME).join(paths::CONFIG_FILE_NAME))
    }

    /// Load configuration from a TOML file
    async fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;

        let config: AppConfig = toml::from_str(&content)?;
        info!("Loaded configuration from: {}", path.display());
        Ok(config)
    }
}
