//! Configuration management for the codenav resolution layer.
//!
//! Configuration is assembled from three sources, later ones winning:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Example
//!
//! ```ignore
//! use codenav_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("codenav.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use std::path::Path;
use std::time::Duration;

use codenav_domain::ResolverConfig;
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::observability::LoggingConfig;

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Resolver settings
    #[serde(default)]
    pub resolver: ResolverSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Settings for request-scoped resolvers.
///
/// Environment variables use the `CODENAV_` prefix and `__` as the nested key
/// separator, e.g. `CODENAV_RESOLVER__BACKEND_TIMEOUT_MS=5000`.
///
/// # Example YAML Configuration
///
/// ```yaml
/// resolver:
///   backend_timeout_ms: 30000
///   default_page_size: 50
///   max_page_size: 1000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ResolverSettings {
    /// Upper bound on any single backing call, in milliseconds
    #[serde(default = "default_backend_timeout_ms")]
    pub backend_timeout_ms: u64,

    /// Page size when a connection does not ask for one
    #[serde(default = "default_page_size")]
    pub default_page_size: usize,

    /// Largest page size a connection may ask for
    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            backend_timeout_ms: default_backend_timeout_ms(),
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_backend_timeout_ms() -> u64 {
    30_000
}

fn default_page_size() -> usize {
    50
}

fn default_max_page_size() -> usize {
    1000
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

const VALID_LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `CODENAV_` and use `__` as separator.
    /// For example:
    /// - `CODENAV_RESOLVER__MAX_PAGE_SIZE=200` overrides `resolver.max_page_size`
    /// - `CODENAV_LOGGING__LEVEL=debug` overrides `logging.level`
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            // CODENAV_RESOLVER__MAX_PAGE_SIZE -> resolver.max_page_size
            .add_source(
                Environment::with_prefix("CODENAV")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(
                Environment::with_prefix("CODENAV")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let resolver = &self.resolver;
        if resolver.backend_timeout_ms == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "resolver.backend_timeout_ms must be greater than 0".to_string(),
            });
        }

        if resolver.default_page_size == 0 || resolver.max_page_size == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "resolver page sizes must be greater than 0".to_string(),
            });
        }

        if resolver.default_page_size > resolver.max_page_size {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "resolver.default_page_size ({}) exceeds resolver.max_page_size ({})",
                    resolver.default_page_size, resolver.max_page_size
                ),
            });
        }

        if !VALID_LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    VALID_LOG_LEVELS, self.logging.level
                ),
            });
        }

        Ok(())
    }

    /// Domain configuration for request scopes.
    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .with_backend_timeout(Duration::from_millis(self.resolver.backend_timeout_ms))
            .with_default_page_size(self.resolver.default_page_size)
            .with_max_page_size(self.resolver.max_page_size)
    }

    /// Logging configuration derived from the `logging` section.
    ///
    /// Call after [`validate`](Self::validate); an unparsable level falls back to INFO.
    pub fn logging_config(&self) -> LoggingConfig {
        let level = self.logging.level.parse().unwrap_or(tracing::Level::INFO);
        let config = if self.logging.json {
            LoggingConfig::json()
        } else {
            LoggingConfig::text()
        };
        config.with_level(level)
    }
}
