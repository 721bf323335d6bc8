//! Configuration management
//!
//! Configuration is loaded from a YAML file (`config.yml` by default) and
//! can be overridden with `MARKETWIRE_*` environment variables.
//!
//! Missing optional values are filled with defaults.

use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Authentication configuration
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// CORS allowed origin (the storefront URL)
    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
            body_limit: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_cors_origin() -> String {
    "http://localhost:3000".to_string()
}

fn default_body_limit() -> usize {
    10 * 1024 * 1024 // 10MB, images travel inline as data URLs
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database path or URL
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

fn default_database_url() -> String {
    "data/marketwire.db".to_string()
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Cache driver (memory or redis)
    #[serde(default)]
    pub driver: CacheDriver,
    /// Redis connection URL (optional)
    #[serde(default)]
    pub redis_url: Option<String>,
    /// Default cache TTL in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// TTL for cached public GET responses
    #[serde(default = "default_response_ttl")]
    pub response_ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriver::default(),
            redis_url: None,
            ttl_seconds: default_ttl(),
            response_ttl_seconds: default_response_ttl(),
        }
    }
}

fn default_ttl() -> u64 {
    3600
}

fn default_response_ttl() -> u64 {
    120
}

/// Cache driver type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    /// In-memory cache (default)
    #[default]
    Memory,
    /// Redis cache
    Redis,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Session lifetime in days
    #[serde(default = "default_session_days")]
    pub session_days: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_days: default_session_days(),
        }
    }
}

fn default_session_days() -> i64 {
    7
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError { path: String, message: String },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// A missing or empty file yields the default configuration.
    /// Invalid YAML is reported with its line and column.
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: format_yaml_error(&e),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Recognised variables:
    /// - MARKETWIRE_SERVER_HOST
    /// - MARKETWIRE_SERVER_PORT
    /// - MARKETWIRE_SERVER_CORS_ORIGIN (FRONTEND_URL is accepted as a fallback)
    /// - MARKETWIRE_DATABASE_URL
    /// - MARKETWIRE_CACHE_DRIVER
    /// - MARKETWIRE_CACHE_REDIS_URL
    /// - MARKETWIRE_CACHE_TTL_SECONDS
    /// - MARKETWIRE_CACHE_RESPONSE_TTL_SECONDS
    /// - MARKETWIRE_AUTH_SESSION_DAYS
    pub fn load_with_env(path: &std::path::Path) -> anyhow::Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("MARKETWIRE_SERVER_HOST") {
            self.server.host = host;
        }
        if let Ok(port) = std::env::var("MARKETWIRE_SERVER_PORT") {
            if let Ok(port) = port.parse::<u16>() {
                self.server.port = port;
            }
        }
        if let Ok(origin) = std::env::var("MARKETWIRE_SERVER_CORS_ORIGIN")
            .or_else(|_| std::env::var("FRONTEND_URL"))
        {
            self.server.cors_origin = origin;
        }

        if let Ok(url) = std::env::var("MARKETWIRE_DATABASE_URL") {
            self.database.url = url;
        }

        if let Ok(driver) = std::env::var("MARKETWIRE_CACHE_DRIVER") {
            match driver.to_lowercase().as_str() {
                "memory" => self.cache.driver = CacheDriver::Memory,
                "redis" => self.cache.driver = CacheDriver::Redis,
                _ => {} // Ignore invalid values
            }
        }
        if let Ok(redis_url) = std::env::var("MARKETWIRE_CACHE_REDIS_URL") {
            self.cache.redis_url = Some(redis_url);
        }
        if let Ok(ttl) = std::env::var("MARKETWIRE_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }
        if let Ok(ttl) = std::env::var("MARKETWIRE_CACHE_RESPONSE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.response_ttl_seconds = ttl;
            }
        }

        if let Ok(days) = std::env::var("MARKETWIRE_AUTH_SESSION_DAYS") {
            if let Ok(days) = days.parse::<i64>() {
                self.auth.session_days = days;
            }
        }
    }

    /// Reject values that would leave the server unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.session_days <= 0 {
            return Err(ConfigError::ValidationError(
                "auth.session_days must be positive".to_string(),
            ));
        }
        if self.cache.driver == CacheDriver::Redis && self.cache.redis_url.is_none() {
            return Err(ConfigError::ValidationError(
                "cache.redis_url is required when cache.driver is redis".to_string(),
            ));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared by every test that touches process environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const ENV_KEYS: &[&str] = &[
        "MARKETWIRE_SERVER_HOST",
        "MARKETWIRE_SERVER_PORT",
        "MARKETWIRE_SERVER_CORS_ORIGIN",
        "FRONTEND_URL",
        "MARKETWIRE_DATABASE_URL",
        "MARKETWIRE_CACHE_DRIVER",
        "MARKETWIRE_CACHE_REDIS_URL",
        "MARKETWIRE_CACHE_TTL_SECONDS",
        "MARKETWIRE_CACHE_RESPONSE_TTL_SECONDS",
        "MARKETWIRE_AUTH_SESSION_DAYS",
    ];

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        let guard = super::CONFIG_ENV_MUTEX
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
        guard
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let path = std::path::Path::new("nonexistent_marketwire_config.yml");
        let config = Config::load(path).unwrap();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.body_limit, 10 * 1024 * 1024);
        assert_eq!(config.database.url, "data/marketwire.db");
        assert_eq!(config.cache.driver, CacheDriver::Memory);
        assert_eq!(config.cache.ttl_seconds, 3600);
        assert_eq!(config.cache.response_ttl_seconds, 120);
        assert_eq!(config.auth.session_days, 7);
    }

    #[test]
    fn test_load_empty_file_returns_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.cache.response_ttl_seconds, 120);
    }

    #[test]
    fn test_load_partial_config_fills_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: 3001\n").unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.port, 3001);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.database.url, "data/marketwire.db");
    }

    #[test]
    fn test_load_full_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9000
  cors_origin: "https://shop.example.com"
  body_limit: 2048
database:
  url: "sqlite::memory:"
cache:
  driver: redis
  redis_url: "redis://localhost:6379"
  ttl_seconds: 600
  response_ttl_seconds: 30
auth:
  session_days: 14
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.cors_origin, "https://shop.example.com");
        assert_eq!(config.server.body_limit, 2048);
        assert_eq!(config.database.url, "sqlite::memory:");
        assert_eq!(config.cache.driver, CacheDriver::Redis);
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://localhost:6379"));
        assert_eq!(config.cache.ttl_seconds, 600);
        assert_eq!(config.cache.response_ttl_seconds, 30);
        assert_eq!(config.auth.session_days, 14);
    }

    #[test]
    fn test_load_invalid_yaml_returns_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  port: not_a_number\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("parse"));
    }

    #[test]
    fn test_redis_driver_requires_url() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "cache:\n  driver: redis\n").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("redis_url"));
    }

    #[test]
    fn test_env_override_server_config() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "server:\n  host: \"0.0.0.0\"\n  port: 8080\n").unwrap();

        std::env::set_var("MARKETWIRE_SERVER_HOST", "192.168.1.1");
        std::env::set_var("MARKETWIRE_SERVER_PORT", "4000");
        std::env::set_var("FRONTEND_URL", "https://front.example.com");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 4000);
        assert_eq!(config.server.cors_origin, "https://front.example.com");

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_cache_and_auth() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        std::env::set_var("MARKETWIRE_CACHE_DRIVER", "redis");
        std::env::set_var("MARKETWIRE_CACHE_REDIS_URL", "redis://cache:6379");
        std::env::set_var("MARKETWIRE_CACHE_RESPONSE_TTL_SECONDS", "15");
        std::env::set_var("MARKETWIRE_AUTH_SESSION_DAYS", "3");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.cache.driver, CacheDriver::Redis);
        assert_eq!(config.cache.redis_url.as_deref(), Some("redis://cache:6379"));
        assert_eq!(config.cache.response_ttl_seconds, 15);
        assert_eq!(config.auth.session_days, 3);

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }

    #[test]
    fn test_env_override_invalid_values_ignored() {
        let _guard = lock_env();

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "").unwrap();

        std::env::set_var("MARKETWIRE_SERVER_PORT", "not_a_port");
        std::env::set_var("MARKETWIRE_CACHE_DRIVER", "memcached");

        let config = Config::load_with_env(file.path()).unwrap();

        assert_eq!(config.server.port, 5000);
        assert_eq!(config.cache.driver, CacheDriver::Memory);

        for key in ENV_KEYS {
            std::env::remove_var(key);
        }
    }
}
