//! # Service Settings
//!
//! Process-level settings for the engine's HTTP service, loaded from the
//! environment. These are distinct from the engine's root configuration,
//! which is runtime state held in storage.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;
use validator::Validate;

use crate::errors::{Error, Result};
use crate::provider::HttpProviderConfig;
use crate::storage::SqliteStoreConfig;

/// URL selecting the in-memory store
pub const MEMORY_STORAGE_URL: &str = "memory://";

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AppConfig {
    #[validate(nested)]
    pub server: ServerConfig,

    #[validate(nested)]
    pub storage: StorageConfig,

    #[validate(nested)]
    pub hcp: HcpConfig,

    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// Load every section from the environment and validate the result.
    pub fn from_env() -> Result<Self> {
        let config = Self {
            server: ServerConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            hcp: HcpConfig::from_env()?,
            observability: ObservabilityConfig::from_env()?,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        Validate::validate(self).map_err(|e| Error::config(e.to_string()))?;

        if !self.storage.is_memory() && !self.storage.url.starts_with("sqlite:") {
            return Err(Error::config("Storage URL must be 'memory://' or start with 'sqlite:'"));
        }

        for (name, value) in [("API address", &self.hcp.api_address), ("auth URL", &self.hcp.auth_url)] {
            url::Url::parse(value)
                .map_err(|e| Error::config(format!("Invalid HCP {} '{}': {}", name, value, e)))?;
        }

        Ok(())
    }
}

/// Read `name`, falling back to `default` when unset. A set but unparsable
/// value is an error rather than a silent default.
fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::config(format!("Invalid value for {}: '{}' ({})", name, raw, e))),
        Err(_) => Ok(default),
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    std::env::var(name).map(|s| s.eq_ignore_ascii_case("true") || s == "1").unwrap_or(default)
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    #[validate(length(min = 1, message = "Host cannot be empty"))]
    pub host: String,

    #[validate(range(min = 1, max = 65535, message = "Port must be between 1 and 65535"))]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".to_string(), port: 8200 }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            host: std::env::var("HCP_SECRETS_HOST").unwrap_or(defaults.host),
            port: env_or("HCP_SECRETS_PORT", defaults.port)?,
        })
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    /// `memory://` or a `sqlite:` URL
    #[validate(length(min = 1, message = "Storage URL cannot be empty"))]
    pub url: String,

    #[validate(range(min = 1, max = 100, message = "Max connections must be between 1 and 100"))]
    pub max_connections: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { url: "sqlite://./data/hcp-secrets.db".to_string(), max_connections: 5 }
    }
}

impl StorageConfig {
    pub fn is_memory(&self) -> bool {
        self.url == MEMORY_STORAGE_URL
    }

    pub fn sqlite(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            ..Default::default()
        }
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            url: std::env::var("HCP_SECRETS_STORAGE_URL").unwrap_or(defaults.url),
            max_connections: env_or("HCP_SECRETS_STORAGE_MAX_CONNECTIONS", defaults.max_connections)?,
        })
    }
}

/// HashiCorp Cloud Platform endpoints
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct HcpConfig {
    #[validate(length(min = 1, message = "HCP API address cannot be empty"))]
    pub api_address: String,

    #[validate(length(min = 1, message = "HCP auth URL cannot be empty"))]
    pub auth_url: String,

    #[validate(length(min = 1, message = "HCP auth audience cannot be empty"))]
    pub audience: String,

    /// Timeout for each provider call
    #[validate(range(min = 1, max = 300, message = "Timeout must be between 1 and 300 seconds"))]
    pub timeout_seconds: u64,
}

impl Default for HcpConfig {
    fn default() -> Self {
        let provider = HttpProviderConfig::default();
        Self {
            api_address: provider.api_address,
            auth_url: provider.auth_url,
            audience: provider.audience,
            timeout_seconds: provider.timeout.as_secs(),
        }
    }
}

impl HcpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn provider(&self) -> HttpProviderConfig {
        HttpProviderConfig {
            api_address: self.api_address.clone(),
            auth_url: self.auth_url.clone(),
            audience: self.audience.clone(),
            timeout: self.timeout(),
        }
    }

    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            api_address: std::env::var("HCP_API_ADDRESS").unwrap_or(defaults.api_address),
            auth_url: std::env::var("HCP_AUTH_URL").unwrap_or(defaults.auth_url),
            audience: std::env::var("HCP_AUTH_AUDIENCE").unwrap_or(defaults.audience),
            timeout_seconds: env_or("HCP_API_TIMEOUT_SECONDS", defaults.timeout_seconds)?,
        })
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` takes precedence
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false }
    }
}

impl ObservabilityConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            log_level: std::env::var("HCP_SECRETS_LOG_LEVEL").unwrap_or(defaults.log_level),
            json_logging: env_bool("HCP_SECRETS_LOG_JSON", defaults.json_logging),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // env vars are process-global; serialize the tests touching them
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_address(), "127.0.0.1:8200");
        assert!(!config.storage.is_memory());
        assert_eq!(config.hcp.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.hcp.timeout_seconds = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.storage.url = "postgresql://db".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.hcp.api_address = "api.cloud.hashicorp.com".into();
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.server.host = String::new();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_from_env_reads_overrides() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("HCP_SECRETS_PORT", "9200");
        std::env::set_var("HCP_SECRETS_STORAGE_URL", "memory://");
        std::env::set_var("HCP_SECRETS_LOG_JSON", "true");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.server.port, 9200);
        assert!(config.storage.is_memory());
        assert!(config.observability.json_logging);

        std::env::remove_var("HCP_SECRETS_PORT");
        std::env::remove_var("HCP_SECRETS_STORAGE_URL");
        std::env::remove_var("HCP_SECRETS_LOG_JSON");
    }

    #[test]
    fn test_from_env_rejects_unparsable_numbers() {
        let _guard = ENV_LOCK.lock().unwrap();
        std::env::set_var("HCP_API_TIMEOUT_SECONDS", "soon");

        let err = AppConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("HCP_API_TIMEOUT_SECONDS"));

        std::env::remove_var("HCP_API_TIMEOUT_SECONDS");
    }
}
