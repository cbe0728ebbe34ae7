//! Client configuration
//!
//! Loaded from TOML:
//!
//! ```toml
//! addr = "mongodb://localhost:27017"
//! db_name = "shop"
//! context_timeout_secs = 5
//! max_pool_size = 50
//! ```

use mongokit_common::{MongoKitError, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CONTEXT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_POOL_SIZE: u32 = 100;

fn default_context_timeout_secs() -> u64 {
    DEFAULT_CONTEXT_TIMEOUT_SECS
}

fn default_max_pool_size() -> Option<u32> {
    Some(DEFAULT_MAX_POOL_SIZE)
}

/// Connection settings for [`crate::Client`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientConfig {
    /// MongoDB connection URI
    pub addr: String,
    /// Database every helper operates on
    pub db_name: String,
    /// Deadline applied to each helper call, in seconds
    #[serde(default = "default_context_timeout_secs")]
    pub context_timeout_secs: u64,
    /// Maximum connections in the driver pool
    #[serde(default = "default_max_pool_size")]
    pub max_pool_size: Option<u32>,
    /// Application name reported in server logs
    #[serde(default)]
    pub app_name: Option<String>,
}

impl ClientConfig {
    /// Create a config with default timeout and pool size
    pub fn new(addr: impl Into<String>, db_name: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            db_name: db_name.into(),
            context_timeout_secs: DEFAULT_CONTEXT_TIMEOUT_SECS,
            max_pool_size: default_max_pool_size(),
            app_name: None,
        }
    }

    /// Set the per-call deadline
    pub fn with_context_timeout(mut self, timeout: Duration) -> Self {
        self.context_timeout_secs = timeout.as_secs();
        self
    }

    /// Per-call deadline as a `Duration`
    pub fn context_timeout(&self) -> Duration {
        Duration::from_secs(self.context_timeout_secs)
    }

    /// Parse a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            MongoKitError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.addr.is_empty() {
            return Err(MongoKitError::Config("addr cannot be empty".to_string()));
        }
        if self.db_name.is_empty() {
            return Err(MongoKitError::Config("db_name cannot be empty".to_string()));
        }
        if self.context_timeout_secs == 0 {
            return Err(MongoKitError::Config(
                "context_timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_defaults() {
        let config = ClientConfig::new("mongodb://localhost:27017", "shop");
        assert_eq!(config.context_timeout(), Duration::from_secs(10));
        assert_eq!(config.max_pool_size, Some(100));
        assert!(config.app_name.is_none());
    }

    #[test]
    fn test_from_toml_full() {
        let config = ClientConfig::from_toml_str(
            r#"
            addr = "mongodb://db:27017"
            db_name = "orders"
            context_timeout_secs = 3
            max_pool_size = 20
            app_name = "billing"
            "#,
        )
        .unwrap();

        assert_eq!(config.addr, "mongodb://db:27017");
        assert_eq!(config.db_name, "orders");
        assert_eq!(config.context_timeout(), Duration::from_secs(3));
        assert_eq!(config.max_pool_size, Some(20));
        assert_eq!(config.app_name.as_deref(), Some("billing"));
    }

    #[test]
    fn test_from_toml_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            addr = "mongodb://db:27017"
            db_name = "orders"
            "#,
        )
        .unwrap();

        assert_eq!(config, ClientConfig::new("mongodb://db:27017", "orders"));
    }

    #[test]
    fn test_from_toml_missing_field() {
        let err = ClientConfig::from_toml_str(r#"addr = "mongodb://db:27017""#).unwrap_err();
        assert!(matches!(err, MongoKitError::Config(_)));
    }

    #[test]
    fn test_from_toml_zero_timeout() {
        let err = ClientConfig::from_toml_str(
            r#"
            addr = "mongodb://db:27017"
            db_name = "orders"
            context_timeout_secs = 0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, MongoKitError::Config(_)));
    }

    #[test]
    fn test_from_missing_file() {
        let err = ClientConfig::from_file("/nonexistent/mongokit.toml").unwrap_err();
        assert!(matches!(err, MongoKitError::Config(_)));
    }

    #[test]
    fn test_with_context_timeout() {
        let config = ClientConfig::new("mongodb://localhost", "db")
            .with_context_timeout(Duration::from_secs(30));
        assert_eq!(config.context_timeout_secs, 30);
    }
}
