//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `cache_name` or `user_agent` is empty
    /// - `origin` is not an absolute http(s) URL
    /// - `precache_concurrency` is outside 1..=16
    /// - `max_entries_per_generation` is 0 or smaller than the manifest
    /// - `max_bytes` is 0 or exceeds 50MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_name.trim().is_empty() {
            return Err(ConfigError::Invalid { field: "cache_name".into(), reason: "must not be empty".into() });
        }

        match url::Url::parse(&self.origin) {
            Ok(origin) if matches!(origin.scheme(), "http" | "https") => {}
            Ok(origin) => {
                return Err(ConfigError::Invalid {
                    field: "origin".into(),
                    reason: format!("unsupported scheme: {}", origin.scheme()),
                });
            }
            Err(e) => return Err(ConfigError::Invalid { field: "origin".into(), reason: e.to_string() }),
        }

        if self.precache_concurrency == 0 || self.precache_concurrency > 16 {
            return Err(ConfigError::Invalid {
                field: "precache_concurrency".into(),
                reason: "must be between 1 and 16".into(),
            });
        }

        if let Some(limit) = self.max_entries_per_generation {
            if limit == 0 {
                return Err(ConfigError::Invalid {
                    field: "max_entries_per_generation".into(),
                    reason: "must be greater than 0".into(),
                });
            }
            if limit < self.precache.len() {
                tracing::warn!(
                    limit,
                    precache = self.precache.len(),
                    "max_entries_per_generation is smaller than the precache manifest; installs will fail"
                );
            }
        }

        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 50 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 50MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_default_config() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_blank_cache_name() {
        let config = AppConfig { cache_name: "  ".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "cache_name"));
    }

    #[test]
    fn test_validate_origin_scheme() {
        let config = AppConfig { origin: "file:///srv/app".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "origin"));

        let config = AppConfig { origin: "not a url".into(), ..Default::default() };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_precache_concurrency() {
        let config = AppConfig { precache_concurrency: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { precache_concurrency: 17, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { precache_concurrency: 16, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_quota() {
        let config = AppConfig { max_entries_per_generation: Some(0), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "max_entries_per_generation"));
    }

    #[test]
    fn test_validate_max_bytes_bounds() {
        let config = AppConfig { max_bytes: 0, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { max_bytes: 51 * 1024 * 1024, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { max_bytes: 50 * 1024 * 1024, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_timeout_bounds() {
        let config = AppConfig { timeout_ms: 50, ..Default::default() };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid { field, .. }) if field == "timeout_ms"));

        let config = AppConfig { timeout_ms: 301_000, ..Default::default() };
        assert!(config.validate().is_err());

        let config = AppConfig { timeout_ms: 100, ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_user_agent() {
        let config = AppConfig { user_agent: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "user_agent"));
    }
}
