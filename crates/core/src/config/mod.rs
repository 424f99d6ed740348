//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SWCACHE_*)
//! 2. TOML config file (if SWCACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// How the precache loader reacts to a resource that cannot be fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrecachePolicy {
    /// Any failure aborts population and nothing is stored.
    #[default]
    AllOrNothing,
    /// Store whatever succeeded and report the failures.
    BestEffort,
}

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SWCACHE_*)
/// 2. TOML config file (if SWCACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Generation tag installed by default.
    ///
    /// Set via SWCACHE_CACHE_NAME environment variable.
    #[serde(default = "default_cache_name")]
    pub cache_name: String,

    /// Origin that relative precache paths and request paths resolve against.
    ///
    /// Set via SWCACHE_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Ordered precache manifest (paths or absolute URLs).
    ///
    /// Set via SWCACHE_PRECACHE environment variable (e.g. `["/", "/app.js"]`).
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Behaviour when a precache resource fails.
    #[serde(default)]
    pub precache_policy: PrecachePolicy,

    /// Maximum number of precache fetches in flight.
    #[serde(default = "default_precache_concurrency")]
    pub precache_concurrency: usize,

    /// Activate immediately after a successful install.
    #[serde(default = "default_true")]
    pub skip_waiting: bool,

    /// Path to SQLite cache database.
    ///
    /// Set via SWCACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Optional per-generation entry quota.
    #[serde(default)]
    pub max_entries_per_generation: Option<usize>,

    /// User-Agent string for HTTP requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_cache_name() -> String {
    "app-cache-v1".into()
}

fn default_origin() -> String {
    "http://localhost:8501".into()
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/icons/icon-192.png".into(), "/icons/icon-512.png".into()]
}

fn default_precache_concurrency() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./swcache.sqlite")
}

fn default_user_agent() -> String {
    "swcache/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_name: default_cache_name(),
            origin: default_origin(),
            precache: default_precache(),
            precache_policy: PrecachePolicy::default(),
            precache_concurrency: default_precache_concurrency(),
            skip_waiting: true,
            db_path: default_db_path(),
            max_entries_per_generation: None,
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration file cannot be read,
    /// environment variables cannot be parsed, or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SWCACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SWCACHE_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}
