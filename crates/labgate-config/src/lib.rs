//! # Labgate Config - Configuration Management
//!
//! Handles configuration loading from files and environment variables.
//! Environment variables use the `LABGATE__` prefix with `__` as the section
//! separator, e.g. `LABGATE__CACHE__TTL_SECONDS=60`.

pub mod validation;

use std::{collections::HashMap, path::Path, time::Duration};

use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use labgate_const::{DEFAULT_DECISION_TTL_SECS, RESOURCE_BOOKINGS, RESOURCE_REPORTS};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub evaluator: EvaluatorConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,

    /// Lifetime of a cached decision
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,

    /// Optional entry bound; unbounded when absent
    #[serde(default)]
    pub max_capacity: Option<u64>,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_DECISION_TTL_SECS
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            ttl_seconds: default_cache_ttl_seconds(),
            max_capacity: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    /// Owner field per resource kind for ownership checks
    #[serde(default = "default_owner_fields")]
    pub owner_fields: HashMap<String, String>,

    /// Checks slower than this are logged at warn level
    #[serde(default = "default_slow_check_threshold_ms")]
    pub slow_check_threshold_ms: u64,
}

fn default_owner_fields() -> HashMap<String, String> {
    HashMap::from([
        (RESOURCE_REPORTS.to_string(), "student_id".to_string()),
        (RESOURCE_BOOKINGS.to_string(), "user_id".to_string()),
    ])
}

fn default_slow_check_threshold_ms() -> u64 {
    100
}

impl Default for EvaluatorConfig {
    fn default() -> Self {
        Self {
            owner_fields: default_owner_fields(),
            slow_check_threshold_ms: default_slow_check_threshold_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// One of: pretty, compact, json
    #[serde(default = "default_log_format")]
    pub log_format: String,

    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "compact".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

/// Load configuration from file and environment
pub fn load<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let builder = ConfigBuilder::builder()
        .add_source(File::from(path.as_ref()).required(false))
        .add_source(Environment::with_prefix("LABGATE").separator("__"))
        .build()?;

    builder.try_deserialize()
}

/// Load configuration with defaults
pub fn load_or_default<P: AsRef<Path>>(path: P) -> Config {
    load(path).unwrap_or_default()
}
