//! # Labgate Observe - Observability Layer
//!
//! Centralized structured logging and metrics for the permission engine.

use anyhow::Result;
use labgate_config::ObservabilityConfig;

pub mod logging;
pub mod metrics;

pub use logging::{LogConfig, LogFormat};

/// Initialize logging with default configuration
pub fn init_tracing() -> Result<()> {
    logging::init_logging(LogConfig::default())
}

/// Initialize logging and register metric descriptions
pub fn init(config: LogConfig, metrics_enabled: bool) -> Result<()> {
    logging::init_logging(config)?;

    if metrics_enabled {
        metrics::init_metrics_descriptions();
        tracing::info!("Metric descriptions registered");
    }

    Ok(())
}

/// Initialize from the `[observability]` section of the configuration
pub fn init_from(config: &ObservabilityConfig) -> Result<()> {
    init(log_config(config)?, config.metrics_enabled)
}

/// Translate the configured level and format into a [`LogConfig`]
pub fn log_config(config: &ObservabilityConfig) -> Result<LogConfig> {
    LogConfig::from_settings(&config.log_level, &config.log_format)
}
