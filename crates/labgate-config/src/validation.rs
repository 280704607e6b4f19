//! Configuration validation
//!
//! Validates configuration values and ensures consistency

use labgate_types::is_valid_segment;
use thiserror::Error;

use crate::{CacheConfig, Config, EvaluatorConfig, ObservabilityConfig};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid cache capacity: {0} (must be > 0)")]
    InvalidCacheCapacity(u64),

    #[error("Invalid cache TTL: {0} (must be > 0)")]
    InvalidCacheTTL(u64),

    #[error("Invalid resource kind in owner_fields: '{0}'")]
    InvalidResourceKind(String),

    #[error("Empty owner field for resource kind '{0}'")]
    EmptyOwnerField(String),

    #[error("Invalid log level: {0} (must be one of: trace, debug, info, warn, error)")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0} (must be one of: pretty, compact, json)")]
    InvalidLogFormat(String),

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Validation result type
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate complete configuration, collecting every problem found
pub fn validate(config: &Config) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if let Err(e) = validate_cache(&config.cache) {
        errors.push(e);
    }

    if let Err(e) = validate_evaluator(&config.evaluator) {
        errors.push(e);
    }

    if let Err(e) = validate_observability(&config.observability) {
        errors.push(e);
    }

    match errors.len() {
        0 => Ok(()),
        1 => Err(errors.remove(0)),
        _ => Err(ValidationError::Multiple(errors)),
    }
}

/// Validate cache configuration
pub fn validate_cache(config: &CacheConfig) -> ValidationResult<()> {
    if !config.enabled {
        return Ok(());
    }

    if config.ttl_seconds == 0 {
        return Err(ValidationError::InvalidCacheTTL(config.ttl_seconds));
    }

    if let Some(0) = config.max_capacity {
        return Err(ValidationError::InvalidCacheCapacity(0));
    }

    Ok(())
}

/// Validate evaluator configuration
pub fn validate_evaluator(config: &EvaluatorConfig) -> ValidationResult<()> {
    for (kind, field) in &config.owner_fields {
        if !is_valid_segment(kind) {
            return Err(ValidationError::InvalidResourceKind(kind.clone()));
        }
        if field.trim().is_empty() {
            return Err(ValidationError::EmptyOwnerField(kind.clone()));
        }
    }

    Ok(())
}

/// Validate observability configuration
pub fn validate_observability(config: &ObservabilityConfig) -> ValidationResult<()> {
    match config.log_level.to_lowercase().as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {},
        _ => return Err(ValidationError::InvalidLogLevel(config.log_level.clone())),
    }

    match config.log_format.to_lowercase().as_str() {
        "pretty" | "compact" | "json" => Ok(()),
        _ => Err(ValidationError::InvalidLogFormat(config.log_format.clone())),
    }
}
