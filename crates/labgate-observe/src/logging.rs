//! Structured logging utilities for labgate
//!
//! Provides log initialization with selectable output formats plus span
//! helpers carrying the standard authorization fields.

use std::str::FromStr;

use tracing::Span;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors (for development)
    Pretty,
    /// Compact format without colors
    Compact,
    /// JSON format (for production)
    Json,
}

#[allow(clippy::derivable_impls)]
impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        {
            LogFormat::Pretty
        }
        #[cfg(not(debug_assertions))]
        {
            LogFormat::Json
        }
    }
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(anyhow::anyhow!("Unknown log format: {}", other)),
        }
    }
}

/// Configuration for logging behavior
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Output format
    pub format: LogFormat,
    /// Whether to include file/line numbers
    pub include_location: bool,
    /// Whether to include target module
    pub include_target: bool,
    /// Whether to log span events (enter/exit/close)
    pub log_spans: bool,
    /// Environment filter (e.g., "info,labgate=debug")
    pub filter: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            include_location: cfg!(debug_assertions),
            include_target: true,
            log_spans: false,
            filter: None,
        }
    }
}

impl LogConfig {
    /// Build from the string settings of the configuration file
    ///
    /// `level` becomes the filter directive, e.g. `info` or `warn,labgate=debug`.
    pub fn from_settings(level: &str, format: &str) -> anyhow::Result<Self> {
        Ok(Self { format: format.parse()?, filter: Some(level.to_string()), ..Self::default() })
    }
}

/// Initialize structured logging with configuration
///
/// Fails if a global subscriber is already installed.
pub fn init_logging(config: LogConfig) -> anyhow::Result<()> {
    let env_filter = if let Some(filter) = config.filter {
        EnvFilter::try_new(filter)?
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,labgate=debug"))
    };

    let fmt_span = if config.log_spans { FmtSpan::NEW | FmtSpan::CLOSE } else { FmtSpan::NONE };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_span_events(fmt_span);

    match config.format {
        LogFormat::Pretty => {
            subscriber
                .pretty()
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize pretty logger: {}", e))?;
        },
        LogFormat::Compact => {
            subscriber
                .compact()
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize compact logger: {}", e))?;
        },
        LogFormat::Json => {
            subscriber
                .json()
                .try_init()
                .map_err(|e| anyhow::anyhow!("Failed to initialize JSON logger: {}", e))?;
        },
    }

    tracing::info!(
        format = ?config.format,
        location = config.include_location,
        target = config.include_target,
        "Logging initialized"
    );

    Ok(())
}

/// Helper to create a span with common authorization fields
pub fn auth_span(principal: &str, resource: &str, action: &str) -> Span {
    tracing::info_span!(
        "authorization",
        principal = principal,
        resource = resource,
        action = action,
        decision = tracing::field::Empty,
        duration_ms = tracing::field::Empty,
    )
}

/// Helper to create a span for a context check
pub fn context_span(resource: &str, resource_id: &str) -> Span {
    tracing::debug_span!(
        "context_check",
        resource = resource,
        resource_id = resource_id,
        result = tracing::field::Empty,
    )
}

/// Record decision in authorization span
pub fn record_auth_decision(span: &Span, decision: &str, duration_ms: u128) {
    span.record("decision", decision);
    span.record("duration_ms", duration_ms);
}

/// Record the outcome of a context check
pub fn record_context_result(span: &Span, allowed: bool) {
    span.record("result", allowed);
}

/// Log a slow evaluation warning
pub fn log_slow_check(operation: &str, duration_ms: u128, threshold_ms: u128) {
    if duration_ms > threshold_ms {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            threshold_ms = threshold_ms,
            "Slow permission check detected"
        );
    }
}
