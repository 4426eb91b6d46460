//! Structured logging for Bulwark.
//!
//! This module installs a `tracing-subscriber` registry with either a JSON
//! layer (production) or a human-readable pretty layer (development), both
//! filtered through an [`EnvFilter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bulwark_telemetry::logging::{LogConfig, init_logging};
//!
//! let config = LogConfig::development();
//! init_logging(&config)?;
//!
//! tracing::info!(request_id = %id, "Processing request");
//! ```

use crate::error::TelemetryError;
use crate::TelemetryResult;
use bulwark_config::{BulwarkConfig, LogFormat};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// Whether logging is enabled.
    pub enabled: bool,

    /// Filter directive (e.g., "info", "bulwark_middleware=debug").
    pub level: String,

    /// Whether to output JSON format.
    pub json_format: bool,

    /// Whether to emit ANSI colors.
    pub ansi: bool,

    /// Whether to include file/line info.
    pub file_line_info: bool,

    /// Whether to include target (module path).
    pub include_target: bool,

    /// Service name for log fields.
    pub service_name: String,

    /// Environment mode name for log fields.
    pub environment: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::from(&BulwarkConfig::default())
    }
}

impl LogConfig {
    /// Creates a development configuration with human-readable output.
    #[must_use]
    pub fn development() -> Self {
        Self::from(&BulwarkConfig::development())
    }

    /// Creates a production configuration with JSON output.
    #[must_use]
    pub fn production() -> Self {
        Self::from(&BulwarkConfig::production())
    }
}

impl From<&BulwarkConfig> for LogConfig {
    fn from(config: &BulwarkConfig) -> Self {
        let logging = &config.logging;
        Self {
            enabled: logging.enabled,
            level: logging.level.clone(),
            json_format: logging.format == LogFormat::Json,
            ansi: logging.ansi_enabled,
            file_line_info: logging.include_location,
            include_target: true,
            service_name: config.service_name.clone(),
            environment: config.environment.to_string(),
        }
    }
}

/// Initializes the logging subsystem.
///
/// # Errors
///
/// Returns `TelemetryError::InvalidConfig` for a malformed filter and
/// `TelemetryError::LoggingInit` if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let filter = create_env_filter(&config.level)?;

    if config.json_format {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_ansi(false)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .pretty()
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_target(config.include_target)
            .with_ansi(config.ansi)
            .with_filter(filter);

        tracing_subscriber::registry()
            .with(fmt_layer)
            .try_init()
            .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;
    }

    tracing::info!(
        { fields::SERVICE_NAME } = %config.service_name,
        { fields::ENVIRONMENT } = %config.environment,
        "Logging initialized"
    );

    Ok(())
}

/// Creates an env filter from a string.
///
/// # Errors
///
/// Returns error if the filter string is invalid.
pub fn create_env_filter(filter: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(filter)
        .map_err(|e| TelemetryError::InvalidConfig(format!("Invalid log level: {e}")))
}

/// Standard log fields for Bulwark.
///
/// Use these field names for consistency across logs.
pub mod fields {
    /// Request ID field name.
    pub const REQUEST_ID: &str = "request_id";

    /// HTTP method field name.
    pub const HTTP_METHOD: &str = "http.method";

    /// HTTP path field name.
    pub const HTTP_PATH: &str = "http.path";

    /// HTTP status code field name.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Duration field name (in milliseconds).
    pub const DURATION_MS: &str = "duration_ms";

    /// Error message field name.
    pub const ERROR: &str = "error";

    /// Error stack field name.
    pub const STACK: &str = "stack";

    /// Whether the error was anticipated by the application.
    pub const OPERATIONAL: &str = "operational";

    /// Environment mode field name.
    pub const ENVIRONMENT: &str = "environment";

    /// Service name field name.
    pub const SERVICE_NAME: &str = "service.name";
}

/// Logs a successful request completion.
#[macro_export]
macro_rules! log_request_complete {
    ($request_id:expr, $method:expr, $path:expr, $status:expr, $duration_ms:expr) => {
        $crate::tracing::info!(
            { $crate::logging::fields::REQUEST_ID } = %$request_id,
            { $crate::logging::fields::HTTP_METHOD } = %$method,
            { $crate::logging::fields::HTTP_PATH } = %$path,
            { $crate::logging::fields::HTTP_STATUS } = $status,
            { $crate::logging::fields::DURATION_MS } = $duration_ms,
            "Request completed"
        );
    };
}

/// Logs a request that finished with an error status.
#[macro_export]
macro_rules! log_request_error {
    ($request_id:expr, $method:expr, $path:expr, $status:expr, $duration_ms:expr, $error:expr) => {
        $crate::tracing::error!(
            { $crate::logging::fields::REQUEST_ID } = %$request_id,
            { $crate::logging::fields::HTTP_METHOD } = %$method,
            { $crate::logging::fields::HTTP_PATH } = %$path,
            { $crate::logging::fields::HTTP_STATUS } = $status,
            { $crate::logging::fields::DURATION_MS } = $duration_ms,
            { $crate::logging::fields::ERROR } = %$error,
            "Request failed"
        );
    };
}
