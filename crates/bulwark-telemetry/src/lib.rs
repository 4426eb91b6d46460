//! Structured logging for Bulwark services.
//!
//! This crate turns a [`BulwarkConfig`] into an installed `tracing`
//! subscriber and defines the field names every Bulwark log line uses.
//!
//! - **Production**: JSON lines, one object per event
//! - **Development**: pretty, colored, with source locations
//! - **Test**: warnings only
//!
//! # Example
//!
//! ```rust,ignore
//! use bulwark_config::ConfigLoader;
//! use bulwark_telemetry::init_telemetry;
//!
//! let config = ConfigLoader::new().with_env_prefix("BULWARK").load()?;
//! init_telemetry(&config)?;
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig};

#[doc(hidden)]
pub use tracing;

use bulwark_config::BulwarkConfig;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initializes logging from the service configuration.
///
/// # Errors
///
/// Returns `TelemetryError` if the filter is invalid or a global subscriber
/// has already been installed.
pub fn init_telemetry(config: &BulwarkConfig) -> TelemetryResult<()> {
    init_logging(&LogConfig::from(config))
}
