//! Typed configuration for Bulwark.
//!
//! This crate provides the [`Environment`] mode that drives error disclosure
//! and logging, plus a strongly-typed [`BulwarkConfig`] with support for:
//! - TOML and JSON configuration files
//! - Environment variable overrides
//! - Strict validation (fails on unknown fields)
//! - Layered configuration (defaults → file → env)
//!
//! The configuration is read once at startup and then passed by value into
//! the components that need it; nothing in Bulwark reads process state
//! while handling a request.
//!
//! # Example
//!
//! ```no_run
//! use bulwark_config::ConfigLoader;
//!
//! # fn main() -> Result<(), bulwark_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_optional_file("bulwark.toml")?
//!     .with_env_prefix("BULWARK")
//!     .load()?;
//!
//! println!("environment: {}", config.environment);
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! environment = "production"
//! service_name = "orders"
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//! ```
//!
//! # Environment Variable Overrides
//!
//! - `BULWARK__ENVIRONMENT=production`
//! - `BULWARK__SERVICE_NAME=orders`
//! - `BULWARK__LOGGING__LEVEL=debug`

#![warn(missing_docs)]

mod config;
mod environment;
mod error;
mod loader;
mod schema;

pub use config::{BulwarkConfig, BulwarkConfigBuilder};
pub use environment::Environment;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingConfig};
