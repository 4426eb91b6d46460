//! Main configuration types.
//!
//! This module provides the top-level [`BulwarkConfig`] struct and its builder.

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Environment, LogFormat, LoggingConfig};

/// Complete Bulwark configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load configuration from files
/// and environment variables.
///
/// # Example
///
/// ```
/// use bulwark_config::{BulwarkConfig, Environment};
///
/// let config = BulwarkConfig::default();
/// assert_eq!(config.environment, Environment::Development);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct BulwarkConfig {
    /// Environment mode (development, production, test).
    #[serde(default)]
    pub environment: Environment,

    /// Service name, attached to log output.
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BulwarkConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            service_name: default_service_name(),
            logging: LoggingConfig::default(),
        }
    }
}

fn default_service_name() -> String {
    "bulwark-service".to_string()
}

impl BulwarkConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> BulwarkConfigBuilder {
        BulwarkConfigBuilder::new()
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if the service name or the log
    /// level is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "service_name",
                "must not be empty",
            ));
        }

        if self.logging.enabled && self.logging.level.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "logging.level",
                "must not be empty when logging is enabled",
            ));
        }

        Ok(())
    }

    /// Development preset: pretty debug logs with source locations.
    ///
    /// ```
    /// use bulwark_config::{BulwarkConfig, Environment};
    ///
    /// let config = BulwarkConfig::development();
    /// assert_eq!(config.environment, Environment::Development);
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Development;
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;
        config
    }

    /// Production preset: JSON info logs.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Production;
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config
    }

    /// Test preset: warnings only.
    #[must_use]
    pub fn test() -> Self {
        let mut config = Self::default();
        config.environment = Environment::Test;
        config.logging.level = "warn".to_string();
        config.logging.format = LogFormat::Pretty;
        config
    }

    /// Returns the preset for an environment mode.
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Test => Self::test(),
        }
    }
}

/// Builder for [`BulwarkConfig`].
#[derive(Debug, Default)]
pub struct BulwarkConfigBuilder {
    environment: Option<Environment>,
    service_name: Option<String>,
    logging: Option<LoggingConfig>,
}

impl BulwarkConfigBuilder {
    /// Create a new builder with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the environment mode.
    #[must_use]
    pub fn environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Set the service name.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }

    /// Set the logging configuration.
    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Build the configuration.
    ///
    /// Unset logging falls back to the preset of the chosen environment.
    #[must_use]
    pub fn build(self) -> BulwarkConfig {
        let environment = self.environment.unwrap_or_default();
        let preset = BulwarkConfig::for_environment(environment);
        BulwarkConfig {
            environment,
            service_name: self.service_name.unwrap_or(preset.service_name),
            logging: self.logging.unwrap_or(preset.logging),
        }
    }

    /// Build and validate the configuration.
    pub fn build_validated(self) -> Result<BulwarkConfig, ConfigError> {
        let config = self.build();
        config.validate()?;
        Ok(config)
    }
}
