//! Environment mode.
//!
//! The environment mode is fixed at startup and injected into every
//! component that changes behavior with it. It gates two orthogonal
//! concerns of error handling:
//!
//! | Mode          | Stack in response | Unexpected errors masked | Errors logged | Requests logged |
//! |---------------|-------------------|--------------------------|---------------|-----------------|
//! | `development` | yes               | no                       | yes           | yes             |
//! | `production`  | no                | yes                      | no            | yes             |
//! | `test`        | no                | no                       | no            | no              |

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Process-wide environment mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development: full error detail and diagnostic logging.
    #[default]
    Development,
    /// Production: unexpected failures are masked.
    Production,
    /// Automated tests: quiet, unmasked.
    Test,
}

impl Environment {
    /// All environment modes.
    pub const ALL: [Self; 3] = [Self::Development, Self::Production, Self::Test];

    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }

    /// Whether error responses carry the diagnostic trace.
    #[must_use]
    pub const fn exposes_stack(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Whether non-operational errors are replaced by a generic 500.
    #[must_use]
    pub const fn masks_unexpected_errors(&self) -> bool {
        matches!(self, Self::Production)
    }

    /// Whether failed requests are written to the diagnostic log.
    #[must_use]
    pub const fn logs_errors(&self) -> bool {
        matches!(self, Self::Development)
    }

    /// Whether one log line is emitted per request.
    #[must_use]
    pub const fn logs_requests(&self) -> bool {
        !matches!(self, Self::Test)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::invalid_value(
                "environment",
                format!("expected 'development', 'production' or 'test', got '{other}'"),
            )),
        }
    }
}
