//! Core middleware stages.
//!
//! The pipeline installs these stages in a fixed order:
//!
//! 1. [`request_logging`] - One log line per request (skipped in test mode)
//! 2. [`error_normalization`] - Turns any propagated error into a response
//! 3. [`request_sections`] - Parses the query string and body
//!
//! [`validation`] gates run after them, either per route or as global
//! stages.

pub mod error_normalization;
pub mod request_logging;
pub mod request_sections;
pub mod validation;

// Re-export main types
pub use error_normalization::{ErrorNormalizationMiddleware, NormalizedError};
pub use request_logging::{RequestLogRecord, RequestLoggingMiddleware};
pub use request_sections::RequestSectionsMiddleware;
pub use validation::{validate, SchemaBundle, ValidatedSections, ValidationFailure, ValidationGate};
