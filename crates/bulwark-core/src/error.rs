//! Error types for Bulwark.
//!
//! Every failure a request can end with travels through the pipeline as a
//! [`RawError`] and is coerced into the canonical [`ApiError`] before it is
//! serialized. The split mirrors the two kinds of failure a service has:
//!
//! | Kind            | Constructed by                    | `is_operational` | Masked in production |
//! |-----------------|-----------------------------------|------------------|----------------------|
//! | Operational     | `ApiError::bad_request`, ...      | `true`           | never                |
//! | Non-operational | coercion of any other `RawError`  | `false`          | yes                  |
//!
//! # Example
//!
//! ```
//! use bulwark_core::{ApiError, RawError};
//! use http::StatusCode;
//!
//! // Business logic raises an expected condition
//! let error = ApiError::not_found("User not found");
//! assert!(error.is_operational());
//!
//! // Anything else is coerced into a non-operational 500
//! let coerced = ApiError::from(RawError::message("connection reset"));
//! assert_eq!(coerced.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
//! assert!(!coerced.is_operational());
//! ```

use http::StatusCode;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::panic::Location;
use thiserror::Error;

/// Result type alias using [`ApiError`].
pub type ApiResult<T> = Result<T, ApiError>;

/// Returns the standard reason phrase for a status code.
///
/// ```
/// use bulwark_core::reason_phrase;
/// use http::StatusCode;
///
/// assert_eq!(reason_phrase(StatusCode::INTERNAL_SERVER_ERROR), "Internal Server Error");
/// ```
#[must_use]
pub fn reason_phrase(status: StatusCode) -> &'static str {
    status.canonical_reason().unwrap_or("Unknown Error")
}

/// The canonical error representation.
///
/// An `ApiError` carries the HTTP status to respond with, a message, whether
/// the failure is an expected (operational) condition, and a diagnostic
/// trace. Constructors record their call site as the trace, so a
/// development response points at the line that raised the error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ApiError {
    status_code: StatusCode,
    message: String,
    is_operational: bool,
    stack: Option<String>,
}

impl ApiError {
    /// Creates an operational error with the given status and message.
    #[must_use]
    #[track_caller]
    pub fn new(status_code: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        let stack = Some(trace_at(Location::caller(), &message));
        Self {
            status_code,
            message,
            is_operational: true,
            stack,
        }
    }

    /// Creates a non-operational error.
    ///
    /// When `stack` is `None` the call site is recorded instead.
    #[must_use]
    #[track_caller]
    pub fn unexpected(
        status_code: StatusCode,
        message: impl Into<String>,
        stack: Option<String>,
    ) -> Self {
        let message = message.into();
        let stack = stack.or_else(|| Some(trace_at(Location::caller(), &message)));
        Self {
            status_code,
            message,
            is_operational: false,
            stack,
        }
    }

    /// Creates a 400 Bad Request error.
    #[must_use]
    #[track_caller]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// Creates a 401 Unauthorized error.
    #[must_use]
    #[track_caller]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    /// Creates a 403 Forbidden error.
    #[must_use]
    #[track_caller]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    /// Creates a 404 Not Found error.
    #[must_use]
    #[track_caller]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Creates a 409 Conflict error.
    #[must_use]
    #[track_caller]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    /// Creates a non-operational 500 Internal Server Error.
    #[must_use]
    #[track_caller]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::unexpected(StatusCode::INTERNAL_SERVER_ERROR, message, None)
    }

    /// Replaces the diagnostic trace.
    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Returns the HTTP status code.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.status_code
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns `true` if this is an expected, safe-to-display condition.
    #[must_use]
    pub const fn is_operational(&self) -> bool {
        self.is_operational
    }

    /// Returns the diagnostic trace, if one was recorded.
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    #[track_caller]
    fn coerce(status: Option<StatusCode>, message: String, trace: Option<String>) -> Self {
        let status_code = status.unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let message = if message.is_empty() {
            reason_phrase(status_code).to_string()
        } else {
            message
        };
        Self::unexpected(status_code, message, trace)
    }
}

fn trace_at(location: &Location<'_>, message: &str) -> String {
    format!(
        "Error: {message}\n    at {}:{}:{}",
        location.file(),
        location.line(),
        location.column()
    )
}

/// Any error a request can fail with, before classification.
///
/// Handlers, stages and the request parser all propagate failures as a
/// `RawError`. The error normalization stage coerces it into an
/// [`ApiError`] with `ApiError::from`, which is total: every variant maps
/// to exactly one `ApiError`.
#[derive(Error, Debug)]
pub enum RawError {
    /// An already-classified error, passed through unchanged.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// An error that carries its own HTTP status (e.g. a body parser rejection).
    #[error("{message}")]
    Status {
        /// The status the error asked for.
        status: StatusCode,
        /// The error message (may be empty).
        message: String,
        /// Diagnostic trace, if available.
        trace: Option<String>,
    },

    /// An error with a message but no status.
    #[error("{message}")]
    Message {
        /// The error message (may be empty).
        message: String,
        /// Diagnostic trace, if available.
        trace: Option<String>,
    },

    /// Any other error value.
    #[error(transparent)]
    Opaque(#[from] anyhow::Error),

    /// A panic captured while running a handler.
    #[error("handler panicked: {message}")]
    Panic {
        /// The panic payload, when it was a string.
        message: String,
    },
}

impl RawError {
    /// Creates a status-bearing error.
    #[must_use]
    pub fn status(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
            trace: None,
        }
    }

    /// Creates a message-only error.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
            trace: None,
        }
    }

    /// Wraps an arbitrary error value.
    #[must_use]
    pub fn opaque(error: impl Into<anyhow::Error>) -> Self {
        Self::Opaque(error.into())
    }

    /// Builds an error from a panic payload.
    #[must_use]
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(message) = payload.downcast_ref::<&str>() {
            (*message).to_string()
        } else if let Some(message) = payload.downcast_ref::<String>() {
            message.clone()
        } else {
            String::new()
        };
        Self::Panic { message }
    }

    /// Attaches a diagnostic trace to status- or message-bearing errors.
    ///
    /// Other variants already carry their own trace and are returned as-is.
    #[must_use]
    pub fn with_trace(self, trace: impl Into<String>) -> Self {
        match self {
            Self::Status {
                status, message, ..
            } => Self::Status {
                status,
                message,
                trace: Some(trace.into()),
            },
            Self::Message { message, .. } => Self::Message {
                message,
                trace: Some(trace.into()),
            },
            other => other,
        }
    }

    /// Returns the status this error carries, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Api(error) => Some(error.status_code()),
            Self::Status { status, .. } => Some(*status),
            Self::Opaque(error) => error.downcast_ref::<ApiError>().map(ApiError::status_code),
            Self::Message { .. } | Self::Panic { .. } => None,
        }
    }
}

impl From<RawError> for ApiError {
    /// Coerces any raw error into the canonical shape.
    ///
    /// `ApiError`s (including ones wrapped in an `anyhow::Error`) pass
    /// through unchanged. Everything else becomes non-operational, keeps its
    /// status if it had one (500 otherwise), and falls back to the reason
    /// phrase when its message is empty.
    #[track_caller]
    fn from(raw: RawError) -> Self {
        match raw {
            RawError::Api(error) => error,
            RawError::Opaque(error) => match error.downcast::<ApiError>() {
                Ok(api) => api,
                Err(error) => {
                    let trace = format!("{error:?}");
                    Self::coerce(None, error.to_string(), Some(trace))
                }
            },
            RawError::Status {
                status,
                message,
                trace,
            } => Self::coerce(Some(status), message, trace),
            RawError::Message { message, trace } => Self::coerce(None, message, trace),
            RawError::Panic { message } => Self::coerce(None, message, None),
        }
    }
}

/// Serializable error body written for every failed request.
///
/// ```json
/// { "code": 400, "message": "\"name\" is required" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// The HTTP status code.
    pub code: u16,
    /// Human-readable error message.
    pub message: String,
    /// Diagnostic trace (development only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorBody {
    /// Creates an error body.
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            code: status.as_u16(),
            message: message.into(),
            stack,
        }
    }
}
