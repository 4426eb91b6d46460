//! Error normalization middleware.
//!
//! This stage is the single place where a failed request becomes a
//! response. Whatever error a later stage or the handler propagated is
//! converted to an [`ApiError`] and written as an [`ErrorBody`]:
//!
//! ```json
//! { "code": 400, "message": "\"name\" is required" }
//! ```
//!
//! # Environment Rules
//!
//! | Environment | Non-operational errors          | `stack` field | Error log |
//! |-------------|---------------------------------|---------------|-----------|
//! | development | shown as raised                 | present       | yes       |
//! | production  | `500 Internal Server Error`     | absent        | no        |
//! | test        | shown as raised                 | absent        | no        |
//!
//! Operational errors are never masked.
//!
//! # Example
//!
//! ```
//! use bulwark_config::Environment;
//! use bulwark_core::{ApiError, RawError};
//! use bulwark_middleware::stages::ErrorNormalizationMiddleware;
//! use http::StatusCode;
//!
//! let normalizer = ErrorNormalizationMiddleware::new(Environment::Production);
//!
//! let error = ErrorNormalizationMiddleware::convert(RawError::message("db down"));
//! let response = normalizer.render(&error);
//! assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
//! ```

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    types::{HandlerResult, Request, Response, ResponseExt},
};
use bulwark_config::Environment;
use bulwark_core::{reason_phrase, ApiError, ErrorBody, RawError};
use bulwark_telemetry::fields;
use http::StatusCode;

/// Error normalization middleware that turns propagated errors into
/// responses.
#[derive(Debug, Clone, Copy)]
pub struct ErrorNormalizationMiddleware {
    environment: Environment,
}

/// The error a request ended with, stored in the context.
///
/// Holds the error as raised, before any production masking, so request
/// logging can report what actually happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    /// The status the error was raised with.
    pub status_code: StatusCode,
    /// The status actually sent.
    pub response_status: StatusCode,
    /// The error message as raised.
    pub message: String,
    /// Whether the error was operational.
    pub is_operational: bool,
    /// Whether the response hid the error's status and message.
    pub masked: bool,
}

impl Default for ErrorNormalizationMiddleware {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

impl ErrorNormalizationMiddleware {
    /// Creates the stage for an environment.
    #[must_use]
    pub const fn new(environment: Environment) -> Self {
        Self { environment }
    }

    /// Returns the environment this stage renders for.
    #[must_use]
    pub const fn environment(&self) -> Environment {
        self.environment
    }

    /// Coerces any propagated error into an [`ApiError`].
    ///
    /// Never fails; see `ApiError::from` for the rules.
    #[must_use]
    pub fn convert(error: RawError) -> ApiError {
        ApiError::from(error)
    }

    /// Returns the status and message a client is allowed to see.
    fn effective(&self, error: &ApiError) -> (StatusCode, String) {
        if self.environment.masks_unexpected_errors() && !error.is_operational() {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, reason_phrase(status).to_string())
        } else {
            (error.status_code(), error.message().to_string())
        }
    }

    /// Builds the wire body for an error.
    #[must_use]
    pub fn body(&self, error: &ApiError) -> ErrorBody {
        let (status, message) = self.effective(error);
        let stack = self.environment.exposes_stack().then(|| {
            error
                .stack()
                .map_or_else(|| format!("Error: {}", error.message()), str::to_string)
        });
        ErrorBody::new(status, message, stack)
    }

    /// Serializes an error into the final response.
    #[must_use]
    pub fn render(&self, error: &ApiError) -> Response {
        let body = self.body(error);
        let status =
            StatusCode::from_u16(body.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Response::json(status, &body)
    }

    /// Converts, logs, records and renders a propagated error.
    pub fn respond(&self, ctx: &mut MiddlewareContext, error: RawError) -> Response {
        let error = Self::convert(error);

        if self.environment.logs_errors() {
            tracing::error!(
                { fields::REQUEST_ID } = %ctx.request_id(),
                { fields::HTTP_STATUS } = error.status_code().as_u16(),
                { fields::OPERATIONAL } = error.is_operational(),
                { fields::STACK } = error.stack().unwrap_or_default(),
                "{}",
                error.message()
            );
        }

        let (response_status, _) = self.effective(&error);
        ctx.set_extension(NormalizedError {
            status_code: error.status_code(),
            response_status,
            message: error.message().to_string(),
            is_operational: error.is_operational(),
            masked: self.environment.masks_unexpected_errors() && !error.is_operational(),
        });

        self.render(&error)
    }
}

impl Middleware for ErrorNormalizationMiddleware {
    fn name(&self) -> &'static str {
        "error_normalization"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            match next.run(ctx, request).await {
                Ok(response) => Ok(response),
                Err(error) => Ok(self.respond(ctx, error)),
            }
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
