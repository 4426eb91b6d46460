//! Request logging middleware.
//!
//! Emits one structured log line per request once the response is known:
//! `info` for successful requests, `error` for any status of 400 or above.
//! Failed requests include the error message as raised, which in production
//! may differ from the masked message the client received.
//!
//! # Pipeline Position
//!
//! Request logging wraps every other stage, so it sees the final response
//! produced by error normalization:
//!
//! ```text
//! [RequestLogging] → ErrorNormalization → RequestSections → ... → Handler
//! ```
//!
//! # Log Format
//!
//! Fields follow `bulwark_telemetry::fields`:
//! - `request_id` - Unique request identifier
//! - `http.method` / `http.path` - What was requested
//! - `http.status_code` - Response status
//! - `duration_ms` - Request duration in milliseconds
//! - `error` - Error message (failed requests only)

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    stages::error_normalization::NormalizedError,
    types::{HandlerResult, Request},
};
use bulwark_telemetry::{log_request_complete, log_request_error};
use http::StatusCode;

/// Middleware that logs every request with its outcome.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLoggingMiddleware;

/// What was logged for a request, stored in the context.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLogRecord {
    /// The request ID.
    pub request_id: String,
    /// The HTTP method.
    pub method: String,
    /// The request path.
    pub path: String,
    /// The HTTP status code sent.
    pub status_code: u16,
    /// Request duration in milliseconds.
    pub duration_ms: f64,
    /// The error message, for failed requests.
    pub error: Option<String>,
}

impl RequestLogRecord {
    /// Returns `true` if the record is logged at error level.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

impl RequestLoggingMiddleware {
    /// Creates the request logging stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn emit(&self, record: &RequestLogRecord) {
        if record.is_error() {
            log_request_error!(
                record.request_id,
                record.method,
                record.path,
                record.status_code,
                record.duration_ms,
                record.error.as_deref().unwrap_or_default()
            );
        } else {
            log_request_complete!(
                record.request_id,
                record.method,
                record.path,
                record.status_code,
                record.duration_ms
            );
        }
    }
}

impl Middleware for RequestLoggingMiddleware {
    fn name(&self) -> &'static str {
        "request_logging"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let method = request.method().to_string();
            let path = request.uri().path().to_string();

            let result = next.run(ctx, request).await;

            let (status_code, error) = match &result {
                Ok(response) => (
                    response.status(),
                    ctx.get_extension::<NormalizedError>()
                        .map(|e| e.message.clone()),
                ),
                Err(error) => (
                    error
                        .status_code()
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    Some(error.to_string()),
                ),
            };

            let record = RequestLogRecord {
                request_id: ctx.request_id().to_string(),
                method,
                path,
                status_code: status_code.as_u16(),
                duration_ms: ctx.elapsed().as_secs_f64() * 1000.0,
                error,
            };

            self.emit(&record);
            ctx.set_extension(record);

            result
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Next;
    use crate::stages::ErrorNormalizationMiddleware;
    use crate::types::{Response, ResponseExt};
    use bulwark_config::Environment;
    use bulwark_core::{ApiError, RawError};
    use bytes::Bytes;
    use http::Request as HttpRequest;
    use http_body_util::Full;

    fn make_test_request() -> Request {
        HttpRequest::builder()
            .method("GET")
            .uri("/users/123?expand=true")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_middleware_name() {
        assert_eq!(RequestLoggingMiddleware::new().name(), "request_logging");
    }

    #[tokio::test]
    async fn test_logs_successful_request() {
        let middleware = RequestLoggingMiddleware::new();
        let mut ctx = MiddlewareContext::new();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Ok(Response::text(StatusCode::OK, "ok")) })
        });

        let response = middleware
            .process(&mut ctx, make_test_request(), next)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let record = ctx.get_extension::<RequestLogRecord>().unwrap();
        assert_eq!(record.method, "GET");
        assert_eq!(record.path, "/users/123");
        assert_eq!(record.status_code, 200);
        assert_eq!(record.request_id, ctx.request_id().to_string());
        assert!(record.duration_ms >= 0.0);
        assert!(record.error.is_none());
        assert!(!record.is_error());
    }

    #[tokio::test]
    async fn test_logs_original_message_of_masked_error() {
        let logging = RequestLoggingMiddleware::new();
        let normalizer = ErrorNormalizationMiddleware::new(Environment::Production);
        let mut ctx = MiddlewareContext::new();

        let handler = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(RawError::message("pool exhausted")) })
        });
        let next = Next::new(&normalizer, handler);

        let response = logging
            .process(&mut ctx, make_test_request(), next)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let record = ctx.get_extension::<RequestLogRecord>().unwrap();
        assert_eq!(record.status_code, 500);
        assert_eq!(record.error.as_deref(), Some("pool exhausted"));
        assert!(record.is_error());
    }

    #[tokio::test]
    async fn test_logs_unnormalized_error() {
        let middleware = RequestLoggingMiddleware::new();
        let mut ctx = MiddlewareContext::new();

        let next = Next::handler(|_ctx, _req| {
            Box::pin(async { Err(ApiError::unauthorized("Please authenticate").into()) })
        });

        let result = middleware.process(&mut ctx, make_test_request(), next).await;
        assert!(result.is_err());

        let record = ctx.get_extension::<RequestLogRecord>().unwrap();
        assert_eq!(record.status_code, 401);
        assert_eq!(record.error.as_deref(), Some("Please authenticate"));
    }
}
