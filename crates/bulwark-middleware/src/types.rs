//! Common types used throughout the middleware pipeline.
//!
//! This module defines the HTTP request and response types used by
//! middleware and the result type every stage and handler returns.

use bulwark_core::RawError;
use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

/// The HTTP request type used in the middleware pipeline.
///
/// This is a standard `http::Request` with a `Full<Bytes>` body.
pub type Request = http::Request<Full<Bytes>>;

/// The HTTP response type used in the middleware pipeline.
///
/// This is a standard `http::Response` with a `Full<Bytes>` body.
pub type Response = http::Response<Full<Bytes>>;

/// The outcome of a stage or handler.
///
/// `Err` is the propagation channel: a stage or handler that fails returns
/// the error and the error normalization stage turns it into a response.
pub type HandlerResult = Result<Response, RawError>;

/// Extension trait for building responses.
pub trait ResponseExt {
    /// Creates a JSON response with the given status code.
    ///
    /// Falls back to a bare 500 if `body` cannot be serialized.
    fn json<T: Serialize>(status: StatusCode, body: &T) -> Response;

    /// Creates a plain-text response with the given status code.
    fn text(status: StatusCode, body: impl Into<String>) -> Response;
}

impl ResponseExt for Response {
    fn json<T: Serialize>(status: StatusCode, body: &T) -> Response {
        match serde_json::to_vec(body) {
            Ok(bytes) => with_content_type(status, Bytes::from(bytes), "application/json"),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response body");
                with_content_type(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Bytes::from_static(br#"{"code":500,"message":"Internal Server Error"}"#),
                    "application/json",
                )
            }
        }
    }

    fn text(status: StatusCode, body: impl Into<String>) -> Response {
        with_content_type(status, Bytes::from(body.into()), "text/plain; charset=utf-8")
    }
}

fn with_content_type(status: StatusCode, body: Bytes, content_type: &'static str) -> Response {
    let mut response = http::Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[tokio::test]
    async fn test_json_response() {
        let response = Response::json(StatusCode::CREATED, &serde_json::json!({"id": 7}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "application/json"
        );

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], br#"{"id":7}"#);
    }

    #[test]
    fn test_text_response() {
        let response = Response::text(StatusCode::OK, "pong");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
    }
}
