//! Route handlers.
//!
//! A [`Route`] pairs a handler with an optional [`ValidationGate`]. The
//! handler receives a [`RouteRequest`]: an owned snapshot of the request
//! and its (validated) sections, so it can run without borrowing the
//! pipeline context.
//!
//! # Example
//!
//! ```
//! use bulwark_middleware::route::{Route, RouteRequest};
//! use bulwark_middleware::schema::{Field, ObjectSchema};
//! use bulwark_middleware::stages::validation::{validate, SchemaBundle};
//! use bulwark_middleware::{HandlerResult, Response, ResponseExt};
//! use http::StatusCode;
//!
//! async fn create_user(request: RouteRequest) -> HandlerResult {
//!     Ok(Response::json(StatusCode::CREATED, request.body()))
//! }
//!
//! let route = Route::new(create_user).with_gate(validate(
//!     SchemaBundle::new().body(ObjectSchema::new().field("name", Field::string().required())),
//! ));
//! assert!(route.gate().is_some());
//! ```

use crate::{
    context::MiddlewareContext,
    middleware::BoxFuture,
    sections::RequestSections,
    stages::validation::ValidationGate,
    types::{HandlerResult, Request},
};
use bulwark_core::{ApiError, RawError, RequestId};
use futures_util::FutureExt;
use http::{HeaderMap, Method, Uri};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Message of the error raised for requests no route matched.
pub const ENDPOINT_NOT_FOUND: &str = "No Endpoint found";

/// The error raised for requests no route matched.
#[must_use]
#[track_caller]
pub fn endpoint_not_found() -> ApiError {
    ApiError::not_found(ENDPOINT_NOT_FOUND)
}

/// What a route handler receives.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    request_id: RequestId,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    sections: RequestSections,
}

impl RouteRequest {
    /// Snapshots the request and the context's current sections.
    #[must_use]
    pub fn from_context(ctx: &MiddlewareContext, request: Request) -> Self {
        let (parts, _body) = request.into_parts();
        Self {
            request_id: ctx.request_id(),
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            sections: ctx.sections().clone(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the HTTP method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns all sections.
    #[must_use]
    pub fn sections(&self) -> &RequestSections {
        &self.sections
    }

    /// Returns the path parameters.
    #[must_use]
    pub fn params(&self) -> &Value {
        self.sections.params()
    }

    /// Returns a single path parameter.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.sections.params().get(name)
    }

    /// Returns the query section.
    #[must_use]
    pub fn query(&self) -> &Value {
        self.sections.query()
    }

    /// Returns the body section.
    #[must_use]
    pub fn body(&self) -> &Value {
        self.sections.body()
    }

    /// Deserializes the body section into a typed value.
    ///
    /// A mismatch here means the route's schema and the target type
    /// disagree, so it is reported as an unexpected error.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, RawError> {
        T::deserialize(self.sections.body()).map_err(RawError::opaque)
    }
}

/// A request handler.
///
/// Implemented for every `Fn(RouteRequest) -> impl Future<Output = HandlerResult>`.
pub trait RouteHandler: Send + Sync + 'static {
    /// Handles one request.
    fn call(&self, request: RouteRequest) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> RouteHandler for F
where
    F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, request: RouteRequest) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(request))
    }
}

/// A handler with its optional validation gate.
#[derive(Clone)]
pub struct Route {
    handler: Arc<dyn RouteHandler>,
    gate: Option<ValidationGate>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}

impl Route {
    /// Creates a route from an async function or closure.
    #[must_use]
    pub fn new<F, Fut>(handler: F) -> Self
    where
        F: Fn(RouteRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::from_handler(handler)
    }

    /// Creates a route from any [`RouteHandler`].
    #[must_use]
    pub fn from_handler(handler: impl RouteHandler) -> Self {
        Self {
            handler: Arc::new(handler),
            gate: None,
        }
    }

    /// Validates requests with `gate` before the handler runs.
    #[must_use]
    pub fn with_gate(mut self, gate: ValidationGate) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Returns the route's validation gate.
    #[must_use]
    pub fn gate(&self) -> Option<&ValidationGate> {
        self.gate.as_ref()
    }

    /// Builds the terminal step of a middleware chain for this route.
    pub(crate) fn terminal(
        &self,
    ) -> impl FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + '_
    {
        let handler = Arc::clone(&self.handler);
        move |ctx: &mut MiddlewareContext, request: Request| -> BoxFuture<'static, HandlerResult> {
            let request = RouteRequest::from_context(ctx, request);
            Box::pin(invoke(handler, request))
        }
    }
}

/// Runs a handler, turning a panic into an error.
async fn invoke(handler: Arc<dyn RouteHandler>, request: RouteRequest) -> HandlerResult {
    let future = match std::panic::catch_unwind(AssertUnwindSafe(|| handler.call(request))) {
        Ok(future) => future,
        Err(payload) => return Err(RawError::from_panic(payload)),
    };

    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(RawError::from_panic(payload)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;
    use serde::Deserialize;
    use serde_json::json;

    fn make_request() -> Request {
        HttpRequest::builder()
            .method("PUT")
            .uri("/users/5?notify=true")
            .header("x-tenant", "acme")
            .body(Full::new(Bytes::new()))
            .unwrap()
    }

    #[test]
    fn test_endpoint_not_found() {
        let error = endpoint_not_found();
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(error.message(), "No Endpoint found");
        assert!(error.is_operational());
    }

    #[test]
    fn test_route_request_snapshot() {
        let mut ctx = MiddlewareContext::new();
        ctx.set_path_param("id", "5");

        let request = RouteRequest::from_context(&ctx, make_request());
        assert_eq!(request.method(), Method::PUT);
        assert_eq!(request.uri().path(), "/users/5");
        assert_eq!(request.headers()["x-tenant"], "acme");
        assert_eq!(request.param("id"), Some(&json!("5")));
        assert_eq!(request.request_id(), ctx.request_id());
    }

    #[test]
    fn test_body_as() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct NewUser {
            name: String,
        }

        let mut ctx = MiddlewareContext::new();
        ctx.sections_mut()
            .set(crate::sections::Section::Body, json!({"name": "Ada"}));
        let request = RouteRequest::from_context(&ctx, make_request());

        let user: NewUser = request.body_as().unwrap();
        assert_eq!(user, NewUser { name: "Ada".to_string() });

        let result: Result<Vec<u8>, _> = request.body_as();
        assert!(matches!(result, Err(RawError::Opaque(_))));
    }

    #[tokio::test]
    async fn test_invoke_runs_handler() {
        let route = Route::new(|request: RouteRequest| async move {
            Ok(Response::json(StatusCode::OK, request.params()))
        });

        let mut ctx = MiddlewareContext::new();
        ctx.set_path_param("id", "5");

        let response = (route.terminal())(&mut ctx, make_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_invoke_captures_panics() {
        let route = Route::new(|_request: RouteRequest| async move {
            if true {
                panic!("index out of bounds");
            }
            Ok(Response::text(StatusCode::OK, "unreachable"))
        });

        let mut ctx = MiddlewareContext::new();
        let error = (route.terminal())(&mut ctx, make_request()).await.unwrap_err();

        match error {
            RawError::Panic { message } => assert_eq!(message, "index out of bounds"),
            other => panic!("expected panic error, got {other:?}"),
        }
    }
}
