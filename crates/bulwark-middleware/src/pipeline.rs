//! Ordered middleware pipeline.
//!
//! Every request flows through the same chain:
//!
//! 1. **Request Logging** - One log line per request (omitted in `test`)
//! 2. **Error Normalization** - Turns any propagated error into a response
//! 3. **Request Sections** - Loads `query` and `body` into the context
//! 4. *User stages* - Added with [`PipelineBuilder::add_stage`]
//! 5. **Validation** - The matched route's gate, if it has one
//!
//! followed by the route handler. Requests no route matched end with
//! `404 No Endpoint found`, which is normalized like any other error.
//!
//! Core stages are always present and always in this order; user stages
//! can only be inserted between section loading and validation.

use crate::context::MiddlewareContext;
use crate::middleware::{BoxFuture, Middleware, Next};
use crate::route::{endpoint_not_found, Route};
use crate::stages::{
    ErrorNormalizationMiddleware, RequestLoggingMiddleware, RequestSectionsMiddleware,
};
use crate::types::{HandlerResult, Request, Response};
use bulwark_config::{BulwarkConfig, Environment};
use std::sync::Arc;

/// A type-erased middleware that can be stored in a vector.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The request pipeline.
///
/// Immutable once built; share it behind an `Arc` across requests.
///
/// # Example
///
/// ```
/// use bulwark_config::Environment;
/// use bulwark_middleware::pipeline::Pipeline;
///
/// let pipeline = Pipeline::builder(Environment::Production).build();
/// assert_eq!(
///     pipeline.stage_names(),
///     vec!["request_logging", "error_normalization", "request_sections"]
/// );
/// ```
pub struct Pipeline {
    environment: Environment,
    normalizer: ErrorNormalizationMiddleware,
    core_stages: Vec<Stage>,
    stages: Vec<BoxedMiddleware>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("environment", &self.environment)
            .field("stages", &self.stage_names())
            .finish()
    }
}

impl Pipeline {
    /// Creates a pipeline builder for an environment.
    #[must_use]
    pub fn builder(environment: Environment) -> PipelineBuilder {
        PipelineBuilder::new(environment)
    }

    /// Creates a pipeline builder from loaded configuration.
    #[must_use]
    pub fn from_config(config: &BulwarkConfig) -> PipelineBuilder {
        PipelineBuilder::new(config.environment)
    }

    /// Returns the environment the pipeline renders errors for.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// Returns the error normalization stage.
    #[must_use]
    pub fn normalizer(&self) -> &ErrorNormalizationMiddleware {
        &self.normalizer
    }

    /// Processes a request with an arbitrary terminal handler.
    ///
    /// Always produces a response: errors are rendered by the error
    /// normalization stage.
    pub async fn process<'a, H>(
        &'a self,
        ctx: &mut MiddlewareContext,
        request: Request,
        handler: H,
    ) -> Response
    where
        H: FnOnce(&mut MiddlewareContext, Request) -> BoxFuture<'static, HandlerResult> + Send + 'a,
    {
        self.run(ctx, request, Next::handler(handler)).await
    }

    /// Processes a request for a matched route, or for no route at all.
    ///
    /// The route's validation gate runs right before its handler. With no
    /// route the request ends in `404 No Endpoint found`.
    pub async fn dispatch(
        &self,
        ctx: &mut MiddlewareContext,
        request: Request,
        route: Option<&Route>,
    ) -> Response {
        let Some(route) = route else {
            let fallback = Next::handler(|_ctx, _req| {
                Box::pin(async { Err(endpoint_not_found().into()) })
            });
            return self.run(ctx, request, fallback).await;
        };

        let mut terminal = Next::handler(route.terminal());
        if let Some(gate) = route.gate() {
            terminal = Next::new(gate, terminal);
        }
        self.run(ctx, request, terminal).await
    }

    async fn run<'a>(
        &'a self,
        ctx: &mut MiddlewareContext,
        request: Request,
        terminal: Next<'a>,
    ) -> Response {
        let next = self.build_chain(terminal);
        match next.run(ctx, request).await {
            Ok(response) => response,
            // Only reachable if a stage wrapping the normalizer fails itself
            Err(error) => self.normalizer.respond(ctx, error),
        }
    }

    /// Builds the middleware chain for a request, from back to front.
    fn build_chain<'a>(&'a self, terminal: Next<'a>) -> Next<'a> {
        self.stages
            .iter()
            .rev()
            .fold(terminal, |next, middleware| Next::new(middleware.as_ref(), next))
    }

    /// Returns the names of all middleware stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|mw| mw.name()).collect()
    }

    /// Returns the core stages this pipeline runs, in order.
    #[must_use]
    pub fn core_stages(&self) -> &[Stage] {
        &self.core_stages
    }

    /// Returns the number of middleware stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

/// Builder for constructing a [`Pipeline`].
pub struct PipelineBuilder {
    environment: Environment,
    request_logging: bool,
    user_stages: Vec<BoxedMiddleware>,
}

impl PipelineBuilder {
    /// Creates a builder; request logging follows the environment.
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            request_logging: environment.logs_requests(),
            user_stages: Vec::new(),
        }
    }

    /// Forces request logging on or off.
    #[must_use]
    pub fn request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Adds a stage that runs after the request sections are loaded and
    /// before route validation.
    ///
    /// Stages run in the order they are added. A stage that returns `Err`
    /// short-circuits the request; the error is normalized as usual.
    #[must_use]
    pub fn add_stage<M: Middleware>(mut self, middleware: M) -> Self {
        self.user_stages.push(Arc::new(middleware));
        self
    }

    /// Builds the pipeline.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let normalizer = ErrorNormalizationMiddleware::new(self.environment);
        let core_stages: Vec<Stage> = Stage::all()
            .into_iter()
            .filter(|stage| *stage != Stage::RequestLogging || self.request_logging)
            .collect();

        let mut stages: Vec<BoxedMiddleware> =
            Vec::with_capacity(core_stages.len() + self.user_stages.len());
        stages.extend(core_stages.iter().map(|stage| stage.middleware(normalizer)));
        stages.extend(self.user_stages);

        Pipeline {
            environment: self.environment,
            normalizer,
            core_stages,
            stages,
        }
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new(Environment::default())
    }
}

/// Core pipeline stages, in execution order.
///
/// User stages and the route's validation gate always follow these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Per-request log line
    RequestLogging = 1,
    /// Error to response conversion
    ErrorNormalization = 2,
    /// Query and body loading
    RequestSections = 3,
}

impl Stage {
    /// Returns all core stages in order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [
            Self::RequestLogging,
            Self::ErrorNormalization,
            Self::RequestSections,
        ]
    }

    /// Returns the stage's middleware name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::RequestLogging => "request_logging",
            Self::ErrorNormalization => "error_normalization",
            Self::RequestSections => "request_sections",
        }
    }

    /// Creates the middleware implementing this stage.
    fn middleware(self, normalizer: ErrorNormalizationMiddleware) -> BoxedMiddleware {
        match self {
            Self::RequestLogging => Arc::new(RequestLoggingMiddleware::new()),
            Self::ErrorNormalization => Arc::new(normalizer),
            Self::RequestSections => Arc::new(RequestSectionsMiddleware::new()),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::RouteRequest;
    use crate::schema::{Field, ObjectSchema};
    use crate::stages::validation::{validate, SchemaBundle};
    use crate::stages::RequestLogRecord;
    use crate::types::ResponseExt;
    use bulwark_core::{ApiError, RawError};
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::{BodyExt, Full};
    use serde_json::{json, Value};

    fn make_request(uri: &str, body: &'static str) -> Request {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Full::new(Bytes::from_static(body.as_bytes())))
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Records the body section as a user stage saw it.
    struct BodyProbe;

    #[derive(Debug)]
    struct SeenBody(Value);

    impl Middleware for BodyProbe {
        fn name(&self) -> &'static str {
            "body_probe"
        }

        fn process<'a>(
            &'a self,
            ctx: &'a mut MiddlewareContext,
            request: Request,
            next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async move {
                ctx.set_extension(SeenBody(ctx.sections().body().clone()));
                next.run(ctx, request).await
            })
        }
    }

    struct Reject;

    impl Middleware for Reject {
        fn name(&self) -> &'static str {
            "reject"
        }

        fn process<'a>(
            &'a self,
            _ctx: &'a mut MiddlewareContext,
            _request: Request,
            _next: Next<'a>,
        ) -> BoxFuture<'a, HandlerResult> {
            Box::pin(async { Err(ApiError::unauthorized("Please authenticate").into()) })
        }
    }

    #[test]
    fn test_stage_names_per_environment() {
        let dev = Pipeline::builder(Environment::Development).build();
        assert_eq!(
            dev.stage_names(),
            vec!["request_logging", "error_normalization", "request_sections"]
        );

        let test = Pipeline::builder(Environment::Test).build();
        assert_eq!(test.stage_names(), vec!["error_normalization", "request_sections"]);
        assert_eq!(test.stage_count(), 2);

        let forced = Pipeline::builder(Environment::Test)
            .request_logging(true)
            .build();
        assert_eq!(forced.stage_count(), 3);
    }

    #[test]
    fn test_user_stages_follow_core_stages() {
        let pipeline = Pipeline::builder(Environment::Production)
            .add_stage(BodyProbe)
            .add_stage(Reject)
            .build();

        assert_eq!(
            pipeline.stage_names(),
            vec![
                "request_logging",
                "error_normalization",
                "request_sections",
                "body_probe",
                "reject"
            ]
        );
    }

    #[test]
    fn test_from_config() {
        let config = BulwarkConfig::production();
        let pipeline = Pipeline::from_config(&config).build();
        assert_eq!(pipeline.environment(), Environment::Production);
        assert_eq!(pipeline.normalizer().environment(), Environment::Production);
    }

    #[test]
    fn test_stage_order() {
        let stages = Stage::all();
        assert!(stages.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(stages[1].to_string(), "error_normalization");
    }

    #[test]
    fn test_core_stages_match_installed_middleware() {
        for env in Environment::ALL {
            let pipeline = Pipeline::builder(env).add_stage(BodyProbe).build();
            let core: Vec<_> = pipeline.core_stages().iter().map(Stage::name).collect();
            let names = pipeline.stage_names();

            assert_eq!(&names[..core.len()], core.as_slice());
            assert_eq!(names[core.len()..], ["body_probe"]);
            assert_eq!(
                pipeline.core_stages().contains(&Stage::RequestLogging),
                env.logs_requests()
            );
        }
    }

    #[tokio::test]
    async fn test_user_stage_sees_loaded_body() {
        let pipeline = Pipeline::builder(Environment::Test)
            .add_stage(BodyProbe)
            .build();
        let mut ctx = MiddlewareContext::new();

        let response = pipeline
            .process(&mut ctx, make_request("/users", r#"{"name":"Ada"}"#), |_ctx, _req| {
                Box::pin(async { Ok(Response::text(StatusCode::OK, "ok")) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        let seen = ctx.get_extension::<SeenBody>().unwrap();
        assert_eq!(seen.0, json!({"name": "Ada"}));
    }

    #[tokio::test]
    async fn test_user_stage_error_is_normalized() {
        let pipeline = Pipeline::builder(Environment::Production)
            .add_stage(Reject)
            .build();
        let mut ctx = MiddlewareContext::new();

        let response = pipeline
            .process(&mut ctx, make_request("/users", "{}"), |_ctx, _req| {
                Box::pin(async { Ok(Response::text(StatusCode::OK, "unreachable")) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            json!({"code": 401, "message": "Please authenticate"})
        );

        let record = ctx.get_extension::<RequestLogRecord>().unwrap();
        assert_eq!(record.status_code, 401);
    }

    #[tokio::test]
    async fn test_malformed_body_is_rejected_before_handler() {
        let pipeline = Pipeline::builder(Environment::Test).build();
        let mut ctx = MiddlewareContext::new();

        let response = pipeline
            .process(&mut ctx, make_request("/users", "{not json"), |_ctx, _req| {
                Box::pin(async { Ok(Response::text(StatusCode::OK, "unreachable")) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["message"]
            .as_str()
            .unwrap()
            .starts_with("Invalid JSON body"));
    }

    #[tokio::test]
    async fn test_dispatch_without_route() {
        for env in Environment::ALL {
            let pipeline = Pipeline::builder(env).build();
            let mut ctx = MiddlewareContext::new();

            let response = pipeline
                .dispatch(&mut ctx, make_request("/nowhere", ""), None)
                .await;

            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            let body = body_json(response).await;
            assert_eq!(body["code"], json!(404));
            assert_eq!(body["message"], json!("No Endpoint found"));
        }
    }

    #[tokio::test]
    async fn test_dispatch_runs_gate_before_handler() {
        let route = Route::new(|request: RouteRequest| async move {
            Ok(Response::json(StatusCode::CREATED, request.body()))
        })
        .with_gate(validate(SchemaBundle::new().body(
            ObjectSchema::new()
                .field("name", Field::string().required())
                .field("role", Field::string().default(json!("user"))),
        )));
        let pipeline = Pipeline::builder(Environment::Test).build();

        let mut ctx = MiddlewareContext::new();
        let response = pipeline
            .dispatch(&mut ctx, make_request("/users", r#"{"name":"Ada"}"#), Some(&route))
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(
            body_json(response).await,
            json!({"name": "Ada", "role": "user"})
        );

        let mut ctx = MiddlewareContext::new();
        let response = pipeline
            .dispatch(&mut ctx, make_request("/users", "{}"), Some(&route))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(response).await,
            json!({"code": 400, "message": "\"name\" is required"})
        );
    }

    #[tokio::test]
    async fn test_handler_panic_is_normalized() {
        let route = Route::new(|_request: RouteRequest| async move {
            let items: Vec<u32> = Vec::new();
            Ok(Response::text(StatusCode::OK, items[3].to_string()))
        });
        let pipeline = Pipeline::builder(Environment::Production).build();
        let mut ctx = MiddlewareContext::new();

        let response = pipeline
            .dispatch(&mut ctx, make_request("/items", ""), Some(&route))
            .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            json!({"code": 500, "message": "Internal Server Error"})
        );
    }

    #[tokio::test]
    async fn test_handler_error_keeps_status_outside_production() {
        let pipeline = Pipeline::builder(Environment::Test).build();
        let mut ctx = MiddlewareContext::new();

        let response = pipeline
            .process(&mut ctx, make_request("/items", ""), |_ctx, _req| {
                Box::pin(async { Err(RawError::status(StatusCode::BAD_GATEWAY, "upstream down")) })
            })
            .await;

        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            body_json(response).await,
            json!({"code": 502, "message": "upstream down"})
        );
    }
}
