//! Request section loading.
//!
//! Parses the query string and the body into the context's
//! [`RequestSections`](crate::sections::RequestSections) so validation
//! gates and handlers work on JSON values. Path parameters are left as the
//! dispatch layer set them.
//!
//! A query or body that cannot be parsed fails the request with a `400`
//! status-bearing error. Such errors are not operational, so production
//! responses mask them.

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    sections::{parse_body, parse_query, Section},
    types::{HandlerResult, Request},
};
use http_body_util::{BodyExt, Full};

/// Middleware that loads the query and body sections.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSectionsMiddleware;

impl RequestSectionsMiddleware {
    /// Creates the section loading stage.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Middleware for RequestSectionsMiddleware {
    fn name(&self) -> &'static str {
        "request_sections"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();
            let bytes = match body.collect().await {
                Ok(collected) => collected.to_bytes(),
                Err(never) => match never {},
            };

            let query = parse_query(parts.uri.query())?;
            let body = parse_body(&parts.headers, &bytes)?;

            let sections = ctx.sections_mut();
            sections.set(Section::Query, query);
            sections.set(Section::Body, body);

            let request = Request::from_parts(parts, Full::new(bytes));
            next.run(ctx, request).await
        })
    }
}
