//! Middleware context types.
//!
//! The [`MiddlewareContext`] carries per-request state through the pipeline:
//! the request ID, the parsed request sections and any typed extensions
//! stages leave for each other.

use crate::sections::{RequestSections, Section};
use bulwark_core::RequestId;
use serde_json::{Map, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::time::Instant;

/// Context that flows through the middleware pipeline.
///
/// Each stage may enrich it: the section loader fills in the query and body,
/// a validation gate overwrites sections with their validated values, and
/// the error normalization stage records the error it rendered.
///
/// # Example
///
/// ```
/// use bulwark_middleware::context::MiddlewareContext;
/// use serde_json::json;
///
/// let mut ctx = MiddlewareContext::new();
/// ctx.set_path_param("id", "42");
///
/// assert_eq!(ctx.sections().params(), &json!({"id": "42"}));
/// ```
#[derive(Debug)]
pub struct MiddlewareContext {
    /// Unique identifier for this request.
    request_id: RequestId,

    /// When the request started processing.
    started_at: Instant,

    /// The request's params, query and body.
    sections: RequestSections,

    /// Type-erased extension data.
    extensions: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl MiddlewareContext {
    /// Creates a new middleware context with a fresh request ID.
    #[must_use]
    pub fn new() -> Self {
        Self::with_request_id(RequestId::new())
    }

    /// Creates a context with a specific request ID.
    ///
    /// Useful when the request ID was provided by a client or upstream service.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            started_at: Instant::now(),
            sections: RequestSections::new(),
            extensions: HashMap::new(),
        }
    }

    /// Returns the request ID.
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns when the request started processing.
    #[must_use]
    pub fn started_at(&self) -> Instant {
        self.started_at
    }

    /// Returns the elapsed time since the request started.
    #[must_use]
    pub fn elapsed(&self) -> std::time::Duration {
        self.started_at.elapsed()
    }

    /// Returns the request sections.
    #[must_use]
    pub fn sections(&self) -> &RequestSections {
        &self.sections
    }

    /// Returns the request sections for modification.
    pub fn sections_mut(&mut self) -> &mut RequestSections {
        &mut self.sections
    }

    /// Sets all path parameters at once.
    ///
    /// Called by the dispatch layer after it has matched a route.
    pub fn set_path_params(&mut self, params: Map<String, Value>) {
        self.sections.set(Section::Params, Value::Object(params));
    }

    /// Sets a single path parameter.
    pub fn set_path_param(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let mut params = match self.sections.get(Section::Params) {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        params.insert(name.into(), Value::String(value.into()));
        self.set_path_params(params);
    }

    /// Stores a typed extension value.
    ///
    /// Extensions allow middleware to store arbitrary data that can be
    /// retrieved by later middleware or handlers.
    ///
    /// # Example
    ///
    /// ```
    /// use bulwark_middleware::context::MiddlewareContext;
    ///
    /// #[derive(Clone)]
    /// struct TenantId(String);
    ///
    /// let mut ctx = MiddlewareContext::new();
    /// ctx.set_extension(TenantId("acme".to_string()));
    ///
    /// let tenant = ctx.get_extension::<TenantId>().unwrap();
    /// assert_eq!(tenant.0, "acme");
    /// ```
    pub fn set_extension<T: Send + Sync + 'static>(&mut self, value: T) {
        self.extensions.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Retrieves a typed extension value.
    ///
    /// Returns `None` if no extension of the given type was stored.
    #[must_use]
    pub fn get_extension<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.extensions
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref())
    }

    /// Removes and returns a typed extension value.
    pub fn remove_extension<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.extensions
            .remove(&TypeId::of::<T>())
            .and_then(|v| v.downcast().ok())
            .map(|b| *b)
    }

    /// Checks if an extension of the given type exists.
    #[must_use]
    pub fn has_extension<T: Send + Sync + 'static>(&self) -> bool {
        self.extensions.contains_key(&TypeId::of::<T>())
    }
}

impl Default for MiddlewareContext {
    fn default() -> Self {
        Self::new()
    }
}
