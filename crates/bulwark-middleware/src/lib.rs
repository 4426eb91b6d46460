//! # Bulwark Middleware
//!
//! Request pipeline for the Bulwark HTTP error and validation layer.
//!
//! Every request passes through the same ordered chain. Errors raised
//! anywhere downstream propagate back up as `Err` until the error
//! normalization stage renders them as a JSON `{ code, message }` body.
//!
//! ## Pipeline Stages
//!
//! ```text
//! Request → [RequestLogging] → ErrorNorm → Sections → user stages → Validation → Handler
//!                                 ↑                                                 │
//!                                 └──────────────── Err(RawError) ──────────────────┘
//! ```
//!
//! | Stage | Middleware          | Purpose                                      |
//! |-------|---------------------|----------------------------------------------|
//! | 1     | Request Logging     | One structured log line (not in `test`)      |
//! | 2     | Error Normalization | Convert errors, mask in production, render   |
//! | 3     | Request Sections    | Parse query string and body into the context |
//! | 4     | Validation          | Per-route `params`/`query`/`body` schemas    |
//!
//! ## Example
//!
//! ```
//! use bulwark_middleware::pipeline::Stage;
//!
//! let stages = Stage::all();
//! assert_eq!(stages.len(), 3);
//! assert_eq!(stages[0].name(), "request_logging");
//! assert_eq!(stages[1].name(), "error_normalization");
//! ```

#![doc(html_root_url = "https://docs.rs/bulwark-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod context;
pub mod middleware;
pub mod pipeline;
pub mod route;
pub mod schema;
pub mod sections;
pub mod stages;
pub mod types;

// Re-export main types at crate root
pub use context::MiddlewareContext;
pub use middleware::{BoxFuture, Middleware, Next};
pub use pipeline::{Pipeline, PipelineBuilder, Stage};
pub use route::{endpoint_not_found, Route, RouteHandler, RouteRequest};
pub use schema::{Field, ObjectSchema, UnknownKeys, Validator, Violation};
pub use sections::{RequestSections, Section};
pub use stages::{
    validate, ErrorNormalizationMiddleware, SchemaBundle, ValidationFailure, ValidationGate,
};
pub use types::{HandlerResult, Request, Response, ResponseExt};
