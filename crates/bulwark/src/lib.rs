//! # Bulwark
//!
//! **Error normalization and request validation for HTTP services**
//!
//! Bulwark gives every failed request the same JSON shape and keeps bad
//! input away from handlers:
//!
//! - **Error Normalization** – Any propagated error becomes `{ code, message }`
//! - **Production Masking** – Unexpected errors are reported as `500 Internal Server Error`
//! - **Validation Gates** – Per-route `params`/`query`/`body` schemas, all violations at once
//! - **Structured Logging** – One `tracing` event per request, JSON in production
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use bulwark::prelude::*;
//!
//! let config = ConfigLoader::new().with_env_prefix("BULWARK").load()?;
//! let pipeline = bulwark::bootstrap(&config)?.build();
//!
//! let create_user = Route::new(create_user).with_gate(validate(
//!     SchemaBundle::new().body(ObjectSchema::new().field("name", Field::string().required())),
//! ));
//!
//! let response = pipeline.dispatch(&mut ctx, request, Some(&create_user)).await;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Request → [RequestLogging] → ErrorNorm → Sections → user stages → Validation → Handler
//!                                 ↑                                                 │
//!                                 └──────────────── Err(RawError) ──────────────────┘
//! ```

#![doc(html_root_url = "https://docs.rs/bulwark/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Re-export core types
pub use bulwark_core as core;

// Re-export configuration
pub use bulwark_config as config;

// Re-export logging setup
pub use bulwark_telemetry as telemetry;

// Re-export the pipeline
pub use bulwark_middleware as middleware;

use bulwark_config::BulwarkConfig;
use bulwark_middleware::pipeline::{Pipeline, PipelineBuilder};
use bulwark_telemetry::TelemetryResult;

/// Installs logging for `config` and returns a pipeline builder for the
/// same environment.
///
/// # Errors
///
/// Returns `TelemetryError` if the log filter is invalid or a global
/// subscriber has already been installed.
pub fn bootstrap(config: &BulwarkConfig) -> TelemetryResult<PipelineBuilder> {
    bulwark_telemetry::init_telemetry(config)?;
    Ok(Pipeline::from_config(config))
}

/// Prelude module for convenient imports.
///
/// # Example
///
/// ```rust,ignore
/// use bulwark::prelude::*;
/// ```
pub mod prelude {
    pub use bulwark_core::{ApiError, ApiResult, ErrorBody, RawError, RequestId};

    // Configuration
    pub use bulwark_config::{BulwarkConfig, ConfigLoader, Environment};

    // Pipeline and routes
    pub use bulwark_middleware::{
        endpoint_not_found, validate, BoxFuture, HandlerResult, Middleware, MiddlewareContext,
        Next, Pipeline, PipelineBuilder, Request, Response, ResponseExt, Route, RouteRequest,
        SchemaBundle, ValidationGate,
    };

    // Schemas
    pub use bulwark_middleware::{Field, ObjectSchema, Section, UnknownKeys, Validator, Violation};
}
