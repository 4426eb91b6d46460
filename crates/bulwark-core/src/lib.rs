//! # Bulwark Core
//!
//! Core types for the Bulwark request-handling pipeline.
//!
//! This crate provides the foundational types shared by every other Bulwark crate:
//!
//! - [`ApiError`] - The canonical error shape (status, message, operational flag, trace)
//! - [`RawError`] - Any error value a request can fail with, before classification
//! - [`ErrorBody`] - The JSON wire format written for failed requests
//! - [`RequestId`] - UUID v7 request identifier

#![doc(html_root_url = "https://docs.rs/bulwark-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod context;
mod error;

pub use context::RequestId;
pub use error::{reason_phrase, ApiError, ApiResult, ErrorBody, RawError};
