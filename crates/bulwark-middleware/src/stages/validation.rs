//! Request validation gate.
//!
//! A [`ValidationGate`] checks a request's `params`, `query` and `body`
//! against the validators of a [`SchemaBundle`] before the handler runs.
//! Only the sections the bundle declares are looked at. Every violation in
//! every declared section is collected; on failure the gate raises one
//! `400` operational error whose message joins them all with `", "`. On
//! success the validated values replace the sections in the context, so
//! the handler sees trimmed strings, converted numbers and filled defaults.
//!
//! # Example
//!
//! ```
//! use bulwark_middleware::schema::{Field, ObjectSchema};
//! use bulwark_middleware::stages::validation::{validate, SchemaBundle};
//! use bulwark_middleware::context::MiddlewareContext;
//! use bulwark_middleware::sections::Section;
//! use serde_json::json;
//!
//! let gate = validate(
//!     SchemaBundle::new()
//!         .body(ObjectSchema::new().field("name", Field::string().required())),
//! );
//!
//! let mut ctx = MiddlewareContext::new();
//! ctx.sections_mut().set(Section::Body, json!({}));
//!
//! let failure = gate.check(ctx.sections()).unwrap_err();
//! assert_eq!(failure.message(), "\"name\" is required");
//! ```

use crate::{
    context::MiddlewareContext,
    middleware::{BoxFuture, Middleware, Next},
    schema::{Validator, Violation},
    sections::{RequestSections, Section},
    types::{HandlerResult, Request},
};
use bulwark_core::{ApiError, RawError};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Validators for up to three request sections.
///
/// A section without a validator is not validated and not rewritten.
#[derive(Clone, Default)]
pub struct SchemaBundle {
    params: Option<Arc<dyn Validator>>,
    query: Option<Arc<dyn Validator>>,
    body: Option<Arc<dyn Validator>>,
}

impl fmt::Debug for SchemaBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaBundle")
            .field("sections", &self.sections().collect::<Vec<_>>())
            .finish()
    }
}

impl SchemaBundle {
    /// Creates an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the validator for path parameters.
    #[must_use]
    pub fn params(self, validator: impl Validator) -> Self {
        self.with(Section::Params, validator)
    }

    /// Sets the validator for the query string.
    #[must_use]
    pub fn query(self, validator: impl Validator) -> Self {
        self.with(Section::Query, validator)
    }

    /// Sets the validator for the body.
    #[must_use]
    pub fn body(self, validator: impl Validator) -> Self {
        self.with(Section::Body, validator)
    }

    /// Sets the validator for a section.
    #[must_use]
    pub fn with(mut self, section: Section, validator: impl Validator) -> Self {
        let validator: Arc<dyn Validator> = Arc::new(validator);
        match section {
            Section::Params => self.params = Some(validator),
            Section::Query => self.query = Some(validator),
            Section::Body => self.body = Some(validator),
        }
        self
    }

    /// Returns the validator for a section, if declared.
    #[must_use]
    pub fn get(&self, section: Section) -> Option<&dyn Validator> {
        match section {
            Section::Params => self.params.as_deref(),
            Section::Query => self.query.as_deref(),
            Section::Body => self.body.as_deref(),
        }
    }

    /// Returns the declared sections in validation order.
    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        Section::ALL
            .into_iter()
            .filter(|section| self.get(*section).is_some())
    }

    /// Returns `true` if no section is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sections().next().is_none()
    }
}

/// Validated values of the declared sections.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSections {
    values: Vec<(Section, Value)>,
}

impl ValidatedSections {
    /// Returns the validated value of a section, if it was declared.
    #[must_use]
    pub fn get(&self, section: Section) -> Option<&Value> {
        self.values
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, value)| value)
    }

    /// Writes every validated value over its section.
    pub fn apply_to(self, sections: &mut RequestSections) {
        for (section, value) in self.values {
            sections.set(section, value);
        }
    }
}

/// A request failed validation.
///
/// Displays as every violation message, in order, joined with `", "`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ValidationFailure {
    violations: Vec<Violation>,
    message: String,
}

impl ValidationFailure {
    /// Creates a failure from its violations.
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        let message = violations
            .iter()
            .map(|v| v.message.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            violations,
            message,
        }
    }

    /// Returns every violation, in reported order.
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Returns the joined message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<ValidationFailure> for ApiError {
    #[track_caller]
    fn from(failure: ValidationFailure) -> Self {
        ApiError::bad_request(failure.message)
    }
}

impl From<ValidationFailure> for RawError {
    #[track_caller]
    fn from(failure: ValidationFailure) -> Self {
        RawError::Api(failure.into())
    }
}

/// Creates a validation gate for a route.
///
/// The bundle is fixed here and shared by every request the gate checks.
#[must_use]
pub fn validate(bundle: SchemaBundle) -> ValidationGate {
    ValidationGate::new(bundle)
}

/// Validates request sections against a [`SchemaBundle`].
#[derive(Debug, Clone)]
pub struct ValidationGate {
    bundle: Arc<SchemaBundle>,
}

impl ValidationGate {
    /// Creates a gate for a bundle.
    #[must_use]
    pub fn new(bundle: SchemaBundle) -> Self {
        Self {
            bundle: Arc::new(bundle),
        }
    }

    /// Returns the bundle this gate enforces.
    #[must_use]
    pub fn bundle(&self) -> &SchemaBundle {
        &self.bundle
    }

    /// Validates every declared section.
    ///
    /// Violations of all sections are collected before deciding; the
    /// sections themselves are left untouched.
    pub fn check(&self, sections: &RequestSections) -> Result<ValidatedSections, ValidationFailure> {
        let mut values = Vec::new();
        let mut violations = Vec::new();

        for section in self.bundle.sections() {
            let Some(validator) = self.bundle.get(section) else {
                continue;
            };
            match validator.validate_as(section.as_str(), sections.get(section)) {
                Ok(value) => values.push((section, value)),
                Err(found) => {
                    violations.extend(found.into_iter().map(|v| v.in_section(section)));
                }
            }
        }

        if violations.is_empty() {
            Ok(ValidatedSections { values })
        } else {
            Err(ValidationFailure::new(violations))
        }
    }

    /// Validates the context's sections and, on success, replaces them with
    /// their validated values.
    ///
    /// Nothing is written unless every declared section passed.
    #[track_caller]
    pub fn apply(&self, ctx: &mut MiddlewareContext) -> Result<(), RawError> {
        let validated = self.check(ctx.sections())?;
        validated.apply_to(ctx.sections_mut());
        Ok(())
    }
}

impl Middleware for ValidationGate {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn process<'a>(
        &'a self,
        ctx: &'a mut MiddlewareContext,
        request: Request,
        next: Next<'a>,
    ) -> BoxFuture<'a, HandlerResult> {
        Box::pin(async move {
            self.apply(ctx)?;
            next.run(ctx, request).await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Field, ObjectSchema};
    use crate::types::{Response, ResponseExt};
    use bytes::Bytes;
    use http::{Request as HttpRequest, StatusCode};
    use http_body_util::Full;
    use serde_json::json;

    fn sections(params: Value, query: Value, body: Value) -> RequestSections {
        let mut sections = RequestSections::new();
        sections.set(Section::Params, params);
        sections.set(Section::Query, query);
        sections.set(Section::Body, body);
        sections
    }

    fn create_user_gate() -> ValidationGate {
        validate(
            SchemaBundle::new()
                .params(ObjectSchema::new().field("orgId", Field::integer().required()))
                .body(
                    ObjectSchema::new()
                        .field("name", Field::string().trim().required())
                        .field("role", Field::string().valid(["admin", "user"]).default(json!("user"))),
                ),
        )
    }

    #[test]
    fn test_bundle_sections() {
        let bundle = SchemaBundle::new()
            .body(ObjectSchema::new())
            .params(ObjectSchema::new());
        let declared: Vec<_> = bundle.sections().collect();
        assert_eq!(declared, vec![Section::Params, Section::Body]);
        assert!(!bundle.is_empty());
        assert!(SchemaBundle::new().is_empty());
    }

    #[test]
    fn test_undeclared_sections_are_ignored() {
        let gate = validate(
            SchemaBundle::new()
                .body(ObjectSchema::new().field("name", Field::string().required())),
        );

        let input = sections(json!({}), json!({"page": "not-a-number", "junk": 1}), json!({"name": "Ada"}));
        let validated = gate.check(&input).unwrap();

        assert_eq!(validated.get(Section::Body), Some(&json!({"name": "Ada"})));
        assert!(validated.get(Section::Query).is_none());
    }

    #[test]
    fn test_violations_from_all_sections_are_joined() {
        let gate = create_user_gate();
        let input = sections(json!({"orgId": "abc"}), json!({}), json!({"role": "root"}));

        let failure = gate.check(&input).unwrap_err();
        assert_eq!(
            failure.message(),
            "\"orgId\" must be a number, \"name\" is required, \"role\" must be one of [admin, user]"
        );

        let sections: Vec<_> = failure.violations().iter().map(|v| v.section).collect();
        assert_eq!(
            sections,
            vec![Some(Section::Params), Some(Section::Body), Some(Section::Body)]
        );
    }

    #[test]
    fn test_failure_becomes_operational_bad_request() {
        let failure = ValidationFailure::new(vec![Violation::new("name", "\"name\" is required")]);
        let error = ApiError::from(failure);
        assert_eq!(error.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(error.message(), "\"name\" is required");
        assert!(error.is_operational());
    }

    #[test]
    fn test_apply_writes_back_validated_values() {
        let gate = create_user_gate();
        let mut ctx = MiddlewareContext::new();
        ctx.set_path_param("orgId", "12");
        ctx.sections_mut().set(Section::Body, json!({"name": "  Ada "}));
        ctx.sections_mut().set(Section::Query, json!({"q": "x"}));

        gate.apply(&mut ctx).unwrap();

        assert_eq!(ctx.sections().params(), &json!({"orgId": 12}));
        assert_eq!(ctx.sections().body(), &json!({"name": "Ada", "role": "user"}));
        assert_eq!(ctx.sections().query(), &json!({"q": "x"}));
    }

    #[test]
    fn test_apply_failure_writes_nothing() {
        let gate = create_user_gate();
        let mut ctx = MiddlewareContext::new();
        ctx.set_path_param("orgId", "12");
        ctx.sections_mut().set(Section::Body, json!({}));

        let error = gate.apply(&mut ctx).unwrap_err();
        assert_eq!(error.status_code(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(ctx.sections().params(), &json!({"orgId": "12"}));
    }

    #[test]
    fn test_non_object_body_is_labelled_with_section() {
        let gate = validate(SchemaBundle::new().body(ObjectSchema::new()));
        let input = sections(json!({}), json!({}), json!([1, 2, 3]));
        let failure = gate.check(&input).unwrap_err();
        assert_eq!(failure.message(), "\"body\" must be of type object");
    }

    #[tokio::test]
    async fn test_gate_as_middleware() {
        let gate = create_user_gate();
        let mut ctx = MiddlewareContext::new();
        ctx.set_path_param("orgId", "7");
        ctx.sections_mut().set(Section::Body, json!({"name": "Ada"}));

        let request = HttpRequest::builder()
            .uri("/orgs/7/users")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let next = Next::handler(|ctx, _req| {
            let body = ctx.sections().body().clone();
            Box::pin(async move { Ok(Response::json(StatusCode::CREATED, &body)) })
        });

        let response = gate.process(&mut ctx, request, next).await.unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(ctx.sections().body()["role"], json!("user"));
    }

    #[tokio::test]
    async fn test_gate_as_middleware_short_circuits() {
        let gate = create_user_gate();
        let mut ctx = MiddlewareContext::new();

        let request = HttpRequest::builder()
            .uri("/orgs/x/users")
            .body(Full::new(Bytes::new()))
            .unwrap();

        let next = Next::handler(|_ctx, _req| -> BoxFuture<'static, HandlerResult> {
            panic!("handler must not run")
        });

        let error = gate.process(&mut ctx, request, next).await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "\"orgId\" is required, \"name\" is required"
        );
    }
}
