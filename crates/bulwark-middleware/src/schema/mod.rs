//! Declarative validators for request sections.
//!
//! A [`Validator`] checks a JSON value and returns either the validated
//! value (with conversions and defaults applied) or every [`Violation`] it
//! found. It never stops at the first problem.
//!
//! [`ObjectSchema`] and [`Field`] cover the common case:
//!
//! ```
//! use bulwark_middleware::schema::{Field, ObjectSchema, Validator};
//! use serde_json::json;
//!
//! let schema = ObjectSchema::new()
//!     .field("name", Field::string().trim().required())
//!     .field("age", Field::integer().min(0.0))
//!     .field("role", Field::string().valid(["admin", "user"]).default(json!("user")));
//!
//! let value = schema.validate(&json!({"name": " Ada ", "age": "36"})).unwrap();
//! assert_eq!(value, json!({"name": "Ada", "age": 36, "role": "user"}));
//!
//! let violations = schema.validate(&json!({"age": -1, "extra": true})).unwrap_err();
//! let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
//! assert_eq!(
//!     messages,
//!     vec![
//!         "\"name\" is required",
//!         "\"age\" must be greater than or equal to 0",
//!         "\"extra\" is not allowed",
//!     ]
//! );
//! ```

mod field;
mod object;

pub use field::Field;
pub use object::{ObjectSchema, UnknownKeys};

use crate::sections::Section;
use serde::Serialize;
use serde_json::Value;

/// A single validation problem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The request section the value came from, once known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
    /// Location of the offending value inside its section (`address.city`,
    /// `tags[0]`); empty for the section itself.
    pub path: String,
    /// Human-readable message, labelled with the offending key.
    pub message: String,
}

impl Violation {
    /// Creates a violation without a section.
    #[must_use]
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            section: None,
            path: path.into(),
            message: message.into(),
        }
    }

    /// Attributes the violation to a request section.
    #[must_use]
    pub fn in_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }
}

/// Something that can validate one request section.
pub trait Validator: Send + Sync + 'static {
    /// Validates `value`, returning the converted value or every violation.
    fn validate(&self, value: &Value) -> Result<Value, Vec<Violation>>;

    /// Validates `value` as if it were found under `key`.
    ///
    /// Messages about the value as a whole are labelled with `key`; a
    /// validation gate passes the section name here.
    fn validate_as(&self, key: &str, value: &Value) -> Result<Value, Vec<Violation>> {
        let _ = key;
        self.validate(value)
    }
}

impl<F> Validator for F
where
    F: Fn(&Value) -> Result<Value, Vec<Violation>> + Send + Sync + 'static,
{
    fn validate(&self, value: &Value) -> Result<Value, Vec<Violation>> {
        self(value)
    }
}

/// Quotes a key the way violation messages label it.
pub(crate) fn label(key: &str) -> String {
    format!("\"{key}\"")
}

/// Joins a parent path and a key.
pub(crate) fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}
