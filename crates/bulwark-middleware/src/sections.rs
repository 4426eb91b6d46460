//! Request sections.
//!
//! A request exposes three independently validated sections: the path
//! `params` supplied by the dispatch layer, the parsed `query` string and
//! the decoded `body`. Validation gates read and overwrite them here.

use bulwark_core::RawError;
use http::header::{HeaderMap, CONTENT_TYPE};
use http::StatusCode;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// One of the three validated request sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Section {
    /// Path parameters.
    Params,
    /// Query string.
    Query,
    /// Request body.
    Body,
}

impl Section {
    /// All sections, in validation order.
    pub const ALL: [Section; 3] = [Section::Params, Section::Query, Section::Body];

    /// Returns the section name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Params => "params",
            Self::Query => "query",
            Self::Body => "body",
        }
    }
}

impl Serialize for Section {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request's params, query and body as JSON values.
///
/// Every section starts as an empty object.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSections {
    params: Value,
    query: Value,
    body: Value,
}

impl Default for RequestSections {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestSections {
    /// Creates sections that are all empty objects.
    #[must_use]
    pub fn new() -> Self {
        Self {
            params: Value::Object(Map::new()),
            query: Value::Object(Map::new()),
            body: Value::Object(Map::new()),
        }
    }

    /// Returns a section by name.
    #[must_use]
    pub fn get(&self, section: Section) -> &Value {
        match section {
            Section::Params => &self.params,
            Section::Query => &self.query,
            Section::Body => &self.body,
        }
    }

    /// Replaces a section.
    pub fn set(&mut self, section: Section, value: Value) {
        match section {
            Section::Params => self.params = value,
            Section::Query => self.query = value,
            Section::Body => self.body = value,
        }
    }

    /// Returns the path parameters.
    #[must_use]
    pub fn params(&self) -> &Value {
        &self.params
    }

    /// Returns the parsed query string.
    #[must_use]
    pub fn query(&self) -> &Value {
        &self.query
    }

    /// Returns the decoded body.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }
}

/// Parses a URL query string into a JSON object.
///
/// Values stay strings; a key that appears more than once becomes an array
/// of its values in order of appearance.
///
/// ```
/// use bulwark_middleware::sections::parse_query;
/// use serde_json::json;
///
/// let query = parse_query(Some("tag=a&tag=b&page=2")).unwrap();
/// assert_eq!(query, json!({"tag": ["a", "b"], "page": "2"}));
/// ```
pub fn parse_query(query: Option<&str>) -> Result<Value, RawError> {
    match query {
        None | Some("") => Ok(Value::Object(Map::new())),
        Some(query) => parse_urlencoded(query.as_bytes()).map_err(|e| {
            RawError::status(StatusCode::BAD_REQUEST, format!("Invalid query string: {e}"))
        }),
    }
}

/// Decodes a request body according to its content type.
///
/// JSON (`application/json` or any `+json` type) and
/// `application/x-www-form-urlencoded` bodies are decoded; an empty body
/// or any other content type leaves the section as an empty object.
pub fn parse_body(headers: &HeaderMap, body: &[u8]) -> Result<Value, RawError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }

    match BodyKind::from_headers(headers) {
        BodyKind::Json => serde_json::from_slice(body).map_err(|e| {
            RawError::status(StatusCode::BAD_REQUEST, format!("Invalid JSON body: {e}"))
        }),
        BodyKind::Form => parse_urlencoded(body).map_err(|e| {
            RawError::status(StatusCode::BAD_REQUEST, format!("Invalid form body: {e}"))
        }),
        BodyKind::Other => Ok(Value::Object(Map::new())),
    }
}

/// How a body is decoded, by content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
    Other,
}

impl BodyKind {
    fn from_headers(headers: &HeaderMap) -> Self {
        let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
            return Self::Other;
        };
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();

        if essence == "application/json" || essence.ends_with("+json") {
            Self::Json
        } else if essence == "application/x-www-form-urlencoded" {
            Self::Form
        } else {
            Self::Other
        }
    }
}

fn parse_urlencoded(input: &[u8]) -> Result<Value, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(input)?;
    let mut map = Map::new();

    for (key, value) in pairs {
        let value = Value::String(value);
        match map.get_mut(&key) {
            None => {
                map.insert(key, value);
            }
            Some(Value::Array(values)) => values.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
        }
    }

    Ok(Value::Object(map))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn content_type(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(value));
        headers
    }

    fn form_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded; charset=utf-8"),
        );
        headers
    }

    #[test]
    fn test_section_order_and_names() {
        let names: Vec<_> = Section::ALL.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["params", "query", "body"]);
        assert_eq!(Section::Body.to_string(), "body");
    }

    #[test]
    fn test_get_and_set() {
        let mut sections = RequestSections::new();
        sections.set(Section::Body, json!({"name": "a"}));
        assert_eq!(sections.get(Section::Body), &json!({"name": "a"}));
        assert_eq!(sections.get(Section::Query), &json!({}));
    }

    #[test]
    fn test_parse_query_empty() {
        assert_eq!(parse_query(None).unwrap(), json!({}));
        assert_eq!(parse_query(Some("")).unwrap(), json!({}));
    }

    #[test]
    fn test_parse_query_decodes_and_groups() {
        let query = parse_query(Some("q=hello%20world&sort=asc&sort=desc&sort=name")).unwrap();
        assert_eq!(
            query,
            json!({"q": "hello world", "sort": ["asc", "desc", "name"]})
        );
    }

    #[test]
    fn test_parse_body_empty_is_object() {
        assert_eq!(parse_body(&HeaderMap::new(), b"").unwrap(), json!({}));
        assert_eq!(parse_body(&HeaderMap::new(), b"  \n").unwrap(), json!({}));
    }

    #[test]
    fn test_parse_body_json() {
        let body = parse_body(&content_type("application/json"), br#"{"name":"Ada","age":36}"#)
            .unwrap();
        assert_eq!(body, json!({"name": "Ada", "age": 36}));

        let body = parse_body(
            &content_type("application/merge-patch+json; charset=utf-8"),
            br#"{"role":null}"#,
        )
        .unwrap();
        assert_eq!(body, json!({"role": null}));
    }

    #[test]
    fn test_parse_body_other_content_types_are_empty() {
        for value in ["text/plain", "application/octet-stream", "multipart/form-data; boundary=x"] {
            assert_eq!(parse_body(&content_type(value), b"hello").unwrap(), json!({}), "{value}");
        }
        assert_eq!(parse_body(&HeaderMap::new(), b"{\"name\":").unwrap(), json!({}));
    }

    #[test]
    fn test_parse_body_form() {
        let body = parse_body(&form_headers(), b"name=Ada+Lovelace&role=admin").unwrap();
        assert_eq!(body, json!({"name": "Ada Lovelace", "role": "admin"}));
    }

    #[test]
    fn test_parse_body_malformed_json() {
        let error = parse_body(&content_type("Application/JSON"), b"{\"name\":").unwrap_err();
        assert_eq!(error.status_code(), Some(StatusCode::BAD_REQUEST));
        assert!(error.to_string().starts_with("Invalid JSON body"));
    }
}
