use super::{label, ObjectSchema, Validator, Violation};
use regex::Regex;
use serde_json::{Number, Value};

#[derive(Debug, Clone)]
enum Kind {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object(ObjectSchema),
    Any,
}

/// A typed field rule.
///
/// Values are converted before rules are checked: numeric strings become
/// numbers, `"true"`/`"false"` become booleans and strings are trimmed or
/// lowercased when asked to. Every failed rule becomes a [`Violation`]
/// labelled with the field's key.
#[derive(Debug, Clone)]
pub struct Field {
    kind: Kind,
    required: bool,
    default: Option<Value>,
    trim: bool,
    lowercase: bool,
    allow_empty: bool,
    single: bool,
    min: Option<f64>,
    max: Option<f64>,
    valid: Vec<Value>,
    pattern: Option<Regex>,
    items: Option<Box<Field>>,
}

impl Field {
    fn of(kind: Kind) -> Self {
        Self {
            kind,
            required: false,
            default: None,
            trim: false,
            lowercase: false,
            allow_empty: false,
            single: false,
            min: None,
            max: None,
            valid: Vec::new(),
            pattern: None,
            items: None,
        }
    }

    /// A string field.
    #[must_use]
    pub fn string() -> Self {
        Self::of(Kind::String)
    }

    /// An integer field. Accepts integral numbers and integer strings.
    #[must_use]
    pub fn integer() -> Self {
        Self::of(Kind::Integer)
    }

    /// A number field. Accepts numbers and numeric strings.
    #[must_use]
    pub fn number() -> Self {
        Self::of(Kind::Number)
    }

    /// A boolean field. Accepts booleans and `"true"`/`"false"`.
    #[must_use]
    pub fn boolean() -> Self {
        Self::of(Kind::Boolean)
    }

    /// An array field.
    #[must_use]
    pub fn array() -> Self {
        Self::of(Kind::Array)
    }

    /// A nested object field.
    #[must_use]
    pub fn object(schema: ObjectSchema) -> Self {
        Self::of(Kind::Object(schema))
    }

    /// A field that accepts any value.
    #[must_use]
    pub fn any() -> Self {
        Self::of(Kind::Any)
    }

    /// The key must be present.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Value used when the key is absent.
    #[must_use]
    pub fn default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Trim surrounding whitespace from strings before checking.
    #[must_use]
    pub fn trim(mut self) -> Self {
        self.trim = true;
        self
    }

    /// Lowercase strings before checking.
    #[must_use]
    pub fn lowercase(mut self) -> Self {
        self.lowercase = true;
        self
    }

    /// Accept the empty string.
    #[must_use]
    pub fn allow_empty(mut self) -> Self {
        self.allow_empty = true;
        self
    }

    /// Wrap a lone value into a one-element array.
    ///
    /// Useful for query parameters, where `?tag=a` and `?tag=a&tag=b`
    /// arrive as a string and an array respectively.
    #[must_use]
    pub fn single(mut self) -> Self {
        self.single = true;
        self
    }

    /// Minimum string length, numeric value or item count.
    #[must_use]
    pub fn min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    /// Maximum string length, numeric value or item count.
    #[must_use]
    pub fn max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    /// Restrict the value to a fixed set.
    #[must_use]
    pub fn valid<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.valid = values.into_iter().map(Into::into).collect();
        self
    }

    /// Strings must match `pattern`.
    #[must_use]
    pub fn pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    /// Rule applied to every array item.
    #[must_use]
    pub fn items(mut self, items: Field) -> Self {
        self.items = Some(Box::new(items));
        self
    }

    /// Checks the value found under `key`, or its absence.
    ///
    /// Returns the value to keep, or `None` when the key should be omitted
    /// or the value failed.
    pub(crate) fn check(
        &self,
        key: &str,
        path: &str,
        value: Option<&Value>,
        violations: &mut Vec<Violation>,
    ) -> Option<Value> {
        let Some(value) = value else {
            if let Some(default) = &self.default {
                return Some(default.clone());
            }
            if self.required {
                violations.push(Violation::new(path, format!("{} is required", label(key))));
            }
            return None;
        };

        let before = violations.len();
        let converted = self.convert(key, path, value, violations)?;

        if !self.valid.is_empty() {
            if !self.valid.contains(&converted) {
                let allowed: Vec<String> = self.valid.iter().map(display_value).collect();
                violations.push(Violation::new(
                    path,
                    format!("{} must be one of [{}]", label(key), allowed.join(", ")),
                ));
            }
        } else {
            self.check_rules(key, path, &converted, violations);
        }

        (violations.len() == before).then_some(converted)
    }

    fn convert(
        &self,
        key: &str,
        path: &str,
        value: &Value,
        violations: &mut Vec<Violation>,
    ) -> Option<Value> {
        let mismatch = |violations: &mut Vec<Violation>, expected: &str| -> Option<Value> {
            violations.push(Violation::new(
                path,
                format!("{} must be {expected}", label(key)),
            ));
            None
        };

        match &self.kind {
            Kind::Any => Some(value.clone()),
            Kind::String => match value {
                Value::String(s) => {
                    let mut s = if self.trim { s.trim().to_string() } else { s.clone() };
                    if self.lowercase {
                        s = s.to_lowercase();
                    }
                    Some(Value::String(s))
                }
                _ => mismatch(violations, "a string"),
            },
            Kind::Boolean => match value {
                Value::Bool(_) => Some(value.clone()),
                Value::String(s) if s.eq_ignore_ascii_case("true") => Some(Value::Bool(true)),
                Value::String(s) if s.eq_ignore_ascii_case("false") => Some(Value::Bool(false)),
                _ => mismatch(violations, "a boolean"),
            },
            Kind::Number => match to_number(value) {
                Some(n) => Some(Value::Number(n)),
                None => mismatch(violations, "a number"),
            },
            Kind::Integer => match to_number(value) {
                Some(n) => match to_integer(&n) {
                    Some(i) => Some(Value::Number(i)),
                    None => mismatch(violations, "an integer"),
                },
                None => mismatch(violations, "a number"),
            },
            Kind::Object(schema) => {
                if value.is_object() {
                    let before = violations.len();
                    let checked = schema.check(key, path, value, violations);
                    (violations.len() == before).then_some(checked)
                } else {
                    mismatch(violations, "of type object")
                }
            }
            Kind::Array => {
                let items = match value {
                    Value::Array(items) => items.clone(),
                    other if self.single => vec![other.clone()],
                    _ => return mismatch(violations, "an array"),
                };

                let Some(rule) = &self.items else {
                    return Some(Value::Array(items));
                };

                let before = violations.len();
                let mut converted = Vec::with_capacity(items.len());
                for (index, item) in items.iter().enumerate() {
                    let item_key = format!("[{index}]");
                    let item_path = format!("{path}{item_key}");
                    if let Some(item) = rule.check(&item_key, &item_path, Some(item), violations) {
                        converted.push(item);
                    }
                }
                (violations.len() == before).then_some(Value::Array(converted))
            }
        }
    }

    fn check_rules(&self, key: &str, path: &str, value: &Value, violations: &mut Vec<Violation>) {
        let mut fail = |message: String| violations.push(Violation::new(path, message));
        let label = label(key);

        match value {
            Value::String(s) => {
                if s.is_empty() && !self.allow_empty {
                    fail(format!("{label} is not allowed to be empty"));
                    return;
                }
                let length = s.chars().count() as f64;
                if let Some(min) = self.min.filter(|min| length < *min) {
                    fail(format!(
                        "{label} length must be at least {} characters long",
                        display_limit(min)
                    ));
                }
                if let Some(max) = self.max.filter(|max| length > *max) {
                    fail(format!(
                        "{label} length must be less than or equal to {} characters long",
                        display_limit(max)
                    ));
                }
                if let Some(pattern) = self.pattern.as_ref().filter(|p| !p.is_match(s)) {
                    fail(format!(
                        "{label} with value \"{s}\" fails to match the required pattern: /{}/",
                        pattern.as_str()
                    ));
                }
            }
            Value::Number(n) if matches!(self.kind, Kind::Number | Kind::Integer) => {
                let n = n.as_f64().unwrap_or(f64::NAN);
                if let Some(min) = self.min.filter(|min| n < *min) {
                    fail(format!(
                        "{label} must be greater than or equal to {}",
                        display_limit(min)
                    ));
                }
                if let Some(max) = self.max.filter(|max| n > *max) {
                    fail(format!(
                        "{label} must be less than or equal to {}",
                        display_limit(max)
                    ));
                }
            }
            Value::Array(items) if matches!(self.kind, Kind::Array) => {
                let count = items.len() as f64;
                if let Some(min) = self.min.filter(|min| count < *min) {
                    fail(format!(
                        "{label} must contain at least {} items",
                        display_limit(min)
                    ));
                }
                if let Some(max) = self.max.filter(|max| count > *max) {
                    fail(format!(
                        "{label} must contain less than or equal to {} items",
                        display_limit(max)
                    ));
                }
            }
            _ => {}
        }
    }
}

impl Validator for Field {
    fn validate(&self, value: &Value) -> Result<Value, Vec<Violation>> {
        self.validate_as("value", value)
    }

    fn validate_as(&self, key: &str, value: &Value) -> Result<Value, Vec<Violation>> {
        let mut violations = Vec::new();
        let checked = self.check(key, "", Some(value), &mut violations);
        if violations.is_empty() {
            Ok(checked.unwrap_or(Value::Null))
        } else {
            Err(violations)
        }
    }
}

fn to_number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                Some(Number::from(i))
            } else {
                s.parse::<f64>().ok().and_then(Number::from_f64)
            }
        }
        _ => None,
    }
}

fn to_integer(n: &Number) -> Option<Number> {
    if n.is_i64() || n.is_u64() {
        return Some(n.clone());
    }
    n.as_f64()
        .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
        .map(|f| Number::from(f as i64))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn display_limit(limit: f64) -> String {
    if limit.fract() == 0.0 && limit.abs() < 1e15 {
        format!("{}", limit as i64)
    } else {
        limit.to_string()
    }
}
