use super::{join_path, label, Field, Validator, Violation};
use indexmap::IndexMap;
use serde_json::{Map, Value};

/// What to do with keys a schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    /// Report each one as `"key" is not allowed`.
    #[default]
    Deny,
    /// Keep them unchanged.
    Allow,
    /// Drop them from the validated value.
    Strip,
}

/// An object whose keys are checked against declared fields.
///
/// Fields are checked in declaration order, then undeclared keys in input
/// order. The validated object lists declared keys first.
#[derive(Debug, Clone, Default)]
pub struct ObjectSchema {
    fields: IndexMap<String, Field>,
    unknown: UnknownKeys,
}

impl ObjectSchema {
    /// Creates an empty schema that denies unknown keys.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a field.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.insert(name.into(), field);
        self
    }

    /// Sets the unknown-key policy.
    #[must_use]
    pub fn unknown(mut self, policy: UnknownKeys) -> Self {
        self.unknown = policy;
        self
    }

    /// Returns the declared field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Checks an object found under `key` at `path`.
    ///
    /// Always returns a value so nested callers can keep going; whether it
    /// is usable depends on whether violations were added.
    pub(crate) fn check(
        &self,
        key: &str,
        path: &str,
        value: &Value,
        violations: &mut Vec<Violation>,
    ) -> Value {
        let Value::Object(input) = value else {
            violations.push(Violation::new(
                path,
                format!("{} must be of type object", label(key)),
            ));
            return Value::Null;
        };

        let mut output = Map::new();

        for (name, field) in &self.fields {
            let child = join_path(path, name);
            if let Some(value) = field.check(name, &child, input.get(name), violations) {
                output.insert(name.clone(), value);
            }
        }

        for (name, value) in input {
            if self.fields.contains_key(name) {
                continue;
            }
            match self.unknown {
                UnknownKeys::Deny => violations.push(Violation::new(
                    join_path(path, name),
                    format!("{} is not allowed", label(name)),
                )),
                UnknownKeys::Allow => {
                    output.insert(name.clone(), value.clone());
                }
                UnknownKeys::Strip => {}
            }
        }

        Value::Object(output)
    }
}

impl Validator for ObjectSchema {
    fn validate(&self, value: &Value) -> Result<Value, Vec<Violation>> {
        self.validate_as("value", value)
    }

    fn validate_as(&self, key: &str, value: &Value) -> Result<Value, Vec<Violation>> {
        let mut violations = Vec::new();
        let checked = self.check(key, "", value, &mut violations);
        if violations.is_empty() {
            Ok(checked)
        } else {
            Err(violations)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user_schema() -> ObjectSchema {
        ObjectSchema::new()
            .field("name", Field::string().required())
            .field("email", Field::string().trim().lowercase().required())
            .field("role", Field::string().valid(["admin", "user"]).default(json!("user")))
    }

    #[test]
    fn test_valid_object_is_converted() {
        let value = user_schema()
            .validate(&json!({"email": " Ada@Example.com", "name": "Ada"}))
            .unwrap();

        assert_eq!(
            value,
            json!({"name": "Ada", "email": "ada@example.com", "role": "user"})
        );
        let keys: Vec<_> = value.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["name", "email", "role"]);
    }

    #[test]
    fn test_all_violations_are_reported_in_order() {
        let violations = user_schema()
            .validate(&json!({"role": "root", "debug": true}))
            .unwrap_err();

        let messages: Vec<_> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "\"name\" is required",
                "\"email\" is required",
                "\"role\" must be one of [admin, user]",
                "\"debug\" is not allowed",
            ]
        );
    }

    #[test]
    fn test_unknown_key_policies() {
        let input = json!({"name": "Ada", "email": "a@b.c", "debug": true});

        let allowed = user_schema().unknown(UnknownKeys::Allow).validate(&input).unwrap();
        assert_eq!(allowed["debug"], json!(true));

        let stripped = user_schema().unknown(UnknownKeys::Strip).validate(&input).unwrap();
        assert!(stripped.get("debug").is_none());
    }

    #[test]
    fn test_non_object_input() {
        let violations = user_schema().validate_as("body", &json!([1, 2])).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].message, "\"body\" must be of type object");
        assert_eq!(violations[0].path, "");
    }

    #[test]
    fn test_nested_objects() {
        let schema = ObjectSchema::new().field(
            "address",
            Field::object(
                ObjectSchema::new()
                    .field("city", Field::string().required())
                    .field("zip", Field::string().pattern(regex::Regex::new(r"^\d{5}$").unwrap())),
            )
            .required(),
        );

        let violations = schema
            .validate(&json!({"address": {"zip": "abc"}}))
            .unwrap_err();

        assert_eq!(violations[0].path, "address.city");
        assert_eq!(violations[0].message, "\"city\" is required");
        assert_eq!(violations[1].path, "address.zip");
        assert_eq!(
            violations[1].message,
            "\"zip\" with value \"abc\" fails to match the required pattern: /^\\d{5}$/"
        );

        let violations = schema.validate(&json!({"address": "Main St"})).unwrap_err();
        assert_eq!(violations[0].message, "\"address\" must be of type object");
    }

    #[test]
    fn test_field_names() {
        let schema = user_schema();
        let names: Vec<_> = schema.field_names().collect();
        assert_eq!(names, vec!["name", "email", "role"]);
    }
}
