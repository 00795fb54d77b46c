//! A small rule-based [`Schema`] for JSON objects.
//!
//! Covers what simple forms need: required fields, allowed values, lengths,
//! patterns, emails and rules that depend on sibling fields. Rules run in
//! the order they were added and the first failing rule rejects the field.
//!
//! # Example
//!
//! ```
//! use formscope::schema::RuleSchema;
//! use serde_json::json;
//!
//! let schema = RuleSchema::new()
//!     .field("aNestedValue")
//!         .required()
//!     .field("aDependantValue")
//!         .required()
//!         .when("aNestedValue", |nested| vec![json!(format!("Hello {}", nested.as_str().unwrap_or_default()))])
//!     .build();
//!
//! assert_eq!(schema.paths().count(), 2);
//! ```

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use super::Schema;
use super::data::lookup;
use crate::error::{EngineError, FieldError, SchemaError};

static NULL: Value = Value::Null;

type Check = Box<dyn Fn(&str, &Value, &Value) -> Result<(), String> + Send + Sync>;

struct Rule {
    check: Check,
    /// Replaces the check's default message.
    message: Option<String>,
}

/// Rules for every field of a JSON object.
pub struct RuleSchema {
    fields: Vec<(String, Vec<Rule>)>,
}

impl RuleSchema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// Start adding rules for a field.
    pub fn field(self, path: impl Into<String>) -> FieldRules {
        FieldRules {
            schema: self,
            path: path.into(),
            rules: Vec::new(),
        }
    }

    /// Paths that have rules, in declaration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(path, _)| path.as_str())
    }

    fn rules_for(&self, path: &str) -> Option<&[Rule]> {
        self.fields
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, rules)| rules.as_slice())
    }
}

impl Default for RuleSchema {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Schema<Value> for RuleSchema {
    async fn validate_at(&self, path: &str, data: &Value) -> Result<(), SchemaError> {
        let Some(rules) = self.rules_for(path) else {
            return Err(EngineError::new(path, "the schema does not contain this path").into());
        };

        let value = lookup(data, path).unwrap_or(&NULL);
        for rule in rules {
            if let Err(default) = (rule.check)(path, value, data) {
                let message = rule.message.clone().unwrap_or(default);
                return Err(FieldError::new(path, message).into());
            }
        }
        Ok(())
    }
}

/// Builder for the rules of a single field.
pub struct FieldRules {
    schema: RuleSchema,
    path: String,
    rules: Vec<Rule>,
}

impl FieldRules {
    fn push<F>(mut self, check: F) -> Self
    where
        F: Fn(&str, &Value, &Value) -> Result<(), String> + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            check: Box::new(check),
            message: None,
        });
        self
    }

    /// Replace the message of the rule added last.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.message = Some(msg.into());
        }
        self
    }

    /// Add a custom rule on the field's value (`Null` when absent).
    pub fn rule<F>(self, f: F, msg: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        let msg = msg.into();
        self.push(move |_, value, _| if f(value) { Ok(()) } else { Err(msg.clone()) })
    }

    /// Add a custom rule that can also read the whole object.
    pub fn rule_with<F>(self, f: F, msg: impl Into<String>) -> Self
    where
        F: Fn(&Value, &Value) -> bool + Send + Sync + 'static,
    {
        let msg = msg.into();
        self.push(move |_, value, data| {
            if f(value, data) { Ok(()) } else { Err(msg.clone()) }
        })
    }

    /// Require a value: not missing, not null, not a blank string.
    pub fn required(self) -> Self {
        self.push(|path, value, _| {
            let present = match value {
                Value::Null => false,
                Value::String(s) => !s.trim().is_empty(),
                _ => true,
            };
            if present {
                Ok(())
            } else {
                Err(format!("{path} is a required field"))
            }
        })
    }

    /// Require the value to be one of `allowed`. Absent values pass.
    pub fn one_of<I, V>(self, allowed: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let allowed: Vec<Value> = allowed.into_iter().map(Into::into).collect();
        self.push(move |path, value, _| check_one_of(path, value, &allowed))
    }

    /// Require the value to be one of the values derived from a sibling field.
    ///
    /// This is how dependent fields are expressed: the allowed set is
    /// recomputed from the sibling's current value on every validation.
    pub fn when<F>(self, sibling: impl Into<String>, allowed: F) -> Self
    where
        F: Fn(&Value) -> Vec<Value> + Send + Sync + 'static,
    {
        let sibling = sibling.into();
        self.push(move |path, value, data| {
            let other = lookup(data, &sibling).unwrap_or(&NULL);
            check_one_of(path, value, &allowed(other))
        })
    }

    /// Require at least `min` characters. Non-strings pass.
    pub fn min_length(self, min: usize) -> Self {
        self.push(move |path, value, _| match value.as_str() {
            Some(s) if s.chars().count() < min => {
                Err(format!("{path} must be at least {min} characters"))
            }
            _ => Ok(()),
        })
    }

    /// Require at most `max` characters. Non-strings pass.
    pub fn max_length(self, max: usize) -> Self {
        self.push(move |path, value, _| match value.as_str() {
            Some(s) if s.chars().count() > max => {
                Err(format!("{path} must be at most {max} characters"))
            }
            _ => Ok(()),
        })
    }

    /// Require string values to match `re`.
    pub fn pattern(self, re: Regex) -> Self {
        self.push(move |path, value, _| match value.as_str() {
            Some(s) if !re.is_match(s) => {
                Err(format!("{path} must match the following: \"{}\"", re.as_str()))
            }
            _ => Ok(()),
        })
    }

    /// Require a valid email address. Empty strings pass; use `required()`.
    pub fn email(self) -> Self {
        self.push(|path, value, _| match value.as_str() {
            Some(s) if !s.is_empty() && !email_address::EmailAddress::is_valid(s) => {
                Err(format!("{path} must be a valid email"))
            }
            _ => Ok(()),
        })
    }

    /// Continue with the next field.
    pub fn field(self, path: impl Into<String>) -> FieldRules {
        self.build().field(path)
    }

    /// Finish the schema.
    pub fn build(self) -> RuleSchema {
        let mut schema = self.schema;
        schema.fields.push((self.path, self.rules));
        schema
    }
}

fn check_one_of(path: &str, value: &Value, allowed: &[Value]) -> Result<(), String> {
    if value.is_null() || allowed.contains(value) {
        return Ok(());
    }
    let listed: Vec<String> = allowed.iter().map(display_value).collect();
    Err(format!(
        "{path} must be one of the following values: {}",
        listed.join(", ")
    ))
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rejected(result: Result<(), SchemaError>) -> Vec<String> {
        match result {
            Err(SchemaError::Rejected(err)) => err.messages,
            other => panic!("expected a rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_one_of_message() {
        let schema = RuleSchema::new().field("aValue").required().one_of(["value"]).build();
        let result = schema.validate_at("aValue", &json!({ "aValue": "valu" })).await;
        assert_eq!(
            rejected(result),
            vec!["aValue must be one of the following values: value"]
        );
    }

    #[tokio::test]
    async fn test_required_runs_first() {
        let schema = RuleSchema::new().field("aValue").required().one_of(["value"]).build();
        let result = schema.validate_at("aValue", &json!({})).await;
        assert_eq!(rejected(result), vec!["aValue is a required field"]);
    }

    #[tokio::test]
    async fn test_when_reads_sibling() {
        let schema = RuleSchema::new()
            .field("aDependantValue")
            .when("aNestedValue", |nested| {
                vec![json!(format!("Hello {}", nested.as_str().unwrap_or_default()))]
            })
            .build();

        let ok = json!({ "aNestedValue": "x", "aDependantValue": "Hello x" });
        assert!(schema.validate_at("aDependantValue", &ok).await.is_ok());

        let bad = json!({ "aNestedValue": "y", "aDependantValue": "Hello x" });
        assert_eq!(
            rejected(schema.validate_at("aDependantValue", &bad).await),
            vec!["aDependantValue must be one of the following values: Hello y"]
        );
    }

    #[tokio::test]
    async fn test_custom_message_and_lengths() {
        let schema = RuleSchema::new()
            .field("name")
            .min_length(3)
            .message("too short")
            .max_length(5)
            .build();

        assert_eq!(
            rejected(schema.validate_at("name", &json!({ "name": "ab" })).await),
            vec!["too short"]
        );
        assert_eq!(
            rejected(schema.validate_at("name", &json!({ "name": "abcdef" })).await),
            vec!["name must be at most 5 characters"]
        );
        assert!(schema.validate_at("name", &json!({ "name": "abcd" })).await.is_ok());
    }

    #[tokio::test]
    async fn test_pattern_and_email() {
        let schema = RuleSchema::new()
            .field("code")
            .pattern(Regex::new(r"^\d{4}$").unwrap())
            .field("email")
            .email()
            .build();

        assert!(schema.validate_at("code", &json!({ "code": "1234" })).await.is_ok());
        assert!(schema.validate_at("code", &json!({ "code": "12a4" })).await.is_err());
        assert!(schema.validate_at("email", &json!({ "email": "" })).await.is_ok());
        assert_eq!(
            rejected(schema.validate_at("email", &json!({ "email": "nope" })).await),
            vec!["email must be a valid email"]
        );
    }

    #[tokio::test]
    async fn test_unknown_path_is_engine_error() {
        let schema = RuleSchema::new().field("a").required().build();
        let result = schema.validate_at("b", &json!({})).await;
        assert!(matches!(result, Err(SchemaError::Engine(_))));
    }
}
