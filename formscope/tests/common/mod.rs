//! Shared schemas and data for the integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use formscope::prelude::*;
use serde_json::{Value, json};

pub fn options() -> ScopeOptions {
    ScopeOptions::new()
        .error_input_marker("is-invalid")
        .error_message_marker("text-danger")
}

/// Long enough for every debounce window (validation, reset, aggregation)
/// to elapse.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1000)).await;
}

pub fn data_schema() -> Arc<dyn Schema<Value>> {
    Arc::new(
        RuleSchema::new()
            .field("aValue")
            .required()
            .one_of(["value"])
            .field("aName")
            .required()
            .build(),
    )
}

pub fn nested_schema() -> Arc<dyn Schema<Value>> {
    Arc::new(
        RuleSchema::new()
            .field("aNestedValue")
            .required()
            .field("aDependantValue")
            .required()
            .when("aNestedValue", |nested| {
                vec![json!(format!("Hello {}", nested.as_str().unwrap_or_default()))]
            })
            .build(),
    )
}

pub fn form_data() -> Value {
    json!({
        "aValue": "valu",
        "aName": "Ada",
        "nestedValues": [
            { "aNestedValue": "nested value 1", "aDependantValue": "Hello nested value 1" },
            { "aNestedValue": "nested value 2", "aDependantValue": "Hello nested value 2" },
        ],
    })
}

pub fn nested_data(n: usize) -> Value {
    json!({
        "aNestedValue": format!("nested value {n}"),
        "aDependantValue": format!("Hello nested value {n}"),
    })
}

/// Records every path it is asked to validate, then defers to `inner`.
pub struct Recording {
    inner: Arc<dyn Schema<Value>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl Recording {
    pub fn new(inner: Arc<dyn Schema<Value>>) -> Self {
        Self {
            inner,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Schema<Value> for Recording {
    async fn validate_at(&self, path: &str, data: &Value) -> Result<(), SchemaError> {
        self.calls.lock().unwrap().push(path.to_string());
        self.inner.validate_at(path, data).await
    }
}

/// Rejects every field, after a delay.
pub struct Slow {
    pub delay: Duration,
}

#[async_trait]
impl Schema<Value> for Slow {
    async fn validate_at(&self, path: &str, _data: &Value) -> Result<(), SchemaError> {
        tokio::time::sleep(self.delay).await;
        Err(FieldError::new(path, "slow rejection").into())
    }
}

/// Fails with something that is not a field rejection.
pub struct Broken;

#[async_trait]
impl Schema<Value> for Broken {
    async fn validate_at(&self, path: &str, _data: &Value) -> Result<(), SchemaError> {
        Err(EngineError::new(path, "engine exploded").into())
    }
}
