//! Error types for field validation.

use serde::Serialize;
use thiserror::Error;

/// Validation failure for a single field, as reported by the schema engine.
///
/// Replaced wholesale whenever the field is validated again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{path}: {}", .messages.join("; "))]
pub struct FieldError {
    /// Path of the field that failed validation.
    pub path: String,
    /// Human-readable messages, in the order the engine produced them.
    pub messages: Vec<String>,
}

impl FieldError {
    /// Creates an error with a single message.
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            messages: vec![message.into()],
        }
    }

    /// Creates an error carrying several messages.
    pub fn with_messages<I, S>(path: impl Into<String>, messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            path: path.into(),
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    /// Number of messages this error contributes to a form's error count.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }
}

/// An engine failure that is not a structured field rejection.
///
/// Never converted into field state; it is returned to whoever asked for the
/// validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema engine failed at `{path}`: {message}")]
pub struct EngineError {
    /// Field that was being validated.
    pub path: String,
    /// Error message.
    pub message: String,
}

impl EngineError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a failed `Schema::validate_at` call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// The field is invalid. Recovered locally into field error state.
    #[error("{0}")]
    Rejected(FieldError),
    /// Anything else. Propagated to the caller.
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl From<FieldError> for SchemaError {
    fn from(err: FieldError) -> Self {
        Self::Rejected(err)
    }
}
