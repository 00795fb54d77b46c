//! The external validation engine and the data it validates.
//!
//! A [`Schema`] knows how to validate one field of a whole object. Bindings
//! never interpret values themselves: whatever the input produced is written
//! into the [`FormData`] as-is and the schema decides what it means.

mod data;
pub mod rules;

use async_trait::async_trait;

use crate::error::SchemaError;

pub use rules::{FieldRules, RuleSchema};

/// Field-level validation engine.
///
/// Implementations validate the field at `path` against the complete object,
/// so rules may look at sibling fields. A rejection must carry the path that
/// was asked for.
#[async_trait]
pub trait Schema<T>: Send + Sync {
    /// Validate one field.
    ///
    /// Returns `Err(SchemaError::Rejected)` for an invalid field and
    /// `Err(SchemaError::Engine)` for anything that is not a verdict about
    /// the field.
    async fn validate_at(&self, path: &str, data: &T) -> Result<(), SchemaError>;
}

/// An object whose fields can be read and written by name.
pub trait FormData: Clone + Send + Sync + 'static {
    /// The raw value type stored in a field.
    type Value: Clone + Send + Sync + 'static;

    /// Get the current value of a field.
    fn field(&self, name: &str) -> Option<Self::Value>;

    /// Overwrite a field, creating it if needed.
    fn set_field(&mut self, name: &str, value: Self::Value);
}
