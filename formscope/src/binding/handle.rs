//! The scope-facing handle of a binding.

use async_trait::async_trait;

use super::BindingInner;
use crate::error::{EngineError, FieldError};
use crate::schema::FormData;
use crate::scope::FieldHandle;

#[async_trait]
impl<T: FormData> FieldHandle for BindingInner<T> {
    fn reset(&self) {
        self.schedule_reset_all();
    }

    async fn validate(&self) -> Result<Vec<FieldError>, EngineError> {
        self.validate_observed().await
    }

    fn current_errors(&self) -> Vec<FieldError> {
        self.read(|state| state.errors().to_vec())
    }

    fn error_message_count(&self) -> usize {
        self.read(|state| state.error_message_count())
    }
}
