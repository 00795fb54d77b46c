//! Per-binding field state.

use std::collections::HashMap;

use crate::error::FieldError;

/// Identifies the resets a field has seen.
///
/// Captured before a validation awaits the schema; a result whose token no
/// longer matches arrived after a reset and must not be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ResetToken {
    all: u64,
    field: u64,
}

/// Everything one binding knows about its fields.
///
/// Touched and dirty sets keep first-seen order. Errors are stored per field
/// and replaced wholesale on every validation of that field.
#[derive(Debug, Clone)]
pub(crate) struct BindingState<T> {
    /// Private copy of the data being validated.
    pub data: T,
    touched: Vec<String>,
    dirty: Vec<String>,
    errors: Vec<FieldError>,
    /// Fields something renders errors for. Only these are validated by
    /// `validate_observed`.
    observed: Vec<String>,
    /// Number of `reset_all` calls.
    resets_all: u64,
    /// Number of `reset_field` calls per field.
    resets: HashMap<String, u64>,
}

impl<T> BindingState<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            touched: Vec::new(),
            dirty: Vec::new(),
            errors: Vec::new(),
            observed: Vec::new(),
            resets_all: 0,
            resets: HashMap::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Touched / dirty
    // -------------------------------------------------------------------------

    pub fn mark_touched(&mut self, name: &str) {
        push_unique(&mut self.touched, name);
    }

    pub fn mark_dirty(&mut self, name: &str) {
        push_unique(&mut self.dirty, name);
    }

    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.iter().any(|f| f == name)
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.dirty.iter().any(|f| f == name)
    }

    /// Touched fields other than `name`, in the order they were touched.
    pub fn touched_except(&self, name: &str) -> Vec<String> {
        self.touched.iter().filter(|f| *f != name).cloned().collect()
    }

    // -------------------------------------------------------------------------
    // Observation
    // -------------------------------------------------------------------------

    pub fn observe(&mut self, name: &str) {
        push_unique(&mut self.observed, name);
    }

    pub fn observed(&self) -> Vec<String> {
        self.observed.clone()
    }

    // -------------------------------------------------------------------------
    // Errors
    // -------------------------------------------------------------------------

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn has_errors(&self, name: &str) -> bool {
        self.errors.iter().any(|e| e.path == name)
    }

    /// All messages for a field, or `None` if it has no errors.
    pub fn messages(&self, name: &str) -> Option<Vec<String>> {
        if !self.has_errors(name) {
            return None;
        }
        Some(
            self.errors
                .iter()
                .filter(|e| e.path == name)
                .flat_map(|e| e.messages.iter().cloned())
                .collect(),
        )
    }

    pub fn error_message_count(&self) -> usize {
        self.errors.iter().map(FieldError::message_count).sum()
    }

    /// Replace the errors of one field with the outcome of its validation.
    ///
    /// Returns true if the binding's message count changed.
    pub fn set_field_error(&mut self, name: &str, error: Option<FieldError>) -> bool {
        let before = self.error_message_count();
        self.errors.retain(|e| e.path != name);
        if let Some(error) = error {
            self.errors.push(error);
        }
        before != self.error_message_count()
    }

    // -------------------------------------------------------------------------
    // Resets
    // -------------------------------------------------------------------------

    pub fn reset_token(&self, name: &str) -> ResetToken {
        ResetToken {
            all: self.resets_all,
            field: self.resets.get(name).copied().unwrap_or(0),
        }
    }

    /// Clear touched, dirty and errors for one field.
    ///
    /// Returns true if the binding's message count changed.
    pub fn reset_field(&mut self, name: &str) -> bool {
        *self.resets.entry(name.to_string()).or_insert(0) += 1;
        self.touched.retain(|f| f != name);
        self.dirty.retain(|f| f != name);
        self.set_field_error(name, None)
    }

    /// Clear touched, dirty and errors for every field.
    ///
    /// Returns true if the binding's message count changed.
    pub fn reset_all(&mut self) -> bool {
        let had_errors = self.error_message_count() > 0;
        self.resets_all += 1;
        self.touched.clear();
        self.dirty.clear();
        self.errors.clear();
        had_errors
    }
}

fn push_unique(list: &mut Vec<String>, name: &str) {
    if !list.iter().any(|f| f == name) {
        list.push(name.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_are_recorded_once() {
        let mut state = BindingState::new(());
        state.mark_touched("a");
        state.mark_touched("a");
        state.mark_touched("b");
        state.mark_dirty("a");
        state.mark_dirty("a");

        assert_eq!(state.touched_except("b"), vec!["a"]);
        assert!(state.is_dirty("a"));
        assert!(!state.is_touched("c"));
    }

    #[test]
    fn test_reset_token_changes_on_reset() {
        let mut state = BindingState::new(());
        let a = state.reset_token("a");
        let b = state.reset_token("b");

        state.reset_field("a");
        assert_ne!(state.reset_token("a"), a);
        assert_eq!(state.reset_token("b"), b);

        state.reset_all();
        assert_ne!(state.reset_token("b"), b);
    }

    #[test]
    fn test_set_field_error_replaces_only_that_field() {
        let mut state = BindingState::new(());
        assert!(state.set_field_error("a", Some(FieldError::new("a", "bad a"))));
        assert!(state.set_field_error("b", Some(FieldError::new("b", "bad b"))));
        assert!(!state.set_field_error("a", Some(FieldError::new("a", "still bad a"))));

        assert_eq!(state.messages("a"), Some(vec!["still bad a".to_string()]));
        assert_eq!(state.messages("b"), Some(vec!["bad b".to_string()]));

        assert!(state.set_field_error("a", None));
        assert_eq!(state.messages("a"), None);
        assert_eq!(state.error_message_count(), 1);
    }

    #[test]
    fn test_reset_field_is_idempotent() {
        let mut state = BindingState::new(());
        state.mark_touched("a");
        state.mark_dirty("a");
        state.mark_touched("b");
        state.set_field_error("a", Some(FieldError::new("a", "bad")));

        assert!(state.reset_field("a"));
        let once = (state.is_touched("a"), state.is_dirty("a"), state.messages("a"));
        assert!(!state.reset_field("a"));
        let twice = (state.is_touched("a"), state.is_dirty("a"), state.messages("a"));

        assert_eq!(once, (false, false, None));
        assert_eq!(once, twice);
        assert!(state.is_touched("b"));
    }

    #[test]
    fn test_touched_except_keeps_order() {
        let mut state = BindingState::new(());
        state.mark_touched("c");
        state.mark_touched("a");
        state.mark_touched("b");
        assert_eq!(state.touched_except("a"), vec!["c", "b"]);
    }
}
