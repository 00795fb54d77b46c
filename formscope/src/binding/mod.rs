//! Field bindings: validation state for one data object.
//!
//! A [`FormBinding`] owns a private copy of the object being edited, tracks
//! touched/dirty/error state per field and runs the schema against the whole
//! object whenever a field changes or loses focus. Each binding registers a
//! handle in a [`ValidationScope`] so that form-wide validation, resets and
//! error counts cover every binding in the scope, including bindings of
//! nested sub-forms.
//!
//! # Example
//!
//! ```ignore
//! let scope = ValidationScope::new(Some(options));
//! let parent = FormBinding::within(Arc::new(data_schema), data, &scope);
//! let child = FormBinding::within(Arc::new(nested_schema), nested, &scope);
//!
//! parent.observe("aValue");
//! parent.on_change("aValue", json!("value"));
//! parent.on_blur("aValue", None);
//!
//! let errors = scope.validate_all_registered().await?;
//! ```

mod handle;
mod state;

use std::sync::{Arc, RwLock, Weak};

use log::trace;
use tokio::task::JoinHandle;

use crate::debounce::{Debouncer, Invocation};
use crate::error::{EngineError, FieldError, SchemaError};
use crate::schema::{FormData, Schema};
use crate::scope::{HandleId, ScopeOptions, ValidationScope};

use state::BindingState;

/// Outcome of a debounced field validation.
pub type PendingValidation = JoinHandle<Invocation<Result<Option<FieldError>, EngineError>>>;

/// Outcome of a debounced reset.
pub type PendingReset = JoinHandle<Invocation<()>>;

const RESET_ALL_KEY: &str = "reset:*";

fn validation_key(name: &str) -> String {
    format!("validate:{name}")
}

fn reset_key(name: &str) -> String {
    format!("reset:{name}")
}

pub(crate) struct BindingInner<T: FormData> {
    this: Weak<BindingInner<T>>,
    schema: Arc<dyn Schema<T>>,
    scope: ValidationScope,
    state: RwLock<BindingState<T>>,
    /// Debounces this binding's validations and resets. Its liveness is the
    /// binding's.
    debouncer: Debouncer,
}

impl<T: FormData> BindingInner<T> {
    fn read<R>(&self, f: impl FnOnce(&BindingState<T>) -> R) -> R {
        let guard = self
            .state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut BindingState<T>) -> R) -> R {
        let mut guard = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }

    fn is_alive(&self) -> bool {
        self.debouncer.liveness().is_alive()
    }

    /// Apply a mutation that may change the error count, and schedule an
    /// aggregation pass if it did.
    fn mutate_errors(&self, f: impl FnOnce(&mut BindingState<T>) -> bool) {
        if self.write(f) {
            self.scope.request_aggregation();
        }
    }

    /// Validate one field against the current data.
    async fn validate(&self, name: &str) -> Result<Option<FieldError>, EngineError> {
        let (data, token) = self.read(|state| (state.data.clone(), state.reset_token(name)));
        let result = self.schema.validate_at(name, &data).await;

        let error = match result {
            Ok(()) => None,
            Err(SchemaError::Rejected(error)) => Some(error),
            Err(SchemaError::Engine(error)) => return Err(error),
        };

        if !self.is_alive() {
            trace!("binding: dropped result for `{}`, binding torn down", name);
            return Ok(error);
        }

        let stored = error.clone();
        let mut stale = false;
        self.mutate_errors(|state| {
            if state.reset_token(name) != token {
                stale = true;
                return false;
            }
            state.set_field_error(name, stored)
        });
        if stale {
            trace!("binding: dropped result for `{}`, field was reset", name);
        }
        Ok(error)
    }

    /// Validate one field, then every other touched field, one at a time.
    ///
    /// Schema rules may read sibling fields, so a change can invalidate (or
    /// fix) fields that were validated before.
    async fn validate_with_dependents(
        &self,
        name: &str,
    ) -> Result<Option<FieldError>, EngineError> {
        let result = self.validate(name).await;

        let siblings = self.read(|state| state.touched_except(name));
        for sibling in siblings {
            if !self.is_alive() {
                break;
            }
            self.validate(&sibling).await?;
        }
        result
    }

    /// Validate every observed field, collecting the errors.
    async fn validate_observed(&self) -> Result<Vec<FieldError>, EngineError> {
        let mut errors = Vec::new();
        for name in self.read(BindingState::observed) {
            if !self.is_alive() {
                trace!("binding: torn down during validation, discarding its errors");
                return Ok(Vec::new());
            }
            if let Some(error) = self.validate(&name).await? {
                errors.push(error);
            }
        }
        if !self.is_alive() {
            return Ok(Vec::new());
        }
        Ok(errors)
    }

    fn schedule_validation(&self, name: &str, dependents: bool) -> PendingValidation {
        let delay = self.scope.options().debounce_delay();
        let this = self.this.clone();
        let name = name.to_string();

        self.debouncer
            .schedule(validation_key(&name), delay, move || async move {
                let Some(inner) = this.upgrade() else {
                    return Ok(None);
                };
                if dependents {
                    inner.validate_with_dependents(&name).await
                } else {
                    inner.validate(&name).await
                }
            })
    }

    fn schedule_reset_field(&self, name: &str) -> PendingReset {
        let delay = self.scope.options().reset_delay();
        let this = self.this.clone();
        let name = name.to_string();

        self.debouncer
            .schedule(reset_key(&name), delay, move || async move {
                if let Some(inner) = this.upgrade() {
                    inner.debouncer.cancel(&validation_key(&name));
                    inner.mutate_errors(|state| state.reset_field(&name));
                }
            })
    }

    fn schedule_reset_all(&self) -> PendingReset {
        let delay = self.scope.options().reset_delay();
        let this = self.this.clone();

        self.debouncer
            .schedule(RESET_ALL_KEY, delay, move || async move {
                if let Some(inner) = this.upgrade() {
                    inner.debouncer.cancel_all();
                    inner.mutate_errors(BindingState::reset_all);
                }
            })
    }
}

/// Validation state and handlers for one data object.
///
/// Dropping the binding tears it down: it leaves its scope, pending
/// debounced work is skipped and in-flight results are discarded.
pub struct FormBinding<T: FormData> {
    inner: Arc<BindingInner<T>>,
    handle_id: HandleId,
}

impl<T: FormData> FormBinding<T> {
    /// Create a binding with a new top-level scope.
    pub fn new(schema: Arc<dyn Schema<T>>, data: T, options: ScopeOptions) -> Self {
        Self::create(schema, data, Some(options), None)
    }

    /// Create a binding that reports into an existing scope.
    pub fn within(schema: Arc<dyn Schema<T>>, data: T, scope: &ValidationScope) -> Self {
        Self::create(schema, data, None, Some(scope))
    }

    /// Create a binding, reusing `existing` if given.
    ///
    /// See [`ValidationScope::create_or_reuse`] for how `options` apply.
    pub fn create(
        schema: Arc<dyn Schema<T>>,
        data: T,
        options: Option<ScopeOptions>,
        existing: Option<&ValidationScope>,
    ) -> Self {
        let scope = ValidationScope::create_or_reuse(options, existing);
        let inner = Arc::new_cyclic(|this| BindingInner {
            this: this.clone(),
            schema,
            scope: scope.clone(),
            state: RwLock::new(BindingState::new(data)),
            debouncer: Debouncer::new(),
        });

        let handle: Weak<BindingInner<T>> = Arc::downgrade(&inner);
        let handle_id = scope.register(handle);

        Self { inner, handle_id }
    }

    /// The scope this binding reports into.
    pub fn scope(&self) -> &ValidationScope {
        &self.inner.scope
    }

    /// This binding's id in its scope's registry.
    pub fn handle_id(&self) -> HandleId {
        self.handle_id
    }

    // -------------------------------------------------------------------------
    // Data
    // -------------------------------------------------------------------------

    /// Snapshot of the binding's copy of the data.
    pub fn data(&self) -> T {
        self.inner.read(|state| state.data.clone())
    }

    /// Replace the binding's copy of the data, e.g. when the host passes in a
    /// new object. Field state is kept.
    pub fn set_data(&self, data: T) {
        if self.is_alive() {
            self.inner.write(|state| state.data = data);
        }
    }

    /// Current value of one field.
    pub fn field_value(&self, name: &str) -> Option<T::Value> {
        self.inner.read(|state| state.data.field(name))
    }

    // -------------------------------------------------------------------------
    // Event handlers
    // -------------------------------------------------------------------------

    /// A field's value changed.
    ///
    /// Stores the value as given, marks the field and the form dirty and
    /// schedules a debounced validation of the field followed by every other
    /// touched field.
    pub fn on_change(&self, name: &str, value: T::Value) -> PendingValidation {
        if self.is_alive() {
            self.inner.scope.set_dirty(true);
            self.inner.write(|state| state.mark_dirty(name));
        }
        self.value_changed(name, value)
    }

    /// Like [`on_change`](Self::on_change) but leaves dirty flags alone.
    pub fn value_changed(&self, name: &str, value: T::Value) -> PendingValidation {
        if self.is_alive() {
            self.inner.write(|state| state.data.set_field(name, value));
        }
        self.inner.schedule_validation(name, true)
    }

    /// A field lost focus.
    ///
    /// Marks the field and the form touched, stores `value` if given and
    /// schedules a debounced validation of just this field.
    pub fn on_blur(&self, name: &str, value: Option<T::Value>) -> PendingValidation {
        if self.is_alive() {
            self.inner.scope.set_touched(true);
            self.inner.write(|state| {
                state.mark_touched(name);
                if let Some(value) = value {
                    state.data.set_field(name, value);
                }
            });
        }
        self.inner.schedule_validation(name, false)
    }

    // -------------------------------------------------------------------------
    // Validation
    // -------------------------------------------------------------------------

    /// Validate one field now, without debouncing.
    ///
    /// Returns the field's error, if any. Engine failures are returned as
    /// `Err` and leave the field's state untouched.
    pub async fn validate(&self, name: &str) -> Result<Option<FieldError>, EngineError> {
        self.inner.validate(name).await
    }

    /// Validate every observed field of this binding, one at a time.
    pub async fn validate_observed(&self) -> Result<Vec<FieldError>, EngineError> {
        self.inner.validate_observed().await
    }

    /// Validate every binding in the scope.
    pub async fn validate_all(&self) -> Result<Vec<FieldError>, EngineError> {
        self.inner.scope.validate_all_registered().await
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    /// Start observing a field's errors.
    ///
    /// Only observed fields take part in [`validate_observed`](Self::validate_observed)
    /// and therefore in scope-wide validation.
    pub fn observe(&self, name: &str) {
        if self.is_alive() {
            self.inner.write(|state| state.observe(name));
        }
    }

    /// Error messages of a field, or `None` if it has no errors.
    pub fn error_messages(&self, name: &str) -> Option<Vec<String>> {
        self.inner.read(|state| state.messages(name))
    }

    /// Observe a field and read its error messages, for error-message
    /// components that register themselves when rendered.
    pub fn input_error_messages(&self, name: &str) -> Option<Vec<String>> {
        self.observe(name);
        self.error_messages(name)
    }

    /// Class for an input: `passthrough`, plus the scope's error input marker
    /// when the field has errors.
    pub fn error_marker(&self, name: &str, passthrough: &str) -> String {
        if !self.has_errors(name) {
            return passthrough.to_string();
        }
        match self.inner.scope.options().error_input_marker {
            Some(marker) if passthrough.is_empty() => marker,
            Some(marker) => format!("{passthrough} {marker}"),
            None => passthrough.to_string(),
        }
    }

    /// The scope's marker for rendered error messages.
    pub fn message_marker(&self) -> Option<String> {
        self.inner.scope.options().error_message_marker
    }

    pub fn has_errors(&self, name: &str) -> bool {
        self.inner.read(|state| state.has_errors(name))
    }

    /// All current field errors of this binding.
    pub fn errors(&self) -> Vec<FieldError> {
        self.inner.read(|state| state.errors().to_vec())
    }

    pub fn is_field_touched(&self, name: &str) -> bool {
        self.inner.read(|state| state.is_touched(name))
    }

    pub fn is_field_dirty(&self, name: &str) -> bool {
        self.inner.read(|state| state.is_dirty(name))
    }

    /// Form-level error count of the scope.
    pub fn form_error_count(&self) -> usize {
        self.inner.scope.error_count()
    }

    pub fn is_form_touched(&self) -> bool {
        self.inner.scope.is_touched()
    }

    pub fn is_form_dirty(&self) -> bool {
        self.inner.scope.is_dirty()
    }

    // -------------------------------------------------------------------------
    // Resets
    // -------------------------------------------------------------------------

    /// Clear touched, dirty and errors of one field after the reset delay.
    pub fn reset_field(&self, name: &str) -> PendingReset {
        self.inner.schedule_reset_field(name)
    }

    /// Clear touched, dirty and errors of every field in this binding after
    /// the reset delay.
    pub fn reset_all_local_fields(&self) -> PendingReset {
        self.inner.schedule_reset_all()
    }

    /// Reset every binding in the scope and the form-level flags.
    pub fn reset_context(&self) {
        self.inner.scope.reset_all_registered();
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Tear the binding down. Later calls do nothing.
    pub fn teardown(&self) {
        if self.inner.debouncer.liveness().kill() {
            self.inner.scope.deregister(self.handle_id);
        }
    }

    pub fn is_alive(&self) -> bool {
        self.inner.is_alive()
    }
}

impl<T: FormData> Drop for FormBinding<T> {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl<T: FormData> std::fmt::Debug for FormBinding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FormBinding")
            .field("handle_id", &self.handle_id)
            .field("errors", &self.errors())
            .field("alive", &self.is_alive())
            .finish()
    }
}
