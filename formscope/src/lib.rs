//! Form validation state coordination.
//!
//! `formscope` binds a schema to mutable form data and keeps track of which
//! fields were touched, changed and are currently invalid. Bindings for
//! nested sub-forms can share one [`ValidationScope`](scope::ValidationScope)
//! with their parent form, so that form-wide validation, resets and the
//! error count cover all of them.
//!
//! The schema engine itself is external: anything implementing
//! [`Schema`](schema::Schema) can be used. [`RuleSchema`](schema::RuleSchema)
//! covers simple JSON forms.

pub mod binding;
pub mod debounce;
pub mod error;
pub mod schema;
pub mod scope;

pub mod prelude {
    pub use crate::binding::{FormBinding, PendingReset, PendingValidation};
    pub use crate::debounce::{Debouncer, Invocation, Liveness};
    pub use crate::error::{EngineError, FieldError, SchemaError};
    pub use crate::schema::{FieldRules, FormData, RuleSchema, Schema};
    pub use crate::scope::{FieldHandle, HandleId, ScopeOptions, ScopeSnapshot, ValidationScope};
}
