//! Validation scopes: the shared aggregate state of one logical form.
//!
//! A scope is created once per top-level form and handed explicitly to
//! nested sub-forms, which reuse it instead of creating their own. Every
//! binding registers a [`FieldHandle`] in the scope's [`Registry`]; the
//! scope fans `validate_all_registered`/`reset_all_registered` out to those
//! handles and keeps a debounced, eventually consistent error count.

mod aggregator;
mod options;
mod registry;

use std::sync::{Arc, RwLock, Weak};

use log::{debug, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::debounce::{Debouncer, Invocation};
use crate::error::{EngineError, FieldError};

pub use aggregator::count_errors;
pub use options::{
    DEFAULT_AGGREGATE_DELAY_MS, DEFAULT_DEBOUNCE_DELAY_MS, DEFAULT_RESET_DELAY_MS, ScopeOptions,
};
pub use registry::{FieldHandle, HandleId, Registry};

/// Form-level values a UI renders from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScopeSnapshot {
    /// Error messages across all registered bindings, as of the last
    /// aggregation pass.
    pub error_count: usize,
    /// Some field in the scope has been blurred.
    pub touched: bool,
    /// Some field in the scope has been changed.
    pub dirty: bool,
}

struct ScopeInner {
    options: RwLock<ScopeOptions>,
    state: watch::Sender<ScopeSnapshot>,
    registry: Registry,
    /// Runs aggregation passes; its liveness is the scope's.
    debouncer: Debouncer,
}

/// Handle to a validation scope.
///
/// Cloning is cheap and yields another handle to the same scope; this is how
/// a parent form passes its scope to its sub-forms.
#[derive(Clone)]
pub struct ValidationScope {
    inner: Arc<ScopeInner>,
}

impl ValidationScope {
    /// Create a top-level scope.
    ///
    /// Warns if either styling marker is missing; the scope works without
    /// them, fields just get no error markers.
    pub fn new(options: Option<ScopeOptions>) -> Self {
        let options = options.unwrap_or_default();
        check_options(&options);

        let (state, _) = watch::channel(ScopeSnapshot::default());
        Self {
            inner: Arc::new(ScopeInner {
                options: RwLock::new(options),
                state,
                registry: Registry::new(),
                debouncer: Debouncer::new(),
            }),
        }
    }

    /// Reuse `existing` if given, otherwise create a new top-level scope.
    ///
    /// Options passed along with an existing scope overwrite its options.
    pub fn create_or_reuse(
        options: Option<ScopeOptions>,
        existing: Option<&ValidationScope>,
    ) -> Self {
        match existing {
            Some(scope) => {
                if let Some(options) = options {
                    check_options(&options);
                    scope.set_options(options);
                }
                scope.clone()
            }
            None => Self::new(options),
        }
    }

    /// Current options.
    pub fn options(&self) -> ScopeOptions {
        self.inner
            .options
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Replace the options.
    pub fn set_options(&self, options: ScopeOptions) {
        let mut guard = self
            .inner
            .options
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = options;
    }

    /// Check whether two handles point at the same scope.
    pub fn same_scope(&self, other: &ValidationScope) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    // -------------------------------------------------------------------------
    // Aggregate state
    // -------------------------------------------------------------------------

    /// Form-level error count as of the last aggregation pass.
    pub fn error_count(&self) -> usize {
        self.inner.state.borrow().error_count
    }

    pub fn is_touched(&self) -> bool {
        self.inner.state.borrow().touched
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state.borrow().dirty
    }

    /// All form-level values at once.
    pub fn snapshot(&self) -> ScopeSnapshot {
        *self.inner.state.borrow()
    }

    /// Watch form-level values, e.g. to re-render when they change.
    pub fn subscribe(&self) -> watch::Receiver<ScopeSnapshot> {
        self.inner.state.subscribe()
    }

    /// Set the form-level touched flag.
    pub fn set_touched(&self, touched: bool) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.touched != touched;
            state.touched = touched;
            changed
        });
    }

    /// Set the form-level dirty flag.
    pub fn set_dirty(&self, dirty: bool) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.dirty != dirty;
            state.dirty = dirty;
            changed
        });
    }

    fn set_error_count(&self, count: usize) {
        self.inner.state.send_if_modified(|state| {
            let changed = state.error_count != count;
            state.error_count = count;
            changed
        });
    }

    // -------------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------------

    /// Register a binding's handle.
    pub fn register(&self, handle: Weak<dyn FieldHandle>) -> HandleId {
        let id = self.inner.registry.register(handle);
        debug!("scope: registered {} ({} active)", id, self.inner.registry.len());
        id
    }

    /// Deregister a handle and schedule an aggregation pass so its errors
    /// stop counting.
    pub fn deregister(&self, id: HandleId) {
        if self.inner.registry.deregister(id) {
            debug!("scope: deregistered {} ({} active)", id, self.inner.registry.len());
        }
        // Bindings may be dropped after the runtime is gone.
        if tokio::runtime::Handle::try_current().is_ok() {
            self.request_aggregation();
        } else {
            self.aggregate_now();
        }
    }

    /// Number of registered handles.
    pub fn handle_count(&self) -> usize {
        self.inner.registry.len()
    }

    // -------------------------------------------------------------------------
    // Scope-wide actions
    // -------------------------------------------------------------------------

    /// Validate every registered binding, in registration order.
    ///
    /// All bindings are validated even after errors were found. Bindings
    /// that deregister while the pass is running are left out. Engine
    /// failures abort the pass and are returned.
    pub async fn validate_all_registered(&self) -> Result<Vec<FieldError>, EngineError> {
        let mut errors = Vec::new();
        for (id, handle) in self.inner.registry.handles() {
            if !self.inner.registry.contains(id) {
                continue;
            }
            let found = handle.validate().await?;
            if self.inner.registry.contains(id) {
                errors.extend(found);
            }
        }
        Ok(errors)
    }

    /// Reset every registered binding and clear the form-level flags.
    pub fn reset_all_registered(&self) {
        for (_, handle) in self.inner.registry.handles() {
            handle.reset();
        }
        self.inner.state.send_if_modified(|state| {
            let changed = state.touched || state.dirty;
            state.touched = false;
            state.dirty = false;
            changed
        });
    }

    /// Schedule a debounced recount of the form-level error count.
    ///
    /// The returned handle resolves with the new count once the pass ran.
    pub fn request_aggregation(&self) -> JoinHandle<Invocation<usize>> {
        aggregator::schedule(self)
    }

    /// Recount the form-level error count immediately, without debouncing.
    pub fn aggregate_now(&self) -> usize {
        let count = count_errors(&self.inner.registry);
        if self.is_alive() {
            self.set_error_count(count);
        }
        count
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Mark the scope as torn down. Pending aggregation passes are dropped.
    pub fn teardown(&self) {
        debug!("scope: torn down with {} handles", self.inner.registry.len());
        self.inner.debouncer.liveness().kill();
    }

    pub fn is_alive(&self) -> bool {
        self.inner.debouncer.liveness().is_alive()
    }
}

impl std::fmt::Debug for ValidationScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationScope")
            .field("snapshot", &self.snapshot())
            .field("handles", &self.handle_count())
            .field("alive", &self.is_alive())
            .finish()
    }
}

fn check_options(options: &ScopeOptions) {
    if !options.is_complete() {
        warn!(
            "error_input_marker and error_message_marker are needed for top-level validation scopes"
        );
    }
}
