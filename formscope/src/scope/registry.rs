//! Registration table of the field handles active in a scope.

use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;

use crate::error::{EngineError, FieldError};

/// The scope-facing side of a binding.
///
/// The registry only holds weak references; a handle lives as long as the
/// binding that created it.
#[async_trait]
pub trait FieldHandle: Send + Sync {
    /// Clear touched, dirty and error state of every field of the binding.
    fn reset(&self);

    /// Validate every observed field of the binding and return the errors.
    async fn validate(&self) -> Result<Vec<FieldError>, EngineError>;

    /// The binding's latest field errors.
    fn current_errors(&self) -> Vec<FieldError>;

    /// Number of error messages the binding currently contributes.
    fn error_message_count(&self) -> usize {
        self.current_errors()
            .iter()
            .map(FieldError::message_count)
            .sum()
    }
}

/// Stable identity of a registered handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(u64);

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "__handle_{}", self.0)
    }
}

struct RegistryInner {
    next_id: u64,
    /// Entries in registration order.
    entries: Vec<(HandleId, Weak<dyn FieldHandle>)>,
}

/// Registry of the handles active in one scope.
///
/// Iteration always works on a snapshot, so handles may register or
/// deregister while a scope-wide validation or reset is running.
pub struct Registry {
    inner: Mutex<RegistryInner>,
}

impl Registry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(RegistryInner {
                next_id: 0,
                entries: Vec::new(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a handle and return its id.
    pub fn register(&self, handle: Weak<dyn FieldHandle>) -> HandleId {
        let mut inner = self.lock();
        let id = HandleId(inner.next_id);
        inner.next_id += 1;
        inner.entries.push((id, handle));
        id
    }

    /// Remove a handle by id.
    ///
    /// Returns false if it was not registered.
    pub fn deregister(&self, id: HandleId) -> bool {
        let mut inner = self.lock();
        let before = inner.entries.len();
        inner.entries.retain(|(entry, _)| *entry != id);
        inner.entries.len() != before
    }

    /// Snapshot of the live handles, in registration order.
    pub fn handles(&self) -> Vec<(HandleId, Arc<dyn FieldHandle>)> {
        self.lock()
            .entries
            .iter()
            .filter_map(|(id, handle)| handle.upgrade().map(|handle| (*id, handle)))
            .collect()
    }

    /// Check whether a handle is registered.
    pub fn contains(&self, id: HandleId) -> bool {
        self.lock().entries.iter().any(|(entry, _)| *entry == id)
    }

    /// Number of registered handles.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}
