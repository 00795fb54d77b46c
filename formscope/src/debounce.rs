//! Keyed debouncing with cooperative cancellation.
//!
//! Every call to [`Debouncer::schedule`] restarts the window for its key; only
//! the last call in a window runs. Nothing is ever hard-cancelled: each
//! scheduled task wakes up, checks the owner's [`Liveness`] and whether it is
//! still the newest call for its key, and either runs or resolves to a
//! non-running [`Invocation`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::trace;
use tokio::task::JoinHandle;

/// Shared "is my owner still mounted" flag.
///
/// Cheap to clone. Once killed it never comes back to life.
#[derive(Debug, Clone)]
pub struct Liveness(Arc<AtomicBool>);

impl Liveness {
    /// Create a new, alive flag.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }

    /// Check whether the owner is still alive.
    pub fn is_alive(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Mark the owner as torn down.
    ///
    /// Returns true if this call did the killing.
    pub fn kill(&self) -> bool {
        self.0.swap(false, Ordering::SeqCst)
    }
}

impl Default for Liveness {
    fn default() -> Self {
        Self::new()
    }
}

/// What became of a scheduled call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation<T> {
    /// The operation ran and produced this output.
    Completed(T),
    /// A newer call with the same key replaced this one.
    Superseded,
    /// The owner was torn down before the window elapsed.
    Skipped,
}

impl<T> Invocation<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Get the operation's output, if it ran.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Superseded | Self::Skipped => None,
        }
    }
}

struct DebouncerInner {
    /// Newest generation scheduled per key.
    pending: Mutex<HashMap<String, u64>>,
    next_generation: AtomicU64,
    liveness: Liveness,
}

impl DebouncerInner {
    fn bump(&self, key: &str) -> u64 {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.insert(key.to_string(), generation);
        generation
    }

    /// Claim the key if `generation` is still the newest call for it.
    fn claim(&self, key: &str, generation: u64) -> bool {
        let mut pending = self
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if pending.get(key) == Some(&generation) {
            pending.remove(key);
            true
        } else {
            false
        }
    }
}

/// Collapses repeated calls per key into one delayed execution.
///
/// Cloning yields another handle to the same set of keys and the same
/// liveness flag.
#[derive(Clone)]
pub struct Debouncer {
    inner: Arc<DebouncerInner>,
}

impl Debouncer {
    /// Create a debouncer with its own liveness flag.
    pub fn new() -> Self {
        Self::with_liveness(Liveness::new())
    }

    /// Create a debouncer tied to an existing liveness flag.
    pub fn with_liveness(liveness: Liveness) -> Self {
        Self {
            inner: Arc::new(DebouncerInner {
                pending: Mutex::new(HashMap::new()),
                next_generation: AtomicU64::new(0),
                liveness,
            }),
        }
    }

    /// The liveness flag checked before any scheduled call runs.
    pub fn liveness(&self) -> &Liveness {
        &self.inner.liveness
    }

    /// Schedule `op` to run after `delay`, replacing any pending call for `key`.
    ///
    /// Must be called from within a tokio runtime. The returned handle can be
    /// dropped for fire-and-forget use; awaiting it yields the
    /// [`Invocation`]. Errors produced by `op` are part of its output and are
    /// not inspected here.
    pub fn schedule<F, Fut>(
        &self,
        key: impl Into<String>,
        delay: Duration,
        op: F,
    ) -> JoinHandle<Invocation<Fut::Output>>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future + Send + 'static,
        Fut::Output: Send + 'static,
    {
        let key = key.into();
        let generation = self.inner.bump(&key);
        let inner = Arc::clone(&self.inner);
        trace!("debounce: scheduled `{}` (gen {}) in {:?}", key, generation, delay);

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            if !inner.liveness.is_alive() {
                trace!("debounce: `{}` skipped, owner torn down", key);
                return Invocation::Skipped;
            }
            if !inner.claim(&key, generation) {
                trace!("debounce: `{}` (gen {}) superseded", key, generation);
                return Invocation::Superseded;
            }

            Invocation::Completed(op().await)
        })
    }

    /// Drop the pending call for `key`, if any. It resolves as superseded.
    pub fn cancel(&self, key: &str) {
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.remove(key);
    }

    /// Drop every pending call. They resolve as superseded.
    pub fn cancel_all(&self) {
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        pending.clear();
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new()
    }
}
