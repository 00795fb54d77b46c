//! Debounced recomputation of a scope's error count.

use std::sync::Arc;

use log::debug;
use tokio::task::JoinHandle;

use super::{Registry, ValidationScope};
use crate::debounce::Invocation;

const AGGREGATE_KEY: &str = "__aggregate";

/// Sum of the error messages currently reported by every live handle.
pub fn count_errors(registry: &Registry) -> usize {
    registry
        .handles()
        .iter()
        .map(|(_, handle)| handle.error_message_count())
        .sum()
}

/// Schedule an aggregation pass for `scope`.
///
/// Rapid requests collapse into one pass. The pass holds only a weak
/// reference to the scope and does nothing once the scope is torn down.
pub(super) fn schedule(scope: &ValidationScope) -> JoinHandle<Invocation<usize>> {
    let delay = scope.options().aggregate_delay();
    let weak = Arc::downgrade(&scope.inner);

    scope
        .inner
        .debouncer
        .schedule(AGGREGATE_KEY, delay, move || async move {
            let Some(inner) = weak.upgrade() else {
                return 0;
            };
            let scope = ValidationScope { inner };
            let count = count_errors(&scope.inner.registry);
            debug!("scope: aggregated error count {}", count);
            scope.set_error_count(count);
            count
        })
}
