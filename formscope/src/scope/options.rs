//! Scope configuration.

use std::time::Duration;

use serde::Deserialize;

/// Default debounce window for field validation.
pub const DEFAULT_DEBOUNCE_DELAY_MS: u64 = 250;
/// Default debounce window for resets. Longer than the validation window so
/// that a reset issued from inside a change handler lands last.
pub const DEFAULT_RESET_DELAY_MS: u64 = 300;
/// Default debounce window for recomputing the scope's error count.
pub const DEFAULT_AGGREGATE_DELAY_MS: u64 = 50;

/// Options shared by every binding in a validation scope.
///
/// # Example
///
/// ```
/// use formscope::scope::ScopeOptions;
///
/// let options = ScopeOptions::new()
///     .error_input_marker("is-invalid")
///     .error_message_marker("text-danger")
///     .debounce_delay_ms(100);
/// assert!(options.is_complete());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ScopeOptions {
    /// Marker appended to an input's class when its field has errors.
    pub error_input_marker: Option<String>,

    /// Marker for rendered error messages.
    pub error_message_marker: Option<String>,

    /// Field validation debounce, in milliseconds.
    pub debounce_delay_ms: u64,

    /// Field reset debounce, in milliseconds.
    pub reset_delay_ms: u64,

    /// Error count aggregation debounce, in milliseconds.
    pub aggregate_delay_ms: u64,
}

impl Default for ScopeOptions {
    fn default() -> Self {
        Self {
            error_input_marker: None,
            error_message_marker: None,
            debounce_delay_ms: DEFAULT_DEBOUNCE_DELAY_MS,
            reset_delay_ms: DEFAULT_RESET_DELAY_MS,
            aggregate_delay_ms: DEFAULT_AGGREGATE_DELAY_MS,
        }
    }
}

impl ScopeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the input error marker.
    pub fn error_input_marker(mut self, marker: impl Into<String>) -> Self {
        self.error_input_marker = Some(marker.into());
        self
    }

    /// Set the error message marker.
    pub fn error_message_marker(mut self, marker: impl Into<String>) -> Self {
        self.error_message_marker = Some(marker.into());
        self
    }

    /// Set the field validation debounce.
    pub fn debounce_delay_ms(mut self, ms: u64) -> Self {
        self.debounce_delay_ms = ms;
        self
    }

    /// Set the reset debounce.
    pub fn reset_delay_ms(mut self, ms: u64) -> Self {
        self.reset_delay_ms = ms;
        self
    }

    /// Set the aggregation debounce.
    pub fn aggregate_delay_ms(mut self, ms: u64) -> Self {
        self.aggregate_delay_ms = ms;
        self
    }

    /// Both styling markers are set.
    pub fn is_complete(&self) -> bool {
        self.error_input_marker.is_some() && self.error_message_marker.is_some()
    }

    pub fn debounce_delay(&self) -> Duration {
        Duration::from_millis(self.debounce_delay_ms)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_millis(self.reset_delay_ms)
    }

    pub fn aggregate_delay(&self) -> Duration {
        Duration::from_millis(self.aggregate_delay_ms)
    }
}
