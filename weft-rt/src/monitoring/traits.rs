//! Core monitoring traits for runtime event observation.

// Layer 1: Standard library imports
use std::fmt::Debug;

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::Serialize;

// Layer 3: Internal module imports
use super::types::RuntimeEvent;

/// Event severity levels for filtering and categorization.
///
/// Ordered from lowest to highest severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum EventSeverity {
    /// Trace-level events for detailed debugging
    Trace,
    /// Debug-level events for development
    Debug,
    /// Informational events for normal operations
    Info,
    /// Warning events for potential issues
    Warning,
    /// Error events for failures
    Error,
}

/// Implemented by every event family the runtime can emit.
pub trait MonitoringEvent: Debug + Clone + Serialize {
    /// Static event type identifier for categorization.
    const EVENT_TYPE: &'static str;

    /// When this event occurred.
    fn timestamp(&self) -> DateTime<Utc>;

    /// Severity of this event.
    fn severity(&self) -> EventSeverity;
}

/// Sink for runtime events.
///
/// The runtime is single-threaded, so recording is synchronous and
/// infallible; sinks use interior mutability for their own state.
///
/// # Examples
/// ```rust
/// use std::cell::Cell;
/// use weft_rt::monitoring::{Monitor, RuntimeEvent};
///
/// struct Counter(Cell<usize>);
///
/// impl Monitor for Counter {
///     fn record(&self, _event: &RuntimeEvent) {
///         self.0.set(self.0.get() + 1);
///     }
/// }
/// ```
pub trait Monitor {
    /// Record one event.
    fn record(&self, event: &RuntimeEvent);
}
