//! Zero-overhead monitor that discards every event.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::traits::Monitor;
use super::types::RuntimeEvent;

/// The default sink: every `record` call compiles down to nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMonitor;

impl NoopMonitor {
    pub const fn new() -> Self {
        Self
    }
}

impl Monitor for NoopMonitor {
    #[inline]
    fn record(&self, _event: &RuntimeEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitoring::types::{BusEventKind, RuntimeEvent};
    use crate::util::BusId;

    #[test]
    fn test_noop_accepts_events() {
        let monitor = NoopMonitor::new();
        monitor.record(&RuntimeEvent::bus(BusEventKind::Created {
            id: BusId::from_raw(1),
        }));
    }
}
