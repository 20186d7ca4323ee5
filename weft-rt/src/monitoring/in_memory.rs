//! In-memory monitor with bounded history and counters.

// Layer 1: Standard library imports
use std::cell::RefCell;
use std::collections::VecDeque;

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
use super::traits::Monitor;
use super::types::{
    ActorEventKind, BusEventKind, MessageEventKind, RuntimeEvent, TimerEventKind,
};

/// Default bound on retained events.
const DEFAULT_HISTORY: usize = 1024;

/// Counter snapshot of everything the monitor has seen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MonitoringSnapshot {
    pub actors_spawned: u64,
    pub actors_exited: u64,
    pub messages_sent: u64,
    pub messages_dropped: u64,
    pub timers_fired: u64,
    pub timers_cancelled: u64,
    pub bus_published: u64,
    pub events_recorded: u64,
}

#[derive(Debug, Default)]
struct Inner {
    history: VecDeque<RuntimeEvent>,
    snapshot: MonitoringSnapshot,
}

/// Monitor keeping the last N events plus running counters.
///
/// # Examples
/// ```rust
/// use weft_rt::monitoring::{InMemoryMonitor, Monitor, RuntimeEvent};
/// use weft_rt::monitoring::types::MessageEventKind;
/// use weft_rt::util::ActorId;
/// use weft_rt::message::MsgClass;
///
/// let monitor = InMemoryMonitor::new();
/// monitor.record(&RuntimeEvent::message(MessageEventKind::Sent {
///     from: ActorId::from_raw(1),
///     to: ActorId::from_raw(2),
///     class: MsgClass::Notify,
///     len: 4,
/// }));
/// assert_eq!(monitor.snapshot().messages_sent, 1);
/// ```
#[derive(Debug)]
pub struct InMemoryMonitor {
    max_history: usize,
    inner: RefCell<Inner>,
}

impl InMemoryMonitor {
    pub fn new() -> Self {
        Self::with_history(DEFAULT_HISTORY)
    }

    pub fn with_history(max_history: usize) -> Self {
        Self {
            max_history,
            inner: RefCell::new(Inner::default()),
        }
    }

    /// Copy of the counter snapshot.
    pub fn snapshot(&self) -> MonitoringSnapshot {
        self.inner.borrow().snapshot
    }

    /// Clone of the retained history, oldest first.
    pub fn events(&self) -> Vec<RuntimeEvent> {
        self.inner.borrow().history.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.history.clear();
        inner.snapshot = MonitoringSnapshot::default();
    }
}

impl Default for InMemoryMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl Monitor for InMemoryMonitor {
    fn record(&self, event: &RuntimeEvent) {
        let mut inner = self.inner.borrow_mut();
        let snap = &mut inner.snapshot;
        snap.events_recorded += 1;
        match event {
            RuntimeEvent::Actor(e) => match e.kind {
                ActorEventKind::Spawned { .. } => snap.actors_spawned += 1,
                ActorEventKind::Exited { .. } => snap.actors_exited += 1,
            },
            RuntimeEvent::Message(e) => match e.kind {
                MessageEventKind::Sent { .. } => snap.messages_sent += 1,
                MessageEventKind::Dropped { .. } => snap.messages_dropped += 1,
            },
            RuntimeEvent::Timer(e) => match e.kind {
                TimerEventKind::Fired { .. } => snap.timers_fired += 1,
                TimerEventKind::Cancelled { .. } => snap.timers_cancelled += 1,
            },
            RuntimeEvent::Bus(e) => {
                if let BusEventKind::Published { .. } = e.kind {
                    snap.bus_published += 1;
                }
            }
        }
        if inner.history.len() == self.max_history {
            inner.history.pop_front();
        }
        inner.history.push_back(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::ExitReason;
    use crate::util::ActorId;

    fn exited(id: u32) -> RuntimeEvent {
        RuntimeEvent::actor(ActorEventKind::Exited {
            id: ActorId::from_raw(id),
            reason: ExitReason::Normal,
        })
    }

    #[test]
    fn test_counters_accumulate() {
        let monitor = InMemoryMonitor::new();
        monitor.record(&exited(1));
        monitor.record(&exited(2));
        let snap = monitor.snapshot();
        assert_eq!(snap.actors_exited, 2);
        assert_eq!(snap.events_recorded, 2);
    }

    #[test]
    fn test_history_is_bounded() {
        let monitor = InMemoryMonitor::with_history(2);
        for i in 0..5 {
            monitor.record(&exited(i));
        }
        assert_eq!(monitor.events().len(), 2);
        assert_eq!(monitor.snapshot().events_recorded, 5);
    }

    #[test]
    fn test_clear_resets() {
        let monitor = InMemoryMonitor::new();
        monitor.record(&exited(1));
        monitor.clear();
        assert_eq!(monitor.snapshot(), MonitoringSnapshot::default());
        assert!(monitor.events().is_empty());
    }
}
