//! Concrete event families emitted by the runtime.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use chrono::{DateTime, Utc};
use serde::Serialize;

// Layer 3: Internal module imports
use super::traits::{EventSeverity, MonitoringEvent};
use crate::actor::{ExitReason, Priority};
use crate::message::MsgClass;
use crate::util::{ActorId, BusId, TimerId};

/// Actor lifecycle events.
#[derive(Debug, Clone, Serialize)]
pub struct ActorEvent {
    pub at: DateTime<Utc>,
    pub kind: ActorEventKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum ActorEventKind {
    Spawned {
        id: ActorId,
        priority: Priority,
        name: Option<&'static str>,
    },
    Exited {
        id: ActorId,
        reason: ExitReason,
    },
}

impl MonitoringEvent for ActorEvent {
    const EVENT_TYPE: &'static str = "actor";

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn severity(&self) -> EventSeverity {
        match &self.kind {
            ActorEventKind::Spawned { .. } => EventSeverity::Debug,
            ActorEventKind::Exited { reason, .. } => match reason {
                ExitReason::Normal => EventSeverity::Debug,
                ExitReason::Killed => EventSeverity::Info,
                ExitReason::Crash | ExitReason::CrashStack => EventSeverity::Error,
            },
        }
    }
}

/// Message fabric events.
#[derive(Debug, Clone, Serialize)]
pub struct MessageEvent {
    pub at: DateTime<Utc>,
    pub kind: MessageEventKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum MessageEventKind {
    Sent {
        from: ActorId,
        to: ActorId,
        class: MsgClass,
        len: usize,
    },
    /// A send that failed for lack of pool space.
    Dropped { to: ActorId },
}

impl MonitoringEvent for MessageEvent {
    const EVENT_TYPE: &'static str = "message";

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn severity(&self) -> EventSeverity {
        match self.kind {
            MessageEventKind::Sent { .. } => EventSeverity::Trace,
            MessageEventKind::Dropped { .. } => EventSeverity::Warning,
        }
    }
}

/// Timer service events.
#[derive(Debug, Clone, Serialize)]
pub struct TimerEvent {
    pub at: DateTime<Utc>,
    pub kind: TimerEventKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum TimerEventKind {
    Fired { id: TimerId, owner: ActorId },
    Cancelled { id: TimerId },
}

impl MonitoringEvent for TimerEvent {
    const EVENT_TYPE: &'static str = "timer";

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn severity(&self) -> EventSeverity {
        EventSeverity::Trace
    }
}

/// Bus events.
#[derive(Debug, Clone, Serialize)]
pub struct BusEvent {
    pub at: DateTime<Utc>,
    pub kind: BusEventKind,
}

#[derive(Debug, Clone, Serialize)]
pub enum BusEventKind {
    Created { id: BusId },
    Published { id: BusId, len: usize },
    Destroyed { id: BusId },
}

impl MonitoringEvent for BusEvent {
    const EVENT_TYPE: &'static str = "bus";

    fn timestamp(&self) -> DateTime<Utc> {
        self.at
    }

    fn severity(&self) -> EventSeverity {
        match self.kind {
            BusEventKind::Published { .. } => EventSeverity::Trace,
            _ => EventSeverity::Debug,
        }
    }
}

/// Union of every event family, as delivered to a [`Monitor`](super::Monitor).
#[derive(Debug, Clone, Serialize)]
pub enum RuntimeEvent {
    Actor(ActorEvent),
    Message(MessageEvent),
    Timer(TimerEvent),
    Bus(BusEvent),
}

impl RuntimeEvent {
    pub fn actor(kind: ActorEventKind) -> Self {
        Self::Actor(ActorEvent {
            at: Utc::now(),
            kind,
        })
    }

    pub fn message(kind: MessageEventKind) -> Self {
        Self::Message(MessageEvent {
            at: Utc::now(),
            kind,
        })
    }

    pub fn timer(kind: TimerEventKind) -> Self {
        Self::Timer(TimerEvent {
            at: Utc::now(),
            kind,
        })
    }

    pub fn bus(kind: BusEventKind) -> Self {
        Self::Bus(BusEvent {
            at: Utc::now(),
            kind,
        })
    }
}

impl MonitoringEvent for RuntimeEvent {
    const EVENT_TYPE: &'static str = "runtime";

    fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::Actor(e) => e.timestamp(),
            Self::Message(e) => e.timestamp(),
            Self::Timer(e) => e.timestamp(),
            Self::Bus(e) => e.timestamp(),
        }
    }

    fn severity(&self) -> EventSeverity {
        match self {
            Self::Actor(e) => e.severity(),
            Self::Message(e) => e.severity(),
            Self::Timer(e) => e.severity(),
            Self::Bus(e) => e.severity(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_mapping() {
        let crash = RuntimeEvent::actor(ActorEventKind::Exited {
            id: ActorId::from_raw(1),
            reason: ExitReason::Crash,
        });
        assert_eq!(crash.severity(), EventSeverity::Error);
        let sent = RuntimeEvent::message(MessageEventKind::Sent {
            from: ActorId::from_raw(1),
            to: ActorId::from_raw(2),
            class: MsgClass::Notify,
            len: 4,
        });
        assert_eq!(sent.severity(), EventSeverity::Trace);
    }

    #[test]
    fn test_events_serialize() {
        let event = RuntimeEvent::bus(BusEventKind::Published {
            id: BusId::from_raw(1),
            len: 16,
        });
        let json = serde_json::to_string(&event).map_err(|_| ()).ok();
        assert!(json.is_some_and(|j| j.contains("Published")));
    }
}
