//! Runtime observability: typed events and pluggable sinks.
//!
//! The runtime emits a [`RuntimeEvent`] at every interesting edge (spawn,
//! exit, send, drop, timer fire, bus publish/evict) through an installed
//! [`Monitor`]. [`NoopMonitor`] discards everything; [`InMemoryMonitor`]
//! keeps a bounded history plus counters for tests and diagnostics.

pub mod in_memory;
pub mod noop;
pub mod traits;
pub mod types;

pub use in_memory::{InMemoryMonitor, MonitoringSnapshot};
pub use noop::NoopMonitor;
pub use traits::{EventSeverity, Monitor, MonitoringEvent};
pub use types::{
    ActorEvent, ActorEventKind, BusEvent, BusEventKind, MessageEvent, MessageEventKind,
    RuntimeEvent, TimerEvent, TimerEventKind,
};
