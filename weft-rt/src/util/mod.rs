//! Utilities: identifier newtypes shared across the runtime.

pub mod ids;

pub use ids::{ActorId, BusId, MonitorRef, TimerId};
