//! Convenience re-exports for typical embedders.
//!
//! ```rust
//! use weft_rt::prelude::*;
//! ```

pub use crate::actor::{ActorConfig, ActorState, ExitReason, Priority, SpawnInfo};
pub use crate::bus::BusConfig;
pub use crate::error::{Error, ErrorCode, Result};
pub use crate::message::{Message, MsgClass, MsgInfo, RecvFilter, Tag};
pub use crate::monitoring::{InMemoryMonitor, Monitor, NoopMonitor};
pub use crate::runtime::{Ctx, GroupSpec, Runtime, RuntimeConfig, Selected, Source, Timeout};
pub use crate::util::{ActorId, BusId, MonitorRef, TimerId};
