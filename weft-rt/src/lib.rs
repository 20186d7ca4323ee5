//! # weft-rt - Embeddable Cooperative Actor Runtime
//!
//! Many lightweight stackful actors, each with its own stack, exchanging
//! typed byte messages through private mailboxes and shared topic buses,
//! coordinated by timers and an epoll readiness reactor — all owned by one
//! single-threaded [`Runtime`] value.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use weft_rt::{ActorConfig, Runtime, RuntimeConfig, Timeout};
//!
//! let rt = Runtime::new(RuntimeConfig::default()).unwrap();
//!
//! let pong = rt
//!     .spawn(ActorConfig::new().with_name("pong"), |ctx| {
//!         let msg = ctx.recv(Timeout::Never).unwrap();
//!         let sender = msg.sender;
//!         ctx.notify(sender, b"pong").unwrap();
//!         ctx.exit();
//!     })
//!     .unwrap();
//!
//! rt.spawn(ActorConfig::new().with_name("ping"), move |ctx| {
//!     ctx.notify(pong, b"ping").unwrap();
//!     let reply = ctx.recv(Timeout::Never).unwrap();
//!     assert_eq!(reply.data, b"pong");
//!     ctx.exit();
//! })
//! .unwrap();
//!
//! rt.run();
//! ```
//!
//! # Core Concepts
//!
//! - **Actors** are cooperatively scheduled on their own stacks (allocated
//!   from a first-fit arena, guard words at both ends). They suspend only
//!   at explicit points: `yield_now`, `exit`, blocking receives, selects,
//!   bus reads, fd waits, and `sleep`.
//! - **Mailboxes** carry `class << 28 | tag` headed byte messages with
//!   selective receive and request/reply correlation.
//! - **Select** is the single blocking primitive: wait on any of several
//!   mailbox filters and bus topics at once; bus data outranks IPC.
//! - **Buses** are bounded rings with per-subscriber read tracking and
//!   drop-oldest, age, and read-count retention.
//! - **Timers** run against a wall clock (timerfd + epoll) or simulated
//!   time (`advance_time`), switchable at runtime.
//! - **Links and monitors** turn actor deaths into EXIT messages.
//!
//! # Module Organization
//!
//! - [`actor`] - States, exit reasons, spawn config, priorities
//! - [`message`] - Wire format, filters, payload views
//! - [`alloc`] - Fixed pools and the stack arena
//! - [`bus`] - Topic buses
//! - [`monitoring`] - Event observation and counters
//! - [`runtime`] - The runtime, scheduler, select, and the `Ctx` actor API
//! - [`util`] - Identifier newtypes

pub mod actor;
pub mod alloc;
pub(crate) mod arch;
pub mod bus;
pub mod error;
pub(crate) mod mailbox;
pub mod message;
pub mod monitoring;
pub mod prelude;
pub(crate) mod reactor;
pub(crate) mod registry;
pub mod runtime;
pub(crate) mod timer;
pub mod util;

// Re-export commonly used types
pub use actor::{ActorConfig, ActorState, ExitReason, Priority, SpawnInfo};
pub use bus::BusConfig;
pub use error::{Error, ErrorCode, Result};
pub use message::{ExitInfo, Message, MsgClass, MsgInfo, RecvFilter, Tag, MAX_MESSAGE_SIZE};
pub use monitoring::{InMemoryMonitor, Monitor, NoopMonitor};
pub use reactor::RemoteWaker;
pub use runtime::{Ctx, GroupSpec, PoolStats, Runtime, RuntimeConfig, Selected, Source, Timeout};
pub use util::{ActorId, BusId, MonitorRef, TimerId};
