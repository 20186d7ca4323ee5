//! `Runtime`: the owning handle an embedder drives.

// Layer 1: Standard library imports
use std::rc::Rc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::config::RuntimeConfig;
use super::core::RuntimeCore;
use super::ctx::Ctx;
use super::lifecycle::GroupSpec;
use crate::actor::{ActorConfig, ActorState};
use crate::bus::BusConfig;
use crate::error::{Error, Result};
use crate::message::{MsgClass, Tag};
use crate::monitoring::Monitor;
use crate::reactor::RemoteWaker;
use crate::util::{ActorId, BusId};

/// Live-record counts of the fixed pools; all zero once every actor is
/// cleaned up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub mail_entries: usize,
    pub payload_bufs: usize,
    pub timers: usize,
}

/// One runtime instance: actor table, pools, arena, timer service, buses,
/// registry, reactor, and scheduler, owned together.
///
/// The runtime is single-threaded and `!Send`; exactly one actor runs at a
/// time, and every blocking operation is a cooperative suspension point.
///
/// # Examples
///
/// ```rust,no_run
/// use weft_rt::{ActorConfig, Runtime, RuntimeConfig, Timeout};
///
/// let rt = Runtime::new(RuntimeConfig::default()).unwrap();
/// let echo = rt
///     .spawn(ActorConfig::new(), |ctx| {
///         let msg = ctx.recv(Timeout::Never).unwrap();
///         assert_eq!(msg.data, b"ping");
///         ctx.exit();
///     })
///     .unwrap();
/// rt.notify(echo, b"ping").unwrap();
/// rt.run();
/// ```
pub struct Runtime {
    core: Box<RuntimeCore>,
}

impl Runtime {
    /// Build a runtime; subsystem construction failures unwind the already
    /// built parts in reverse order.
    pub fn new(cfg: RuntimeConfig) -> Result<Self> {
        Ok(Self {
            core: RuntimeCore::new(cfg)?,
        })
    }

    /// Spawn one actor.
    pub fn spawn<F>(&self, cfg: ActorConfig, entry: F) -> Result<ActorId>
    where
        F: FnOnce(&mut Ctx) + 'static,
    {
        self.core.spawn_boxed(cfg, Box::new(entry))
    }

    /// Spawn a sibling group; each member sees the whole group's spawn
    /// info. All-or-nothing.
    pub fn spawn_group(&self, specs: Vec<GroupSpec>) -> Result<Vec<ActorId>> {
        self.core.spawn_group_inner(specs)
    }

    /// Run until every actor is dead or shutdown is requested.
    pub fn run(&self) {
        self.core.run();
    }

    /// Run until no actor is ready; the building block for external event
    /// loops and simulated time.
    pub fn run_until_blocked(&self) {
        self.core.run_until_blocked();
    }

    /// Advance simulated time by `delta_us` microseconds. The first call
    /// switches the timer service into simulation, migrating wall-clock
    /// timers. Fires are delivered as TIMER messages before returning.
    pub fn advance_time(&self, delta_us: u64) {
        self.core.advance_time(delta_us);
    }

    /// Ask `run()` to return after the current dispatch.
    pub fn request_shutdown(&self) {
        self.core.request_shutdown();
    }

    /// Inject a NOTIFY from outside the actor world (sender is INVALID).
    pub fn notify(&self, to: ActorId, data: &[u8]) -> Result<()> {
        self.core
            .send_internal(to, ActorId::INVALID, MsgClass::Notify, Tag::ZERO, data)
    }

    /// Inject a message with explicit class and tag.
    pub fn send(&self, to: ActorId, class: MsgClass, tag: Tag, data: &[u8]) -> Result<()> {
        self.core.send_internal(to, ActorId::INVALID, class, tag, data)
    }

    /// Kill an actor from outside.
    pub fn kill(&self, target: ActorId) -> Result<()> {
        self.core.kill(None, target)
    }

    /// True iff `id` names a live actor.
    pub fn alive(&self, id: ActorId) -> bool {
        self.core.actors.borrow().alive(id)
    }

    /// Lifecycle state of a live actor; `None` once it is dead.
    pub fn state(&self, id: ActorId) -> Option<ActorState> {
        let actors = self.core.actors.borrow();
        let slot = actors.resolve(id)?;
        Some(actors.slot(slot).state)
    }

    /// Pending mailbox messages of a live actor.
    pub fn pending(&self, id: ActorId) -> Option<usize> {
        let actors = self.core.actors.borrow();
        let slot = actors.resolve(id)?;
        Some(actors.slot(slot).mailbox.count())
    }

    /// Registry lookup.
    pub fn whereis(&self, name: &str) -> Option<ActorId> {
        self.core.registry.borrow().whereis(name)
    }

    // --- Bus surface for embedders and tests ---

    pub fn create_bus(&self, cfg: BusConfig) -> Result<BusId> {
        self.core.create_bus(cfg)
    }

    pub fn destroy_bus(&self, id: BusId) -> Result<()> {
        self.core.destroy_bus(id)
    }

    /// Publish from outside the actor world.
    pub fn publish(&self, id: BusId, data: &[u8]) -> Result<()> {
        self.core.publish_inner(id, data)
    }

    pub fn bus_subscriber_count(&self, id: BusId) -> Result<usize> {
        self.core
            .buses
            .borrow()
            .get(id)
            .map(|b| b.subscriber_count())
            .ok_or(Error::invalid("unknown bus id"))
    }

    pub fn bus_entry_count(&self, id: BusId) -> Result<usize> {
        self.core
            .buses
            .borrow()
            .get(id)
            .map(|b| b.entry_count())
            .ok_or(Error::invalid("unknown bus id"))
    }

    // --- Observability ---

    /// Install an event sink.
    pub fn set_monitor(&self, monitor: Rc<dyn Monitor>) {
        self.core.set_monitor(monitor);
    }

    /// A `Send + Clone` handle that interrupts the reactor sleep, so other
    /// threads can nudge an idle `run()` loop.
    pub fn waker(&self) -> Result<RemoteWaker> {
        self.core.reactor.waker()
    }

    /// Live-record counts of the fixed pools.
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            mail_entries: self.core.entries.borrow().allocated(),
            payload_bufs: self.core.bufs.borrow().allocated(),
            timers: self.core.timers.borrow().allocated(),
        }
    }

    /// Bytes currently handed out by the stack arena.
    pub fn arena_in_use(&self) -> usize {
        self.core.arena.borrow().in_use()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("stats", &self.pool_stats())
            .finish()
    }
}
