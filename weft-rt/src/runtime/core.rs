//! The process-wide runtime state: every table, pool, and service, owned by
//! one value.
//!
//! All mutable state sits behind `RefCell`s so the scheduler, the running
//! actor, and the subsystems can share `&RuntimeCore` without aliasing
//! `&mut`. The discipline that makes this sound: **no borrow is ever held
//! across a context switch** — every operation borrows, mutates, releases,
//! and only then yields.

// Layer 1: Standard library imports
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// Layer 2: Third-party crate imports
use chrono::Utc;

// Layer 3: Internal module imports
use super::config::RuntimeConfig;
use crate::actor::table::ActorTable;
use crate::alloc::{Pool, StackArena};
use crate::bus::BusTable;
use crate::error::Result;
use crate::mailbox::MailEntry;
use crate::message::types::PayloadBuf;
use crate::message::Tag;
use crate::monitoring::{Monitor, RuntimeEvent};
use crate::reactor::Reactor;
use crate::registry::NameRegistry;
use crate::timer::TimerService;
use crate::util::ActorId;

/// Scheduler bookkeeping.
pub(crate) struct SchedState {
    /// The scheduler's own saved context (the `run()` caller's stack).
    pub sched_ctx: crate::arch::Context,
    /// Slot of the actor currently running, if any.
    pub current: Option<usize>,
    /// Round-robin cursor per priority level.
    pub last_run_idx: [usize; crate::actor::Priority::COUNT],
    /// Cooperative stop flag checked by `run()`.
    pub shutdown: bool,
}

impl SchedState {
    fn new() -> Self {
        Self {
            sched_ctx: crate::arch::Context::new(),
            current: None,
            // One past the cursor is where scanning starts, so the first
            // pick begins at slot 0.
            last_run_idx: [usize::MAX; crate::actor::Priority::COUNT],
            shutdown: false,
        }
    }
}

/// Everything one runtime instance owns. Boxed behind [`Runtime`]
/// (`super::handle::Runtime`) so its address is stable for the raw pointers
/// the context-switch machinery keeps.
pub(crate) struct RuntimeCore {
    pub cfg: RuntimeConfig,
    pub actors: RefCell<ActorTable>,
    pub entries: RefCell<Pool<MailEntry>>,
    pub bufs: RefCell<Pool<PayloadBuf>>,
    pub timers: RefCell<TimerService>,
    pub buses: RefCell<BusTable>,
    pub registry: RefCell<NameRegistry>,
    pub arena: RefCell<StackArena>,
    pub reactor: Reactor,
    pub sched: RefCell<SchedState>,
    monitor: RefCell<Option<Rc<dyn Monitor>>>,
    /// Sequence behind request call tags and monitor refs.
    tag_seq: Cell<u32>,
}

impl RuntimeCore {
    /// Build every subsystem. Construction is ordered leaves-first; on
    /// failure the already-built parts unwind in reverse through `Drop`.
    pub fn new(cfg: RuntimeConfig) -> Result<Box<Self>> {
        cfg.validate()?;
        let arena = StackArena::new(cfg.arena_size)?;
        let reactor = Reactor::new()?;
        Ok(Box::new(Self {
            cfg,
            actors: RefCell::new(ActorTable::new(cfg.max_actors)),
            entries: RefCell::new(Pool::new(cfg.mail_entry_count, "mailbox entry pool exhausted")),
            bufs: RefCell::new(Pool::new(cfg.msg_buf_count, "payload buffer pool exhausted")),
            timers: RefCell::new(TimerService::new(cfg.max_timers)),
            buses: RefCell::new(BusTable::new(cfg.max_buses)),
            registry: RefCell::new(NameRegistry::new(cfg.registry_capacity)),
            arena: RefCell::new(arena),
            reactor,
            sched: RefCell::new(SchedState::new()),
            monitor: RefCell::new(None),
            tag_seq: Cell::new(0),
        }))
    }

    /// Install (or replace) the event sink.
    pub fn set_monitor(&self, monitor: Rc<dyn Monitor>) {
        *self.monitor.borrow_mut() = Some(monitor);
    }

    /// Emit one event to the installed sink, if any.
    pub fn record(&self, event: RuntimeEvent) {
        if let Some(monitor) = self.monitor.borrow().as_ref() {
            monitor.record(&event);
        }
    }

    /// Fresh runtime-generated tag (bit 27 set, 27-bit sequence, never 0).
    pub fn issue_rt_tag(&self) -> u32 {
        loop {
            let next = (self.tag_seq.get() + 1) & (Tag::RUNTIME_BIT - 1);
            self.tag_seq.set(next);
            if next != 0 {
                return Tag::RUNTIME_BIT | next;
            }
        }
    }

    /// Wall or simulated "now" in milliseconds, for bus entry timestamps.
    /// Simulated mode counts from the switch to simulation; wall mode is the
    /// real clock, which may move backward (age expiry tolerates that).
    pub fn now_ms(&self) -> i64 {
        match self.timers.borrow().sim_now_us() {
            Some(us) => (us / 1_000) as i64,
            None => Utc::now().timestamp_millis(),
        }
    }

    // --- Bus operations shared by `Ctx` and `Runtime` ---

    pub fn create_bus(&self, cfg: crate::bus::BusConfig) -> Result<crate::util::BusId> {
        let id = self.buses.borrow_mut().create(cfg)?;
        self.record(RuntimeEvent::bus(crate::monitoring::BusEventKind::Created { id }));
        Ok(id)
    }

    pub fn destroy_bus(&self, id: crate::util::BusId) -> Result<()> {
        {
            let mut bufs = self.bufs.borrow_mut();
            self.buses.borrow_mut().destroy(id, &mut bufs)?;
        }
        self.record(RuntimeEvent::bus(crate::monitoring::BusEventKind::Destroyed { id }));
        Ok(())
    }

    pub fn bus_subscribe(&self, actor: ActorId, id: crate::util::BusId) -> Result<()> {
        let mut buses = self.buses.borrow_mut();
        let bus = buses
            .get_mut(id)
            .ok_or(crate::error::Error::invalid("unknown bus id"))?;
        bus.subscribe(actor).map(|_| ())
    }

    pub fn bus_unsubscribe(&self, actor: ActorId, id: crate::util::BusId) -> Result<()> {
        let mut buses = self.buses.borrow_mut();
        let bus = buses
            .get_mut(id)
            .ok_or(crate::error::Error::invalid("unknown bus id"))?;
        bus.unsubscribe(actor)
    }

    /// Publish and wake blocked select waiters referencing the bus.
    pub fn publish_inner(&self, id: crate::util::BusId, data: &[u8]) -> Result<()> {
        let now = self.now_ms();
        let woken = {
            let mut buses = self.buses.borrow_mut();
            let mut bufs = self.bufs.borrow_mut();
            let bus = buses
                .get_mut(id)
                .ok_or(crate::error::Error::invalid("unknown bus id"))?;
            bus.publish(&mut bufs, now, data)?
        };
        self.record(RuntimeEvent::bus(crate::monitoring::BusEventKind::Published {
            id,
            len: data.len(),
        }));
        self.wake_bus_waiters(id, &woken);
        Ok(())
    }

    /// Non-blocking bus read into a caller buffer.
    pub fn bus_read_inner(
        &self,
        actor: ActorId,
        id: crate::util::BusId,
        dst: &mut [u8],
    ) -> Result<usize> {
        let mut buses = self.buses.borrow_mut();
        let mut bufs = self.bufs.borrow_mut();
        let bus = buses
            .get_mut(id)
            .ok_or(crate::error::Error::invalid("unknown bus id"))?;
        bus.read_into(actor, &mut bufs, dst)
    }
}
