//! `Ctx`: the API an actor sees while running.
//!
//! Every actor entry receives `&mut Ctx`. All blocking calls (`recv`,
//! `select`, `sleep`, `request`, bus waits, fd waits) suspend the actor by
//! switching back to the scheduler; non-blocking variants never suspend.
//! Received payload views borrow the `Ctx` mutably, so the borrow checker
//! enforces the active-message lifetime: drop the view before the next
//! receive.

// Layer 1: Standard library imports
use std::os::unix::io::RawFd;
use std::rc::Rc;
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::core::RuntimeCore;
use super::lifecycle::GroupSpec;
use super::sched::ExitSignal;
use super::select::{ScanHit, Selected, Source};
use super::timeout::Timeout;
use crate::actor::{ActorConfig, SpawnInfo};
use crate::bus::BusConfig;
use crate::error::{Error, Result};
use crate::message::{Message, MsgClass, MsgInfo, RecvFilter, Tag};
use crate::monitoring::{RuntimeEvent, TimerEventKind};
use crate::runtime::config::MAX_RECV_FILTERS;
use crate::util::{ActorId, BusId, MonitorRef, TimerId};

/// Handle to the runtime held by a running actor.
///
/// # Examples
///
/// ```rust,no_run
/// use weft_rt::{ActorConfig, Runtime, RuntimeConfig, Timeout};
///
/// let rt = Runtime::new(RuntimeConfig::default()).unwrap();
/// rt.spawn(ActorConfig::new().with_name("echo"), |ctx| {
///     while let Ok(msg) = ctx.recv(Timeout::Never) {
///         let sender = msg.sender;
///         let bytes = msg.data.to_vec();
///         if ctx.notify(sender, &bytes).is_err() {
///             break;
///         }
///     }
///     ctx.exit();
/// })
/// .unwrap();
/// rt.run();
/// ```
pub struct Ctx {
    core: *const RuntimeCore,
    id: ActorId,
    slot: usize,
}

impl Ctx {
    pub(crate) fn new(core: &RuntimeCore, id: ActorId, slot: usize) -> Self {
        Self {
            core: core as *const RuntimeCore,
            id,
            slot,
        }
    }

    fn core(&self) -> &RuntimeCore {
        // SAFETY: a Ctx only exists while its actor runs inside the
        // runtime's `run` loop, and the boxed core outlives that.
        unsafe { &*self.core }
    }

    /// This actor's id.
    pub fn id(&self) -> ActorId {
        self.id
    }

    /// Spawn-info of this actor's group; one element for standalone spawns.
    pub fn siblings(&self) -> Rc<[SpawnInfo]> {
        self.core()
            .actors
            .borrow()
            .slot(self.slot)
            .siblings
            .clone()
            .unwrap_or_else(|| Rc::from(Vec::new()))
    }

    /// True iff `id` names a live actor.
    pub fn alive(&self, id: ActorId) -> bool {
        self.core().actors.borrow().alive(id)
    }

    /// Give up the CPU; the scheduler re-queues this actor as ready.
    pub fn yield_now(&mut self) {
        self.core().yield_to_scheduler();
    }

    /// Terminate this actor with reason `Normal`. Unwinds to the actor
    /// trampoline so destructors of live frames run.
    pub fn exit(&mut self) -> ! {
        std::panic::resume_unwind(Box::new(ExitSignal))
    }

    /// Cooperative stop: `run()` returns after the current dispatch.
    pub fn request_shutdown(&mut self) {
        self.core().request_shutdown();
    }

    // --- Spawning and death ---

    pub fn spawn<F>(&mut self, cfg: ActorConfig, entry: F) -> Result<ActorId>
    where
        F: FnOnce(&mut Ctx) + 'static,
    {
        self.core().spawn_boxed(cfg, Box::new(entry))
    }

    pub fn spawn_group(&mut self, specs: Vec<GroupSpec>) -> Result<Vec<ActorId>> {
        self.core().spawn_group_inner(specs)
    }

    /// Terminate another actor (never yourself; use [`exit`](Self::exit)).
    pub fn kill(&mut self, target: ActorId) -> Result<()> {
        self.core().kill(Some(self.id), target)
    }

    // --- Mailbox IPC ---

    /// Fire-and-forget NOTIFY with tag 0.
    pub fn notify(&mut self, to: ActorId, data: &[u8]) -> Result<()> {
        self.core()
            .send_internal(to, self.id, MsgClass::Notify, Tag::ZERO, data)
    }

    /// Send with explicit class and tag.
    pub fn send(&mut self, to: ActorId, class: MsgClass, tag: Tag, data: &[u8]) -> Result<()> {
        self.core().send_internal(to, self.id, class, tag, data)
    }

    /// Receive the next message of any kind.
    pub fn recv(&mut self, timeout: Timeout) -> Result<Message<'_>> {
        self.recv_matches(&[RecvFilter::ANY], timeout).map(|(m, _)| m)
    }

    /// Receive the first message matching `(sender, class, tag)`; each
    /// component may be its wildcard.
    pub fn recv_match(
        &mut self,
        sender: ActorId,
        class: MsgClass,
        tag: Tag,
        timeout: Timeout,
    ) -> Result<Message<'_>> {
        self.recv_matches(&[RecvFilter::new(sender, class, tag)], timeout)
            .map(|(m, _)| m)
    }

    /// Selective receive over up to 16 filters. Returns the message and the
    /// index of the filter that matched; unmatched traffic stays queued in
    /// arrival order.
    pub fn recv_matches(
        &mut self,
        filters: &[RecvFilter],
        timeout: Timeout,
    ) -> Result<(Message<'_>, usize)> {
        if filters.is_empty() || filters.len() > MAX_RECV_FILTERS {
            return Err(Error::invalid("bad receive filter count"));
        }
        let sources: Vec<Source> = filters.iter().map(|f| Source::Ipc(*f)).collect();
        let core = self.core();
        match core.select_wait(self.slot, &sources, timeout)? {
            ScanHit::Ipc { index } => Ok((core.active_message_view(self.slot)?, index)),
            ScanHit::Bus { .. } => Err(Error::invalid("unexpected bus hit in receive")),
        }
    }

    /// Synchronous call: send a REQUEST and wait for the correlated REPLY.
    /// A peer that dies first yields `Closed`; an unanswered call times out.
    pub fn request(&mut self, to: ActorId, data: &[u8], timeout: Timeout) -> Result<Message<'_>> {
        let core = self.core();
        let mref = core.monitor_target(self.slot, to)?;
        let call_tag = Tag::new(core.issue_rt_tag());
        if let Err(err) = core.send_internal(to, self.id, MsgClass::Request, call_tag, data) {
            let _ = core.demonitor(self.slot, mref);
            return Err(err);
        }
        let sources = [
            Source::Ipc(RecvFilter::new(to, MsgClass::Reply, call_tag)),
            Source::Ipc(RecvFilter::new(to, MsgClass::Exit, Tag::WILDCARD)),
        ];
        let outcome = core.select_wait(self.slot, &sources, timeout);
        let _ = core.demonitor(self.slot, mref);
        // Sweep the monitor's EXIT if it raced in but lost.
        core.purge_mailbox(
            self.slot,
            &RecvFilter::new(to, MsgClass::Exit, Tag::new(mref.raw())),
        );
        match outcome? {
            ScanHit::Ipc { index: 0 } => core.active_message_view(self.slot),
            ScanHit::Ipc { .. } => Err(Error::closed("request target died")),
            ScanHit::Bus { .. } => Err(Error::invalid("unexpected bus hit in request")),
        }
    }

    /// Answer a REQUEST, preserving its tag for correlation.
    pub fn reply(&mut self, req: &MsgInfo, data: &[u8]) -> Result<()> {
        if req.class != MsgClass::Request {
            return Err(Error::invalid("reply target is not a request"));
        }
        self.core()
            .send_internal(req.sender, self.id, MsgClass::Reply, req.tag, data)
    }

    // --- Select ---

    /// Wait on any of up to 16 mailbox filters and bus topics. Bus sources
    /// are always scanned before IPC sources. May return `WouldBlock` after
    /// a wake that satisfied none of the sources (spurious wakeup).
    pub fn select(&mut self, sources: &[Source], timeout: Timeout) -> Result<Selected<'_>> {
        let core = self.core();
        match core.select_wait(self.slot, sources, timeout)? {
            ScanHit::Ipc { index } => Ok(Selected::Ipc {
                index,
                msg: core.active_message_view(self.slot)?,
            }),
            ScanHit::Bus { index, len } => Ok(Selected::Bus {
                index,
                data: core.active_bus_view(self.slot, len)?,
            }),
        }
    }

    // --- Timers ---

    /// One-shot timer; delivers one TIMER message tagged with the id.
    pub fn after(&mut self, d: Duration) -> Result<TimerId> {
        let core = self.core();
        core.timers
            .borrow_mut()
            .create(&core.reactor, self.id, d.as_micros() as u64, false)
    }

    /// Periodic timer; delivers a TIMER message every interval.
    pub fn every(&mut self, d: Duration) -> Result<TimerId> {
        let core = self.core();
        core.timers
            .borrow_mut()
            .create(&core.reactor, self.id, d.as_micros() as u64, true)
    }

    /// Cancel a timer this actor owns; stale firings are swept from the
    /// mailbox.
    pub fn cancel_timer(&mut self, id: TimerId) -> Result<()> {
        let core = self.core();
        if core.timers.borrow().owner_of(id) != Some(self.id) {
            return Err(Error::invalid("timer not owned by caller"));
        }
        core.timers.borrow_mut().cancel(&core.reactor, id)?;
        core.purge_mailbox(
            self.slot,
            &RecvFilter::new(self.id, MsgClass::Timer, Tag::new(id.raw())),
        );
        core.record(RuntimeEvent::timer(TimerEventKind::Cancelled { id }));
        Ok(())
    }

    /// Block for `d`, leaving unrelated mailbox traffic untouched.
    pub fn sleep(&mut self, d: Duration) -> Result<()> {
        let id = self.after(d)?;
        let tag = Tag::new(id.raw());
        loop {
            match self.recv_match(self.id, MsgClass::Timer, tag, Timeout::Never) {
                Ok(_) => return Ok(()),
                // Unrelated TIMER traffic can wake the wait spuriously.
                Err(err) if err.is_would_block() => continue,
                Err(err) => return Err(err),
            }
        }
    }

    // --- Bus ---

    pub fn create_bus(&mut self, cfg: BusConfig) -> Result<BusId> {
        self.core().create_bus(cfg)
    }

    /// Destroy a bus; fails while it still has subscribers.
    pub fn destroy_bus(&mut self, id: BusId) -> Result<()> {
        self.core().destroy_bus(id)
    }

    pub fn subscribe(&mut self, id: BusId) -> Result<()> {
        self.core().bus_subscribe(self.id, id)
    }

    pub fn unsubscribe(&mut self, id: BusId) -> Result<()> {
        self.core().bus_unsubscribe(self.id, id)
    }

    pub fn publish(&mut self, id: BusId, data: &[u8]) -> Result<()> {
        self.core().publish_inner(id, data)
    }

    /// Non-blocking read of the next unread entry; `WouldBlock` when none.
    /// Truncates into `dst` but reports the entry's full length.
    pub fn bus_read(&mut self, id: BusId, dst: &mut [u8]) -> Result<usize> {
        self.core().bus_read_inner(self.id, id, dst)
    }

    /// Blocking read: select on this single bus and copy the entry out.
    pub fn bus_read_wait(&mut self, id: BusId, dst: &mut [u8], timeout: Timeout) -> Result<usize> {
        let core = self.core();
        match core.select_wait(self.slot, &[Source::Bus(id)], timeout)? {
            ScanHit::Bus { len, .. } => {
                let data = core.active_bus_view(self.slot, len)?;
                let n = len.min(dst.len());
                dst[..n].copy_from_slice(&data[..n]);
                Ok(len)
            }
            ScanHit::Ipc { .. } => Err(Error::invalid("unexpected ipc hit in bus read")),
        }
    }

    // --- Links, monitors, registry ---

    /// Symmetric death notification with `target`.
    pub fn link(&mut self, target: ActorId) -> Result<()> {
        self.core().link(self.slot, target)
    }

    pub fn unlink(&mut self, target: ActorId) -> Result<()> {
        self.core().unlink(self.slot, target)
    }

    /// One-way death notification; the returned ref tags the EXIT message.
    pub fn monitor(&mut self, target: ActorId) -> Result<MonitorRef> {
        self.core().monitor_target(self.slot, target)
    }

    pub fn demonitor(&mut self, mref: MonitorRef) -> Result<()> {
        self.core().demonitor(self.slot, mref)
    }

    /// Bind a name to this actor; removed automatically at death.
    pub fn register(&mut self, name: &'static str) -> Result<()> {
        self.core().registry.borrow_mut().register(name, self.id)
    }

    pub fn unregister(&mut self, name: &str) -> Result<()> {
        self.core().registry.borrow_mut().unregister(name, self.id)
    }

    pub fn whereis(&self, name: &str) -> Option<ActorId> {
        self.core().registry.borrow().whereis(name)
    }

    // --- fd readiness (the Network reactor contract) ---

    /// Block until `fd` is readable.
    pub fn wait_readable(&mut self, fd: RawFd, timeout: Timeout) -> Result<()> {
        self.core().fd_wait(self.slot, fd, false, timeout)
    }

    /// Block until `fd` is writable.
    pub fn wait_writable(&mut self, fd: RawFd, timeout: Timeout) -> Result<()> {
        self.core().fd_wait(self.slot, fd, true, timeout)
    }
}

impl std::fmt::Debug for Ctx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ctx")
            .field("id", &self.id)
            .field("slot", &self.slot)
            .finish()
    }
}
