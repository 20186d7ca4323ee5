//! The cooperative priority round-robin scheduler.
//!
//! One dispatch step: pick the highest-priority ready actor (round-robin
//! within a level), switch onto its stack, and on return verify its stack
//! guards and classify the outcome. Between actor runs the reactor is
//! drained so timerfd and fd readiness turn into messages and wakeups.

// Layer 1: Standard library imports
use std::os::fd::BorrowedFd;
use std::os::unix::io::RawFd;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

// Layer 2: Third-party crate imports
use tracing::{error, trace, warn};

// Layer 3: Internal module imports
use super::core::RuntimeCore;
use super::ctx::Ctx;
use super::timeout::Timeout;
use crate::actor::table::{BootArgs, IoWait};
use crate::actor::{ActorState, ExitReason, Priority};
use crate::arch::Context;
use crate::error::{Error, Result};
use crate::message::{MsgClass, RecvFilter, Tag};
use crate::monitoring::{RuntimeEvent, TimerEventKind};
use crate::reactor::{Interest, Token};
use crate::timer::TimerFire;
use crate::util::{ActorId, TimerId};

/// Unwind payload of a voluntary `exit()`: recognized by the trampoline and
/// mapped to a `Normal` exit instead of a crash.
pub(crate) struct ExitSignal;

/// First code every actor runs, entered from the architecture boot shim.
///
/// Calls the entry closure under `catch_unwind` so neither a panic nor the
/// `ExitSignal` unwind ever crosses the context-switch boundary, then marks
/// the actor dead and yields forever — the scheduler never resumes a dead
/// context.
pub(crate) extern "C" fn actor_trampoline(arg: *mut u8) -> ! {
    // SAFETY: `arg` points at this slot's BootArgs, stable for the slot's
    // lifetime; the core outlives every actor it runs.
    let boot = unsafe { *(arg as *const BootArgs) };
    let core = unsafe { &*(boot.core as *const RuntimeCore) };
    let (id, entry) = {
        let mut actors = core.actors.borrow_mut();
        let s = actors.slot_mut(boot.slot);
        (s.id, s.entry.take())
    };
    let reason = match entry {
        Some(entry) => {
            let mut ctx = Ctx::new(core, id, boot.slot);
            match catch_unwind(AssertUnwindSafe(move || entry(&mut ctx))) {
                // Returning without exit() is a programmer error.
                Ok(()) => ExitReason::Crash,
                Err(payload) if payload.downcast_ref::<ExitSignal>().is_some() => {
                    ExitReason::Normal
                }
                Err(_) => {
                    error!(%id, "actor panicked");
                    ExitReason::Crash
                }
            }
        }
        None => ExitReason::Crash,
    };
    {
        let mut actors = core.actors.borrow_mut();
        let s = actors.slot_mut(boot.slot);
        s.state = ActorState::Dead;
        s.exit_reason = reason;
    }
    trace!(%id, %reason, "actor finished");
    loop {
        core.yield_to_scheduler();
    }
}

impl RuntimeCore {
    /// Run until every actor is dead or shutdown is requested.
    pub(crate) fn run(&self) {
        loop {
            if self.sched.borrow().shutdown {
                break;
            }
            self.drain_reactor(Duration::ZERO);
            match self.pick_ready() {
                Some(slot) => self.dispatch(slot),
                None => {
                    if self.actors.borrow().all_dead() || self.sched.borrow().shutdown {
                        break;
                    }
                    // IPC/bus/link wakeups happen outside the reactor, so
                    // this sleep stays short.
                    self.drain_reactor(Duration::from_millis(self.cfg.poll_timeout_ms));
                }
            }
        }
    }

    /// Run until no actor is ready. The entry point for external event
    /// loops and simulated time.
    pub(crate) fn run_until_blocked(&self) {
        loop {
            self.drain_reactor(Duration::ZERO);
            match self.pick_ready() {
                Some(slot) => self.dispatch(slot),
                None => break,
            }
        }
    }

    /// Highest-priority ready actor, round-robin within the level.
    fn pick_ready(&self) -> Option<usize> {
        let mut sched = self.sched.borrow_mut();
        let actors = self.actors.borrow();
        let n = actors.capacity();
        for p in Priority::ALL {
            let start = sched.last_run_idx[p.index()].wrapping_add(1) % n;
            for k in 0..n {
                let idx = (start + k) % n;
                let s = actors.slot(idx);
                if s.state == ActorState::Ready && s.priority == p {
                    sched.last_run_idx[p.index()] = idx;
                    return Some(idx);
                }
            }
        }
        None
    }

    /// One dispatch step: switch in, and on return check guards and
    /// classify the actor's new state.
    fn dispatch(&self, slot: usize) {
        {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            debug_assert_eq!(s.state, ActorState::Ready);
            s.state = ActorState::Running;
        }
        self.sched.borrow_mut().current = Some(slot);
        let (from, to) = {
            let mut sched = self.sched.borrow_mut();
            let from = &mut sched.sched_ctx as *mut Context;
            let mut actors = self.actors.borrow_mut();
            let to = &mut actors.slot_mut(slot).ctx as *mut Context;
            (from, to)
        };
        // SAFETY: both contexts live in never-moving storage (sched state
        // and the slot table); no RefCell borrow is held across the switch.
        unsafe { Context::switch(from, to) };
        self.sched.borrow_mut().current = None;

        let needs_cleanup = {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            if !s.guards_intact() {
                error!(id = %s.id, "stack guard violated");
                s.state = ActorState::Dead;
                s.exit_reason = ExitReason::CrashStack;
            }
            match s.state {
                // Voluntary yield: back of the ready queue.
                ActorState::Running => {
                    s.state = ActorState::Ready;
                    false
                }
                ActorState::Dead => true,
                _ => false,
            }
        };
        if needs_cleanup {
            self.cleanup_dead(slot);
        }
    }

    /// Switch from the running actor back to the scheduler context. The
    /// only way an actor gives up the CPU.
    pub(crate) fn yield_to_scheduler(&self) {
        let Some(slot) = self.sched.borrow().current else {
            debug_assert!(false, "yield outside actor context");
            return;
        };
        let (from, to) = {
            let mut actors = self.actors.borrow_mut();
            let from = &mut actors.slot_mut(slot).ctx as *mut Context;
            let sched = self.sched.borrow();
            let to = &sched.sched_ctx as *const Context;
            (from, to)
        };
        // SAFETY: as in dispatch; the scheduler context was saved by the
        // switch that dispatched us.
        unsafe { Context::switch(from, to) };
    }

    /// Drain reactor readiness and dispatch each token in-line.
    fn drain_reactor(&self, timeout: Duration) {
        let mut tokens = Vec::with_capacity(8);
        if let Err(err) = self.reactor.poll(Some(timeout), &mut tokens) {
            warn!(%err, "reactor poll failed");
            return;
        }
        for token in tokens {
            match token {
                Token::Timer(id) => self.handle_timer_ready(id),
                Token::Network(actor) => self.handle_io_ready(actor),
                Token::Wakeup => trace!("external wakeup"),
            }
        }
    }

    fn handle_timer_ready(&self, id: TimerId) {
        let fire = self
            .timers
            .borrow_mut()
            .on_timerfd_ready(&self.reactor, id);
        if let Some(fire) = fire {
            self.deliver_timer_fire(fire);
        }
    }

    /// Post the TIMER message for one firing (both backends route here).
    pub(crate) fn deliver_timer_fire(&self, fire: TimerFire) {
        self.record(RuntimeEvent::timer(TimerEventKind::Fired {
            id: fire.id,
            owner: fire.owner,
        }));
        let tag = Tag::new(fire.id.raw());
        if let Err(err) = self.send_internal(fire.owner, fire.owner, MsgClass::Timer, tag, &[]) {
            trace!(owner = %fire.owner, %err, "timer fire dropped");
        }
    }

    fn handle_io_ready(&self, actor: ActorId) {
        let mut actors = self.actors.borrow_mut();
        let Some(slot) = actors.resolve(actor) else { return };
        let s = actors.slot_mut(slot);
        if let Some(io) = s.io_wait.take() {
            trace!(fd = io.fd, writable = io.writable, actor = %s.id, "fd ready");
            let _ = self.reactor.deregister_raw(io.fd);
            s.io_ready = true;
            if s.state == ActorState::Waiting {
                s.state = ActorState::Ready;
            }
        }
    }

    /// Advance simulated time and deliver every fire as a message.
    pub(crate) fn advance_time(&self, delta_us: u64) {
        let fires = self.timers.borrow_mut().advance(&self.reactor, delta_us);
        for fire in fires {
            self.deliver_timer_fire(fire);
        }
    }

    /// Block the calling actor until `fd` is ready (or the wait times out).
    /// Implements the Network token contract for collaborators.
    pub(crate) fn fd_wait(
        &self,
        slot: usize,
        fd: RawFd,
        writable: bool,
        timeout: Timeout,
    ) -> Result<()> {
        let actor_id = self.actors.borrow().slot(slot).id;
        let interest = if writable {
            Interest::Writable
        } else {
            Interest::Readable
        };
        // SAFETY: the caller owns the fd and keeps it open for the wait.
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        self.reactor
            .register(borrowed, interest, Token::Network(actor_id))?;
        let timer = match timeout {
            Timeout::Poll => {
                let _ = self.reactor.deregister_raw(fd);
                return Err(Error::invalid("fd wait cannot poll"));
            }
            Timeout::Never => None,
            Timeout::In(_) => {
                let deadline_us = timeout.deadline_us().unwrap_or(1);
                match self
                    .timers
                    .borrow_mut()
                    .create(&self.reactor, actor_id, deadline_us, false)
                {
                    Ok(t) => Some(t),
                    Err(err) => {
                        let _ = self.reactor.deregister_raw(fd);
                        return Err(err);
                    }
                }
            }
        };
        {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            s.io_wait = Some(IoWait { fd, writable });
            s.io_ready = false;
            s.state = ActorState::Waiting;
        }
        self.yield_to_scheduler();

        let was_ready = {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            let ready = s.io_ready;
            s.io_ready = false;
            ready
        };
        if was_ready {
            if let Some(timer) = timer {
                let _ = self.timers.borrow_mut().cancel(&self.reactor, timer);
                self.purge_mailbox(
                    slot,
                    &RecvFilter::new(actor_id, MsgClass::Timer, Tag::new(timer.raw())),
                );
            }
            return Ok(());
        }
        // Not readiness: release the registration ourselves.
        let stale = self.actors.borrow_mut().slot_mut(slot).io_wait.take();
        if let Some(io) = stale {
            let _ = self.reactor.deregister_raw(io.fd);
        }
        if let Some(timer) = timer {
            let tag = Tag::new(timer.raw());
            if self.timeout_at_head(slot, tag) {
                self.drop_head(slot);
                return Err(Error::timeout("fd wait deadline reached"));
            }
            let _ = self.timers.borrow_mut().cancel(&self.reactor, timer);
            self.purge_mailbox(slot, &RecvFilter::new(actor_id, MsgClass::Timer, tag));
        }
        Err(Error::would_block("fd wait interrupted"))
    }

    pub(crate) fn request_shutdown(&self) {
        self.sched.borrow_mut().shutdown = true;
    }
}
