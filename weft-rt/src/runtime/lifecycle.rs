//! Spawn, kill, links, monitors, registry binding, and the death cleanup
//! pass.

// Layer 1: Standard library imports
use std::alloc::Layout;
use std::rc::Rc;

// Layer 2: Third-party crate imports
use tracing::{debug, warn};

// Layer 3: Internal module imports
use super::core::RuntimeCore;
use super::ctx::Ctx;
use super::sched::actor_trampoline;
use crate::actor::config::{ActorConfig, SpawnInfo};
use crate::actor::state::{ActorState, ExitReason};
use crate::actor::table::{BootArgs, MonitorRecord, StackKind};
use crate::error::{Error, Result};
use crate::message::{ExitInfo, MsgClass, Tag};
use crate::monitoring::{ActorEventKind, RuntimeEvent};
use crate::runtime::config::{MAX_LINKS, MAX_MONITORS, MIN_STACK_SIZE};
use crate::util::{ActorId, MonitorRef};

/// One member of a spawn group: its config plus its boxed entry.
pub struct GroupSpec {
    pub cfg: ActorConfig,
    pub entry: Box<dyn FnOnce(&mut Ctx)>,
}

impl GroupSpec {
    pub fn new<F>(cfg: ActorConfig, entry: F) -> Self
    where
        F: FnOnce(&mut Ctx) + 'static,
    {
        Self {
            cfg,
            entry: Box::new(entry),
        }
    }
}

impl RuntimeCore {
    /// Spawn one standalone actor (a one-element group).
    pub(crate) fn spawn_boxed(
        &self,
        cfg: ActorConfig,
        entry: Box<dyn FnOnce(&mut Ctx)>,
    ) -> Result<ActorId> {
        let ids = self.spawn_group_inner(vec![GroupSpec { cfg, entry }])?;
        Ok(ids[0])
    }

    /// Spawn a group of siblings; all-or-nothing. Every member sees the
    /// shared spawn-info array once the whole group is up.
    pub(crate) fn spawn_group_inner(&self, specs: Vec<GroupSpec>) -> Result<Vec<ActorId>> {
        if specs.is_empty() {
            return Err(Error::invalid("empty spawn group"));
        }
        let mut spawned: Vec<(ActorId, usize)> = Vec::with_capacity(specs.len());
        for spec in specs {
            match self.spawn_one(spec.cfg, spec.entry) {
                Ok(pair) => spawned.push(pair),
                Err(err) => {
                    for (_, slot) in &spawned {
                        self.abort_spawn(*slot);
                    }
                    return Err(err);
                }
            }
        }
        let infos: Rc<[SpawnInfo]> = {
            let actors = self.actors.borrow();
            spawned
                .iter()
                .map(|(id, slot)| SpawnInfo {
                    id: *id,
                    name: actors.slot(*slot).name,
                    priority: actors.slot(*slot).priority,
                })
                .collect::<Vec<_>>()
                .into()
        };
        {
            let mut actors = self.actors.borrow_mut();
            for (_, slot) in &spawned {
                actors.slot_mut(*slot).siblings = Some(Rc::clone(&infos));
            }
        }
        Ok(spawned.into_iter().map(|(id, _)| id).collect())
    }

    fn spawn_one(
        &self,
        cfg: ActorConfig,
        entry: Box<dyn FnOnce(&mut Ctx)>,
    ) -> Result<(ActorId, usize)> {
        let stack_size = if cfg.stack_size == 0 {
            self.cfg.default_stack_size
        } else {
            cfg.stack_size
        };
        if stack_size < MIN_STACK_SIZE {
            return Err(Error::invalid("stack size below minimum"));
        }
        if cfg.auto_register && cfg.name.is_none() {
            return Err(Error::invalid("auto_register requires a name"));
        }
        if cfg.auto_register {
            if let Some(name) = cfg.name {
                if self.registry.borrow().whereis(name).is_some() {
                    return Err(Error::exists("name already registered"));
                }
            }
        }
        let (id, slot) = {
            let mut actors = self.actors.borrow_mut();
            let slot = actors
                .find_dead()
                .ok_or(Error::nomem("actor table full"))?;
            let id = actors.issue_id();
            (id, slot)
        };
        // Stack: arena by default, heap on request.
        let (base, len, kind) = if cfg.malloc_stack {
            let layout = Layout::from_size_align(stack_size, 16)
                .map_err(|_| Error::invalid("stack size overflows layout"))?;
            // SAFETY: layout is non-zero and 16-aligned.
            let ptr = unsafe { std::alloc::alloc(layout) };
            if ptr.is_null() {
                return Err(Error::nomem("heap stack allocation failed"));
            }
            (ptr, stack_size, StackKind::Heap(layout))
        } else {
            let span = self.arena.borrow_mut().alloc(stack_size)?;
            // SAFETY: the span was just allocated.
            let ptr = unsafe { self.arena.borrow().ptr_at(span.offset) };
            (ptr, span.len, StackKind::Arena(span))
        };
        {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            s.id = id;
            s.priority = cfg.priority;
            s.name = cfg.name;
            s.stack = kind;
            s.stack_base = base;
            s.stack_len = len;
            s.exit_reason = ExitReason::Normal;
            s.entry = Some(entry);
            s.boot = BootArgs {
                core: self as *const RuntimeCore as *const (),
                slot,
            };
            // SAFETY: base/len describe the stack just allocated for this
            // slot; the boot args live in the slot itself, whose address is
            // stable because the table never reallocates.
            unsafe {
                s.stamp_guards();
                let (ubase, ulen) = s.usable_stack();
                let boot_ptr = &mut s.boot as *mut BootArgs as *mut u8;
                s.ctx.init(ubase, ulen, actor_trampoline, boot_ptr);
            }
            s.state = ActorState::Ready;
        }
        if cfg.auto_register {
            if let Some(name) = cfg.name {
                if let Err(err) = self.registry.borrow_mut().register(name, id) {
                    self.abort_spawn(slot);
                    return Err(err);
                }
            }
        }
        debug!(%id, name = ?cfg.name, priority = ?cfg.priority, stack = stack_size, "actor spawned");
        self.record(RuntimeEvent::actor(ActorEventKind::Spawned {
            id,
            priority: cfg.priority,
            name: cfg.name,
        }));
        Ok((id, slot))
    }

    /// Undo a partially completed spawn (group rollback, failed register).
    fn abort_spawn(&self, slot: usize) {
        let id = self.actors.borrow().slot(slot).id;
        self.registry.borrow_mut().remove_owned_by(id);
        self.free_slot_stack(slot);
        let mut actors = self.actors.borrow_mut();
        let s = actors.slot_mut(slot);
        s.state = ActorState::Dead;
        s.entry = None;
        s.siblings = None;
        s.name = None;
    }

    /// Kill another actor: mark dead with reason `Killed` and clean up
    /// immediately. Self-kill is rejected; `exit` is the way out.
    pub(crate) fn kill(&self, caller: Option<ActorId>, target: ActorId) -> Result<()> {
        if caller == Some(target) {
            return Err(Error::invalid("cannot kill self"));
        }
        let slot = self
            .actors
            .borrow()
            .resolve(target)
            .ok_or(Error::invalid("kill target not alive"))?;
        {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            s.state = ActorState::Dead;
            s.exit_reason = ExitReason::Killed;
        }
        debug!(%target, "actor killed");
        self.cleanup_dead(slot);
        Ok(())
    }

    /// Symmetric link between the caller and `target`.
    pub(crate) fn link(&self, caller_slot: usize, target: ActorId) -> Result<()> {
        let caller_id = self.actors.borrow().slot(caller_slot).id;
        if target == caller_id {
            return Err(Error::invalid("cannot link to self"));
        }
        let mut actors = self.actors.borrow_mut();
        let target_slot = actors
            .resolve(target)
            .ok_or(Error::invalid("link target not alive"))?;
        if actors.slot(caller_slot).links.len() >= MAX_LINKS
            || actors.slot(target_slot).links.len() >= MAX_LINKS
        {
            return Err(Error::nomem("link table full"));
        }
        actors.slot_mut(caller_slot).links.push(target);
        actors.slot_mut(target_slot).links.push(caller_id);
        Ok(())
    }

    /// Remove one link pair.
    pub(crate) fn unlink(&self, caller_slot: usize, target: ActorId) -> Result<()> {
        let caller_id = self.actors.borrow().slot(caller_slot).id;
        let mut actors = self.actors.borrow_mut();
        let pos = actors
            .slot(caller_slot)
            .links
            .iter()
            .position(|&t| t == target)
            .ok_or(Error::invalid("not linked to target"))?;
        actors.slot_mut(caller_slot).links.remove(pos);
        if let Some(target_slot) = actors.resolve(target) {
            let peer = actors.slot_mut(target_slot);
            if let Some(pos) = peer.links.iter().position(|&t| t == caller_id) {
                peer.links.remove(pos);
            }
        }
        Ok(())
    }

    /// Asymmetric monitor on `target`; returns the ref that will tag the
    /// EXIT message.
    pub(crate) fn monitor_target(&self, caller_slot: usize, target: ActorId) -> Result<MonitorRef> {
        let caller_id = self.actors.borrow().slot(caller_slot).id;
        if target == caller_id {
            return Err(Error::invalid("cannot monitor self"));
        }
        if self.actors.borrow().resolve(target).is_none() {
            return Err(Error::invalid("monitor target not alive"));
        }
        let mref = MonitorRef::from_raw(self.issue_rt_tag());
        let mut actors = self.actors.borrow_mut();
        let s = actors.slot_mut(caller_slot);
        if s.monitors.len() >= MAX_MONITORS {
            return Err(Error::nomem("monitor table full"));
        }
        s.monitors.push(MonitorRecord { mref, target });
        Ok(mref)
    }

    /// Cancel one monitor record by ref.
    pub(crate) fn demonitor(&self, caller_slot: usize, mref: MonitorRef) -> Result<()> {
        let mut actors = self.actors.borrow_mut();
        let s = actors.slot_mut(caller_slot);
        let pos = s
            .monitors
            .iter()
            .position(|m| m.mref == mref)
            .ok_or(Error::invalid("unknown monitor ref"))?;
        s.monitors.remove(pos);
        Ok(())
    }

    /// The death cleanup pass: notify links and monitors, then release
    /// every resource the actor held. Runs exactly once per death.
    pub(crate) fn cleanup_dead(&self, slot: usize) {
        let (id, reason, links) = {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            if s.stack_base.is_null() {
                return; // already cleaned
            }
            debug_assert_eq!(s.state, ActorState::Dead);
            (s.id, s.exit_reason, std::mem::take(&mut s.links))
        };
        debug!(%id, %reason, "cleaning up dead actor");
        let payload = ExitInfo { actor: id, reason }.encode();

        // 1. Links: notify each live peer, then drop the reciprocal record.
        for peer in links {
            if self.actors.borrow().resolve(peer).is_none() {
                continue;
            }
            if let Err(err) =
                self.send_internal(peer, id, MsgClass::Exit, Tag::LINK_EXIT, &payload)
            {
                warn!(%peer, %err, "exit notification dropped");
            }
            let mut actors = self.actors.borrow_mut();
            if let Some(peer_slot) = actors.resolve(peer) {
                let peer_links = &mut actors.slot_mut(peer_slot).links;
                if let Some(pos) = peer_links.iter().position(|&t| t == id) {
                    peer_links.remove(pos);
                }
            }
        }

        // 2. Monitors held by other actors on the dying one: one EXIT per
        // record, tagged with the monitor ref.
        let watchers: Vec<(ActorId, MonitorRef)> = {
            let actors = self.actors.borrow();
            actors
                .iter()
                .filter(|(i, s)| *i != slot && s.state != ActorState::Dead)
                .flat_map(|(_, s)| {
                    s.monitors
                        .iter()
                        .filter(|m| m.target == id)
                        .map(|m| (s.id, m.mref))
                        .collect::<Vec<_>>()
                })
                .collect()
        };
        for (watcher, mref) in watchers {
            if let Err(err) = self.send_internal(
                watcher,
                id,
                MsgClass::Exit,
                Tag::new(mref.raw()),
                &payload,
            ) {
                warn!(%watcher, %err, "exit notification dropped");
            }
            let mut actors = self.actors.borrow_mut();
            if let Some(wslot) = actors.resolve(watcher) {
                let monitors = &mut actors.slot_mut(wslot).monitors;
                monitors.retain(|m| !(m.target == id && m.mref == mref));
            }
        }

        // 3–5. Own monitors, registry entries, bus subscriptions, timers.
        self.actors.borrow_mut().slot_mut(slot).monitors.clear();
        self.registry.borrow_mut().remove_owned_by(id);
        self.buses.borrow_mut().unsubscribe_everywhere(id);
        self.timers
            .borrow_mut()
            .cancel_owned_by(&self.reactor, id);
        // An aborted fd wait releases its reactor registration here.
        let stale_io = self.actors.borrow_mut().slot_mut(slot).io_wait.take();
        if let Some(io) = stale_io {
            let _ = self.reactor.deregister_raw(io.fd);
        }

        // 6. Active message, active bus buffer, mailbox contents.
        self.release_actives(slot);
        {
            let mut actors = self.actors.borrow_mut();
            let mut entries = self.entries.borrow_mut();
            let mut bufs = self.bufs.borrow_mut();
            actors
                .slot_mut(slot)
                .mailbox
                .clear(&mut entries, &mut bufs);
        }

        // 7. The stack itself.
        self.free_slot_stack(slot);
        {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            s.entry = None;
            s.siblings = None;
            s.select_sources.clear();
            s.io_ready = false;
        }
        self.record(RuntimeEvent::actor(ActorEventKind::Exited { id, reason }));
    }

    fn free_slot_stack(&self, slot: usize) {
        let (kind, base) = {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            let kind = std::mem::replace(&mut s.stack, StackKind::None);
            let base = s.stack_base;
            s.stack_base = std::ptr::null_mut();
            (kind, base)
        };
        match kind {
            StackKind::Arena(span) => self.arena.borrow_mut().free(span),
            // SAFETY: allocated with exactly this layout in spawn_one.
            StackKind::Heap(layout) => unsafe { std::alloc::dealloc(base, layout) },
            StackKind::None => {}
        }
    }
}
