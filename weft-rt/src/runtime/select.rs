//! Select: the single blocking primitive under every IPC and bus wait.
//!
//! A select scans its sources twice — bus sources first, then mailbox
//! filters, each in source order — and blocks when nothing is ready:
//! sources are recorded on the actor,
//! referenced bus subscriptions get their `blocked` flag, an optional
//! timeout timer is armed, and the actor yields. The wake path re-scans;
//! an empty post-wake scan is a spurious wakeup and surfaces `WouldBlock`.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::trace;

// Layer 3: Internal module imports
use super::config::MAX_SELECT_SOURCES;
use super::core::RuntimeCore;
use super::timeout::Timeout;
use crate::actor::ActorState;
use crate::error::{Error, Result};
use crate::message::{Message, MsgClass, RecvFilter, Tag};
use crate::util::{ActorId, BusId, TimerId};

/// One wait source: a mailbox filter or a subscribed bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Ipc(RecvFilter),
    Bus(BusId),
}

/// What a successful select delivered. `index` names the source that fired.
#[derive(Debug)]
pub enum Selected<'a> {
    Ipc { index: usize, msg: Message<'a> },
    Bus { index: usize, data: &'a [u8] },
}

impl<'a> Selected<'a> {
    /// Index of the source that fired.
    pub fn index(&self) -> usize {
        match self {
            Self::Ipc { index, .. } | Self::Bus { index, .. } => *index,
        }
    }
}

/// Internal scan result; the `Ctx` layer turns it into [`Selected`].
#[derive(Debug, Clone, Copy)]
pub(crate) enum ScanHit {
    Ipc { index: usize },
    Bus { index: usize, len: usize },
}

impl RuntimeCore {
    /// The full select protocol for the actor in `slot`. On success the
    /// delivered entry (or bus copy) is stored as the actor's active
    /// message / active bus buffer.
    pub(crate) fn select_wait(
        &self,
        slot: usize,
        sources: &[Source],
        timeout: Timeout,
    ) -> Result<ScanHit> {
        if sources.is_empty() {
            return Err(Error::invalid("select needs at least one source"));
        }
        if sources.len() > MAX_SELECT_SOURCES {
            return Err(Error::invalid("too many select sources"));
        }
        let actor_id = self.actors.borrow().slot(slot).id;
        self.validate_bus_sources(actor_id, sources)?;

        if let Some(hit) = self.select_scan(slot, actor_id, sources)? {
            return Ok(hit);
        }
        let timer = match timeout {
            Timeout::Poll => return Err(Error::would_block("no select source ready")),
            Timeout::Never => None,
            Timeout::In(_) => {
                let deadline_us = timeout.deadline_us().unwrap_or(1);
                Some(self.timers.borrow_mut().create(
                    &self.reactor,
                    actor_id,
                    deadline_us,
                    false,
                )?)
            }
        };
        self.select_block(slot, actor_id, sources, timer)?;
        self.select_after_wake(slot, actor_id, sources, timer)
    }

    /// Record wait state and yield to the scheduler.
    fn select_block(
        &self,
        slot: usize,
        actor_id: ActorId,
        sources: &[Source],
        timer: Option<TimerId>,
    ) -> Result<()> {
        {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            s.select_sources.clear();
            s.select_sources.extend_from_slice(sources);
            s.state = ActorState::Waiting;
        }
        self.set_bus_blocked(actor_id, sources, true);
        trace!(%actor_id, sources = sources.len(), ?timer, "select blocking");
        self.yield_to_scheduler();
        // Resumed: clear the recorded wait state before anything else.
        {
            let mut actors = self.actors.borrow_mut();
            actors.slot_mut(slot).select_sources.clear();
        }
        self.set_bus_blocked(actor_id, sources, false);
        Ok(())
    }

    /// Timeout protocol plus the post-wake re-scan.
    fn select_after_wake(
        &self,
        slot: usize,
        actor_id: ActorId,
        sources: &[Source],
        timer: Option<TimerId>,
    ) -> Result<ScanHit> {
        if let Some(timer) = timer {
            let tag = Tag::new(timer.raw());
            if self.timeout_at_head(slot, tag) {
                // The timeout firing beat any traffic to the mailbox head.
                self.drop_head(slot);
                return Err(Error::timeout("select deadline reached"));
            }
            // Real traffic won the race: disarm and sweep any stale firing.
            let _ = self.timers.borrow_mut().cancel(&self.reactor, timer);
            self.purge_mailbox(
                slot,
                &RecvFilter::new(actor_id, MsgClass::Timer, tag),
            );
        }
        match self.select_scan(slot, actor_id, sources)? {
            Some(hit) => Ok(hit),
            None => Err(Error::would_block("spurious wakeup")),
        }
    }

    /// Two-pass scan. Consumes the winning entry on a hit.
    fn select_scan(
        &self,
        slot: usize,
        actor_id: ActorId,
        sources: &[Source],
    ) -> Result<Option<ScanHit>> {
        // Pass 1: bus sources, in order.
        for (index, source) in sources.iter().enumerate() {
            let Source::Bus(bus_id) = source else { continue };
            let consumed = {
                let mut buses = self.buses.borrow_mut();
                let mut bufs = self.bufs.borrow_mut();
                let bus = buses
                    .get_mut(*bus_id)
                    .ok_or(Error::invalid("unknown bus id"))?;
                match bus.consume_to_buf(actor_id, &mut bufs) {
                    Ok(hit) => Some(hit),
                    Err(err) if err.is_would_block() => None,
                    Err(err) => return Err(err),
                }
            };
            if let Some((buf_idx, len)) = consumed {
                self.release_actives(slot);
                self.actors.borrow_mut().slot_mut(slot).active_bus = Some(buf_idx);
                return Ok(Some(ScanHit::Bus { index, len }));
            }
        }
        // Pass 2: mailbox filters, in order; first filter wins on a tie.
        for (index, source) in sources.iter().enumerate() {
            let Source::Ipc(filter) = source else { continue };
            let hit = {
                let actors = self.actors.borrow();
                let entries = self.entries.borrow();
                let bufs = self.bufs.borrow();
                actors
                    .slot(slot)
                    .mailbox
                    .find_first_match(&entries, &bufs, filter)
            };
            if let Some(entry_idx) = hit {
                self.consume_entry(slot, entry_idx);
                return Ok(Some(ScanHit::Ipc { index }));
            }
        }
        Ok(None)
    }

    fn validate_bus_sources(&self, actor_id: ActorId, sources: &[Source]) -> Result<()> {
        let buses = self.buses.borrow();
        for source in sources {
            if let Source::Bus(bus_id) = source {
                let bus = buses
                    .get(*bus_id)
                    .ok_or(Error::invalid("unknown bus id"))?;
                if !bus.is_subscribed(actor_id) {
                    return Err(Error::invalid("not subscribed to select bus source"));
                }
            }
        }
        Ok(())
    }

    /// Flip the `blocked` flag on every bus subscription in the source set.
    fn set_bus_blocked(&self, actor_id: ActorId, sources: &[Source], blocked: bool) {
        let mut buses = self.buses.borrow_mut();
        for source in sources {
            if let Source::Bus(bus_id) = source {
                if let Some(bus) = buses.get_mut(*bus_id) {
                    bus.set_blocked(actor_id, blocked);
                }
            }
        }
    }

    /// Wake select waiters referencing `bus_id` after a publish.
    pub(crate) fn wake_bus_waiters(&self, bus_id: BusId, blocked_actors: &[ActorId]) {
        let mut actors = self.actors.borrow_mut();
        for actor in blocked_actors {
            let Some(slot) = actors.resolve(*actor) else { continue };
            let s = actors.slot_mut(slot);
            let references_bus = s
                .select_sources
                .iter()
                .any(|src| matches!(src, Source::Bus(b) if *b == bus_id));
            if s.state == ActorState::Waiting && references_bus {
                s.state = ActorState::Ready;
                trace!(actor = %s.id, bus = %bus_id, "bus publish woke subscriber");
            }
        }
    }
}
