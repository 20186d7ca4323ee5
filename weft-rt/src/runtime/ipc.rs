//! Mailbox send path, wake decision, and active-message views.

// Layer 1: Standard library imports
use std::slice;

// Layer 2: Third-party crate imports
use tracing::trace;

// Layer 3: Internal module imports
use super::core::RuntimeCore;
use super::select::Source;
use crate::actor::table::ActorSlot;
use crate::actor::ActorState;
use crate::error::{Error, Result};
use crate::mailbox::{entry_meta, MailEntry};
use crate::message::types::{decode_header, PayloadBuf};
use crate::message::{Message, MsgClass, RecvFilter, Tag, HEADER_SIZE, MAX_MESSAGE_SIZE};
use crate::monitoring::{MessageEventKind, RuntimeEvent};
use crate::util::ActorId;

/// Should an arriving message wake this waiting actor?
///
/// Select sources are consulted first; TIMER-class messages always wake a
/// select waiter because timeouts ride this channel. An actor waiting with
/// no recorded sources (a bare fd wait) wakes on any message.
fn wake_on_ipc(slot: &ActorSlot, sender: ActorId, class: MsgClass, tag: Tag) -> bool {
    if slot.select_sources.is_empty() {
        return true;
    }
    class == MsgClass::Timer
        || slot.select_sources.iter().any(|s| match s {
            Source::Ipc(f) => f.matches(sender, class, tag),
            Source::Bus(_) => false,
        })
}

impl RuntimeCore {
    /// The one send primitive everything else goes through: validate,
    /// allocate entry + buffer, write header then payload, append, wake.
    pub(crate) fn send_internal(
        &self,
        to: ActorId,
        sender: ActorId,
        class: MsgClass,
        tag: Tag,
        payload: &[u8],
    ) -> Result<()> {
        if class == MsgClass::Any {
            return Err(Error::invalid("cannot send wildcard class"));
        }
        if payload.len() + HEADER_SIZE > MAX_MESSAGE_SIZE {
            return Err(Error::invalid("message exceeds maximum size"));
        }
        let slot = self
            .actors
            .borrow()
            .resolve(to)
            .ok_or(Error::invalid("recipient not alive"))?;

        let buf_idx = {
            let mut buf = PayloadBuf::zeroed();
            buf.fill(class, tag, payload);
            match self.bufs.borrow_mut().alloc(buf) {
                Ok(idx) => idx,
                Err(err) => {
                    self.record(RuntimeEvent::message(MessageEventKind::Dropped { to }));
                    return Err(err);
                }
            }
        };
        let entry_idx = {
            let entry = MailEntry {
                sender,
                buf: buf_idx,
                total_len: HEADER_SIZE + payload.len(),
                prev: None,
                next: None,
            };
            match self.entries.borrow_mut().alloc(entry) {
                Ok(idx) => idx,
                Err(err) => {
                    self.bufs.borrow_mut().free(buf_idx);
                    self.record(RuntimeEvent::message(MessageEventKind::Dropped { to }));
                    return Err(err);
                }
            }
        };
        {
            let mut actors = self.actors.borrow_mut();
            let mut entries = self.entries.borrow_mut();
            let s = actors.slot_mut(slot);
            s.mailbox.push_back(&mut entries, entry_idx);
            if s.state == ActorState::Waiting && wake_on_ipc(s, sender, class, tag) {
                s.state = ActorState::Ready;
                trace!(%to, "woke waiting recipient");
            }
        }
        self.record(RuntimeEvent::message(MessageEventKind::Sent {
            from: sender,
            to,
            class,
            len: payload.len(),
        }));
        Ok(())
    }

    /// Unlink one entry from a mailbox and make it the actor's active
    /// message, releasing whatever was active before.
    pub(crate) fn consume_entry(&self, slot: usize, entry_idx: crate::alloc::PoolIdx) {
        {
            let mut actors = self.actors.borrow_mut();
            let mut entries = self.entries.borrow_mut();
            actors.slot_mut(slot).mailbox.unlink(&mut entries, entry_idx);
        }
        self.release_actives(slot);
        self.actors.borrow_mut().slot_mut(slot).active_msg = Some(entry_idx);
    }

    /// Free the actor's active message and active bus buffer, if any.
    pub(crate) fn release_actives(&self, slot: usize) {
        let (active_msg, active_bus) = {
            let mut actors = self.actors.borrow_mut();
            let s = actors.slot_mut(slot);
            (s.active_msg.take(), s.active_bus.take())
        };
        if let Some(idx) = active_msg {
            if let Some(entry) = self.entries.borrow_mut().free(idx) {
                self.bufs.borrow_mut().free(entry.buf);
            }
        }
        if let Some(idx) = active_bus {
            self.bufs.borrow_mut().free(idx);
        }
    }

    /// Borrowed view of the actor's active message.
    ///
    /// The returned slice points into the payload pool; the caller (the
    /// `Ctx` receive family) ties its lifetime to `&mut Ctx`, and pool
    /// storage never moves, so the view stays valid until the actor's next
    /// receive/select — exactly the contract.
    pub(crate) fn active_message_view<'a>(&self, slot: usize) -> Result<Message<'a>> {
        let actors = self.actors.borrow();
        let entry_idx = actors
            .slot(slot)
            .active_msg
            .ok_or(Error::invalid("no active message"))?;
        let entries = self.entries.borrow();
        let entry = entries
            .get(entry_idx)
            .ok_or(Error::invalid("active message missing"))?;
        let bufs = self.bufs.borrow();
        let buf = bufs
            .get(entry.buf)
            .ok_or(Error::invalid("active payload missing"))?;
        let (class, tag) = decode_header(buf.header());
        let class = class.ok_or(Error::invalid("active message header corrupt"))?;
        let len = entry.total_len - HEADER_SIZE;
        // SAFETY: pool slots never move and the buffer stays allocated until
        // the next receive/select or actor death, both of which require the
        // exclusive borrow the caller holds.
        let data = unsafe { slice::from_raw_parts(buf.0.as_ptr().add(HEADER_SIZE), len) };
        Ok(Message {
            sender: entry.sender,
            class,
            tag,
            data,
        })
    }

    /// Borrowed view of the actor's active bus buffer.
    pub(crate) fn active_bus_view<'a>(&self, slot: usize, len: usize) -> Result<&'a [u8]> {
        let actors = self.actors.borrow();
        let buf_idx = actors
            .slot(slot)
            .active_bus
            .ok_or(Error::invalid("no active bus data"))?;
        let bufs = self.bufs.borrow();
        let buf = bufs
            .get(buf_idx)
            .ok_or(Error::invalid("active bus payload missing"))?;
        // SAFETY: same stability argument as `active_message_view`.
        Ok(unsafe { slice::from_raw_parts(buf.0.as_ptr(), len) })
    }

    /// Drop every queued entry matching `filter` (stale timeout messages,
    /// cancelled monitor exits).
    pub(crate) fn purge_mailbox(&self, slot: usize, filter: &RecvFilter) {
        loop {
            let hit = {
                let actors = self.actors.borrow();
                let entries = self.entries.borrow();
                let bufs = self.bufs.borrow();
                actors
                    .slot(slot)
                    .mailbox
                    .find_first_match(&entries, &bufs, filter)
            };
            let Some(idx) = hit else { break };
            let mut actors = self.actors.borrow_mut();
            let mut entries = self.entries.borrow_mut();
            actors.slot_mut(slot).mailbox.unlink(&mut entries, idx);
            if let Some(entry) = entries.free(idx) {
                self.bufs.borrow_mut().free(entry.buf);
            }
        }
    }

    /// Does the mailbox head hold the TIMER message of this timeout timer?
    pub(crate) fn timeout_at_head(&self, slot: usize, timer_tag: Tag) -> bool {
        let actors = self.actors.borrow();
        let entries = self.entries.borrow();
        let bufs = self.bufs.borrow();
        let Some(head) = actors.slot(slot).mailbox.head() else {
            return false;
        };
        let Some(entry) = entries.get(head) else {
            return false;
        };
        match entry_meta(entry, &bufs) {
            Some(meta) => meta.class == MsgClass::Timer && meta.tag == timer_tag,
            None => false,
        }
    }

    /// Pop and free the mailbox head (the consumed timeout message).
    pub(crate) fn drop_head(&self, slot: usize) {
        let head = {
            let actors = self.actors.borrow();
            actors.slot(slot).mailbox.head()
        };
        let Some(idx) = head else { return };
        let mut actors = self.actors.borrow_mut();
        let mut entries = self.entries.borrow_mut();
        actors.slot_mut(slot).mailbox.unlink(&mut entries, idx);
        if let Some(entry) = entries.free(idx) {
            self.bufs.borrow_mut().free(entry.buf);
        }
    }
}
