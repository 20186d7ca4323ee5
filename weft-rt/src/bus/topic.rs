//! One topic: the entry ring and its subscriber slot table.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use tracing::trace;

// Layer 3: Internal module imports
use super::config::BusConfig;
use crate::alloc::{Pool, PoolIdx};
use crate::error::{Error, Result};
use crate::message::types::PayloadBuf;
use crate::util::{ActorId, BusId};

/// One ring slot. `valid` distinguishes live entries from holes left by
/// read-consumption; holes stay in the `[tail, head)` window (and in
/// `count`) until the tail passes them.
#[derive(Debug, Clone, Copy)]
struct BusEntry {
    valid: bool,
    /// Monotonic publish sequence; subscriber cursors compare against it.
    seq: u64,
    buf: Option<PoolIdx>,
    len: usize,
    /// Wall-clock publish timestamp for age expiry.
    ts_ms: i64,
    read_count: u32,
    readers_mask: u32,
}

impl BusEntry {
    const fn hole() -> Self {
        Self {
            valid: false,
            seq: 0,
            buf: None,
            len: 0,
            ts_ms: 0,
            read_count: 0,
            readers_mask: 0,
        }
    }
}

/// One subscriber slot; the slot index is the bit in `readers_mask`.
#[derive(Debug, Clone, Copy)]
struct SubSlot {
    actor: ActorId,
    /// Next publish sequence this subscriber may observe.
    next_seq: u64,
    active: bool,
    /// Set while the subscriber's actor blocks in select on this bus.
    blocked: bool,
}

impl SubSlot {
    const fn empty() -> Self {
        Self {
            actor: ActorId::INVALID,
            next_seq: 0,
            active: false,
            blocked: false,
        }
    }
}

/// A bounded many-to-many topic.
pub(crate) struct Bus {
    pub id: BusId,
    cfg: BusConfig,
    ring: Box<[BusEntry]>,
    subs: Box<[SubSlot]>,
    head: usize,
    tail: usize,
    count: usize,
    next_seq: u64,
}

impl Bus {
    pub fn new(id: BusId, cfg: BusConfig) -> Self {
        Self {
            id,
            cfg,
            ring: vec![BusEntry::hole(); cfg.max_entries].into_boxed_slice(),
            subs: vec![SubSlot::empty(); cfg.max_subscribers].into_boxed_slice(),
            head: 0,
            tail: 0,
            count: 0,
            next_seq: 0,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subs.iter().filter(|s| s.active).count()
    }

    /// Live (valid) entries currently retained.
    pub fn entry_count(&self) -> usize {
        self.window().filter(|&i| self.ring[i].valid).count()
    }

    pub fn is_subscribed(&self, actor: ActorId) -> bool {
        self.sub_index(actor).is_some()
    }

    /// Claim the first free subscriber slot. The cursor starts at the
    /// current head: only publications after this point are observable.
    pub fn subscribe(&mut self, actor: ActorId) -> Result<usize> {
        if self.sub_index(actor).is_some() {
            return Err(Error::invalid("already subscribed"));
        }
        let slot = self
            .subs
            .iter()
            .position(|s| !s.active)
            .ok_or(Error::nomem("bus subscriber table full"))?;
        self.subs[slot] = SubSlot {
            actor,
            next_seq: self.next_seq,
            active: true,
            blocked: false,
        };
        trace!(bus = %self.id, %actor, slot, "subscribed");
        Ok(slot)
    }

    pub fn unsubscribe(&mut self, actor: ActorId) -> Result<()> {
        let slot = self
            .sub_index(actor)
            .ok_or(Error::invalid("not subscribed"))?;
        self.subs[slot].active = false;
        self.subs[slot].blocked = false;
        trace!(bus = %self.id, %actor, slot, "unsubscribed");
        Ok(())
    }

    /// Mark whether `actor` is blocked in select on this bus.
    pub fn set_blocked(&mut self, actor: ActorId, blocked: bool) {
        if let Some(slot) = self.sub_index(actor) {
            self.subs[slot].blocked = blocked;
        }
    }

    /// Publish one payload. Returns the actors of currently blocked
    /// subscribers so the caller can run the select wake check.
    pub fn publish(
        &mut self,
        bufs: &mut Pool<PayloadBuf>,
        now_ms: i64,
        data: &[u8],
    ) -> Result<Vec<ActorId>> {
        if data.len() > self.cfg.max_entry_size {
            return Err(Error::invalid("payload exceeds bus entry size"));
        }
        self.expire_aged(bufs, now_ms);
        if self.count == self.cfg.max_entries {
            self.evict_tail(bufs);
        }
        let mut buf = PayloadBuf::zeroed();
        buf.0[..data.len()].copy_from_slice(data);
        let idx = bufs.alloc(buf)?;
        let seq = self.next_seq;
        self.next_seq += 1;
        self.ring[self.head] = BusEntry {
            valid: true,
            seq,
            buf: Some(idx),
            len: data.len(),
            ts_ms: now_ms,
            read_count: 0,
            readers_mask: 0,
        };
        self.head = (self.head + 1) % self.cfg.max_entries;
        self.count += 1;
        trace!(bus = %self.id, seq, len = data.len(), "published");
        Ok(self
            .subs
            .iter()
            .filter(|s| s.active && s.blocked)
            .map(|s| s.actor)
            .collect())
    }

    /// True when `actor` has an unread entry waiting.
    #[cfg(test)]
    pub fn has_unread(&self, actor: ActorId) -> bool {
        match self.sub_index(actor) {
            Some(slot) => self.find_unread(slot).is_some(),
            None => false,
        }
    }

    /// Non-blocking read into `dst`, truncating if needed; reports the
    /// entry's full length.
    pub fn read_into(
        &mut self,
        actor: ActorId,
        bufs: &mut Pool<PayloadBuf>,
        dst: &mut [u8],
    ) -> Result<usize> {
        let slot = self
            .sub_index(actor)
            .ok_or(Error::invalid("not subscribed"))?;
        let ring_idx = self
            .find_unread(slot)
            .ok_or(Error::would_block("no unread bus entries"))?;
        let (src, len) = {
            let entry = &self.ring[ring_idx];
            let buf_idx = entry.buf.ok_or(Error::invalid("bus entry has no payload"))?;
            let buf = bufs
                .get(buf_idx)
                .ok_or(Error::invalid("bus entry payload missing"))?;
            (buf.0, entry.len)
        };
        let n = len.min(dst.len());
        dst[..n].copy_from_slice(&src[..n]);
        self.mark_read(ring_idx, slot, bufs);
        Ok(len)
    }

    /// Consume the next unread entry into a fresh pool buffer (the
    /// select-returned bus data path). Returns the buffer and length.
    pub fn consume_to_buf(
        &mut self,
        actor: ActorId,
        bufs: &mut Pool<PayloadBuf>,
    ) -> Result<(PoolIdx, usize)> {
        let slot = self
            .sub_index(actor)
            .ok_or(Error::invalid("not subscribed"))?;
        let ring_idx = self
            .find_unread(slot)
            .ok_or(Error::would_block("no unread bus entries"))?;
        let (copy, len) = {
            let entry = &self.ring[ring_idx];
            let buf_idx = entry.buf.ok_or(Error::invalid("bus entry has no payload"))?;
            let buf = bufs
                .get(buf_idx)
                .ok_or(Error::invalid("bus entry payload missing"))?;
            (buf.0, entry.len)
        };
        let out = bufs.alloc(PayloadBuf(copy))?;
        self.mark_read(ring_idx, slot, bufs);
        Ok((out, len))
    }

    /// Release every payload buffer; used by destroy.
    pub fn drain(&mut self, bufs: &mut Pool<PayloadBuf>) {
        for i in 0..self.ring.len() {
            if let Some(idx) = self.ring[i].buf.take() {
                bufs.free(idx);
            }
            self.ring[i].valid = false;
        }
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    fn sub_index(&self, actor: ActorId) -> Option<usize> {
        self.subs.iter().position(|s| s.active && s.actor == actor)
    }

    /// Ring indices in the `[tail, head)` window, oldest first.
    fn window(&self) -> impl Iterator<Item = usize> + '_ {
        let cap = self.cfg.max_entries;
        let tail = self.tail;
        (0..self.count).map(move |k| (tail + k) % cap)
    }

    fn find_unread(&self, slot: usize) -> Option<usize> {
        let bit = 1u32 << slot;
        let next_seq = self.subs[slot].next_seq;
        self.window().find(|&i| {
            let e = &self.ring[i];
            e.valid && e.seq >= next_seq && e.readers_mask & bit == 0
        })
    }

    fn mark_read(&mut self, ring_idx: usize, slot: usize, bufs: &mut Pool<PayloadBuf>) {
        let consume_after = self.cfg.consume_after_reads;
        let entry = &mut self.ring[ring_idx];
        entry.readers_mask |= 1u32 << slot;
        entry.read_count += 1;
        self.subs[slot].next_seq = entry.seq + 1;
        if consume_after > 0 && entry.read_count >= consume_after {
            if let Some(idx) = entry.buf.take() {
                bufs.free(idx);
            }
            entry.valid = false;
            self.advance_tail_past_holes();
        }
    }

    fn evict_tail(&mut self, bufs: &mut Pool<PayloadBuf>) {
        if self.count == 0 {
            return;
        }
        let entry = &mut self.ring[self.tail];
        if let Some(idx) = entry.buf.take() {
            bufs.free(idx);
        }
        if entry.valid {
            trace!(bus = %self.id, seq = entry.seq, "evicted oldest entry");
        }
        entry.valid = false;
        self.tail = (self.tail + 1) % self.cfg.max_entries;
        self.count -= 1;
        self.advance_tail_past_holes();
    }

    /// Expire aged entries. Entries stamped in the future (the wall clock
    /// went backward) are left alone.
    fn expire_aged(&mut self, bufs: &mut Pool<PayloadBuf>, now_ms: i64) {
        if self.cfg.max_age_ms == 0 {
            return;
        }
        let indices: Vec<usize> = self.window().collect();
        for i in indices {
            let entry = &mut self.ring[i];
            if !entry.valid || entry.ts_ms > now_ms {
                continue;
            }
            if (now_ms - entry.ts_ms) as u64 >= self.cfg.max_age_ms {
                if let Some(idx) = entry.buf.take() {
                    bufs.free(idx);
                }
                entry.valid = false;
                trace!(bus = %self.id, seq = entry.seq, "expired aged entry");
            }
        }
        self.advance_tail_past_holes();
    }

    fn advance_tail_past_holes(&mut self) {
        while self.count > 0 && !self.ring[self.tail].valid {
            self.tail = (self.tail + 1) % self.cfg.max_entries;
            self.count -= 1;
        }
    }

    /// Invariant check for tests: every valid entry's mask popcount is
    /// bounded by active subscribers and its read count.
    #[cfg(test)]
    fn masks_consistent(&self) -> bool {
        let active = self.subscriber_count() as u32;
        self.window().all(|i| {
            let e = &self.ring[i];
            !e.valid
                || (e.readers_mask.count_ones() <= active
                    && e.read_count >= e.readers_mask.count_ones())
        })
    }
}
