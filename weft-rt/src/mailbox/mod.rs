//! Per-actor mailbox: a doubly-linked FIFO of pool-allocated entries.
//!
//! Entries and their payload buffers live in two process-wide pools; the
//! mailbox itself is just `{head, tail, count}` plus the intrusive links
//! inside each entry. Every operation takes the pools explicitly, so the
//! mailbox stays a plain value inside its actor's control block.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use crate::alloc::{Pool, PoolIdx};
use crate::message::types::{decode_header, PayloadBuf};
use crate::message::{MsgClass, RecvFilter, Tag, HEADER_SIZE};
use crate::util::ActorId;

/// One queued message: sender, payload buffer, and intrusive links.
pub(crate) struct MailEntry {
    pub sender: ActorId,
    pub buf: PoolIdx,
    /// Header plus payload bytes actually written into `buf`.
    pub total_len: usize,
    pub prev: Option<PoolIdx>,
    pub next: Option<PoolIdx>,
}

/// Decoded metadata of a queued entry, used for filter matching.
#[derive(Debug, Clone, Copy)]
pub(crate) struct EntryMeta {
    pub sender: ActorId,
    pub class: MsgClass,
    pub tag: Tag,
}

/// Decode an entry's header. Entries shorter than the header, or with an
/// unknown class nibble, never match any filter and yield `None`.
pub(crate) fn entry_meta(entry: &MailEntry, bufs: &Pool<PayloadBuf>) -> Option<EntryMeta> {
    if entry.total_len < HEADER_SIZE {
        return None;
    }
    let buf = bufs.get(entry.buf)?;
    let (class, tag) = decode_header(buf.header());
    let class = class?;
    Some(EntryMeta {
        sender: entry.sender,
        class,
        tag,
    })
}

/// FIFO of pending messages owned by one actor.
#[derive(Default)]
pub(crate) struct Mailbox {
    head: Option<PoolIdx>,
    tail: Option<PoolIdx>,
    count: usize,
}

impl Mailbox {
    pub const fn new() -> Self {
        Self {
            head: None,
            tail: None,
            count: 0,
        }
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn head(&self) -> Option<PoolIdx> {
        self.head
    }

    /// Append `idx` at the tail. The entry must not be linked anywhere.
    pub fn push_back(&mut self, entries: &mut Pool<MailEntry>, idx: PoolIdx) {
        if let Some(e) = entries.get_mut(idx) {
            e.prev = self.tail;
            e.next = None;
        }
        match self.tail {
            Some(tail) => {
                if let Some(t) = entries.get_mut(tail) {
                    t.next = Some(idx);
                }
            }
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
        self.count += 1;
    }

    /// Unlink `idx` from anywhere in the queue.
    pub fn unlink(&mut self, entries: &mut Pool<MailEntry>, idx: PoolIdx) {
        let (prev, next) = match entries.get(idx) {
            Some(e) => (e.prev, e.next),
            None => return,
        };
        match prev {
            Some(p) => {
                if let Some(e) = entries.get_mut(p) {
                    e.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(e) = entries.get_mut(n) {
                    e.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(e) = entries.get_mut(idx) {
            e.prev = None;
            e.next = None;
        }
        self.count -= 1;
    }

    /// First entry (FIFO order) matching `filter`, if any.
    pub fn find_first_match(
        &self,
        entries: &Pool<MailEntry>,
        bufs: &Pool<PayloadBuf>,
        filter: &RecvFilter,
    ) -> Option<PoolIdx> {
        let mut cur = self.head;
        while let Some(idx) = cur {
            let entry = entries.get(idx)?;
            if let Some(meta) = entry_meta(entry, bufs) {
                if filter.matches(meta.sender, meta.class, meta.tag) {
                    return Some(idx);
                }
            }
            cur = entry.next;
        }
        None
    }

    /// Drop every queued entry, returning buffers and entries to the pools.
    pub fn clear(&mut self, entries: &mut Pool<MailEntry>, bufs: &mut Pool<PayloadBuf>) {
        let mut cur = self.head;
        while let Some(idx) = cur {
            cur = entries.get(idx).and_then(|e| e.next);
            if let Some(entry) = entries.free(idx) {
                bufs.free(entry.buf);
            }
        }
        self.head = None;
        self.tail = None;
        self.count = 0;
    }

    /// Walk both directions and check the count invariant. Test support.
    #[cfg(test)]
    pub fn is_consistent(&self, entries: &Pool<MailEntry>) -> bool {
        let mut forward = 0;
        let mut cur = self.head;
        let mut last = None;
        while let Some(idx) = cur {
            forward += 1;
            last = Some(idx);
            cur = match entries.get(idx) {
                Some(e) => e.next,
                None => return false,
            };
        }
        if last != self.tail {
            return false;
        }
        let mut backward = 0;
        let mut cur = self.tail;
        while let Some(idx) = cur {
            backward += 1;
            cur = match entries.get(idx) {
                Some(e) => e.prev,
                None => return false,
            };
        }
        forward == self.count && backward == self.count
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn pools() -> (Pool<MailEntry>, Pool<PayloadBuf>) {
        (
            Pool::new(16, "test mail entries"),
            Pool::new(16, "test payload buffers"),
        )
    }

    fn enqueue(
        mbox: &mut Mailbox,
        entries: &mut Pool<MailEntry>,
        bufs: &mut Pool<PayloadBuf>,
        sender: u32,
        class: MsgClass,
        tag: u32,
        payload: &[u8],
    ) -> PoolIdx {
        let mut buf = PayloadBuf::zeroed();
        buf.fill(class, Tag::new(tag), payload);
        let b = bufs.alloc(buf).unwrap();
        let e = entries
            .alloc(MailEntry {
                sender: ActorId::from_raw(sender),
                buf: b,
                total_len: HEADER_SIZE + payload.len(),
                prev: None,
                next: None,
            })
            .unwrap();
        mbox.push_back(entries, e);
        e
    }

    #[test]
    fn test_fifo_order_and_counts() {
        let (mut entries, mut bufs) = pools();
        let mut mbox = Mailbox::new();
        let a = enqueue(&mut mbox, &mut entries, &mut bufs, 1, MsgClass::Notify, 0, b"a");
        let b = enqueue(&mut mbox, &mut entries, &mut bufs, 1, MsgClass::Notify, 0, b"b");
        assert_eq!(mbox.count(), 2);
        assert_eq!(mbox.head(), Some(a));
        assert!(mbox.is_consistent(&entries));
        mbox.unlink(&mut entries, a);
        assert_eq!(mbox.head(), Some(b));
        assert!(mbox.is_consistent(&entries));
    }

    #[test]
    fn test_unlink_middle_preserves_order() {
        let (mut entries, mut bufs) = pools();
        let mut mbox = Mailbox::new();
        let a = enqueue(&mut mbox, &mut entries, &mut bufs, 1, MsgClass::Notify, 1, b"a");
        let b = enqueue(&mut mbox, &mut entries, &mut bufs, 1, MsgClass::Notify, 2, b"b");
        let c = enqueue(&mut mbox, &mut entries, &mut bufs, 1, MsgClass::Notify, 3, b"c");
        mbox.unlink(&mut entries, b);
        assert_eq!(mbox.count(), 2);
        assert_eq!(mbox.head(), Some(a));
        assert_eq!(entries.get(a).unwrap().next, Some(c));
        assert_eq!(entries.get(c).unwrap().prev, Some(a));
        assert!(mbox.is_consistent(&entries));
    }

    #[test]
    fn test_filter_scan_first_match_wins() {
        let (mut entries, mut bufs) = pools();
        let mut mbox = Mailbox::new();
        enqueue(&mut mbox, &mut entries, &mut bufs, 1, MsgClass::Notify, 0, b"x");
        let hit = enqueue(&mut mbox, &mut entries, &mut bufs, 2, MsgClass::Reply, 7, b"y");
        enqueue(&mut mbox, &mut entries, &mut bufs, 2, MsgClass::Reply, 7, b"z");
        let filter = RecvFilter::new(ActorId::from_raw(2), MsgClass::Reply, Tag::new(7));
        assert_eq!(mbox.find_first_match(&entries, &bufs, &filter), Some(hit));
    }

    #[test]
    fn test_short_entry_never_matches() {
        let (mut entries, mut bufs) = pools();
        let mut mbox = Mailbox::new();
        let b = bufs.alloc(PayloadBuf::zeroed()).unwrap();
        let e = entries
            .alloc(MailEntry {
                sender: ActorId::from_raw(1),
                buf: b,
                total_len: 2, // below the header size
                prev: None,
                next: None,
            })
            .unwrap();
        mbox.push_back(&mut entries, e);
        assert_eq!(mbox.find_first_match(&entries, &bufs, &RecvFilter::ANY), None);
    }

    #[test]
    fn test_clear_returns_everything() {
        let (mut entries, mut bufs) = pools();
        let mut mbox = Mailbox::new();
        for i in 0..5 {
            enqueue(&mut mbox, &mut entries, &mut bufs, 1, MsgClass::Notify, i, b"p");
        }
        mbox.clear(&mut entries, &mut bufs);
        assert_eq!(mbox.count(), 0);
        assert_eq!(entries.allocated(), 0);
        assert_eq!(bufs.allocated(), 0);
    }
}
