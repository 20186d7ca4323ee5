//! Actor control blocks and the fixed slot table.
//!
//! The table owns every per-actor resource handle: stack, saved context,
//! mailbox, link/monitor records, and the recorded select sources of a
//! waiting actor. Ids are issued from a monotonic counter and never reused;
//! slots are. All cross-references between actors are `ActorId` values
//! resolved through this table.

// Layer 1: Standard library imports
use std::alloc::Layout;
use std::os::unix::io::RawFd;
use std::rc::Rc;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::config::{Priority, SpawnInfo};
use super::state::{ActorState, ExitReason};
use crate::alloc::{PoolIdx, StackSpan};
use crate::arch::Context;
use crate::mailbox::Mailbox;
use crate::runtime::ctx::Ctx;
use crate::runtime::select::Source;
use crate::util::{ActorId, MonitorRef};

/// Guard word stamped at both ends of every actor stack.
pub(crate) const STACK_GUARD: u64 = 0xDEAD_BEEF_CAFE_BABE;

/// Bytes reserved for one guard word.
pub(crate) const GUARD_BYTES: usize = 8;

/// Where an actor's stack came from.
pub(crate) enum StackKind {
    None,
    Arena(StackSpan),
    Heap(Layout),
}

/// An in-flight fd readiness wait.
pub(crate) struct IoWait {
    pub fd: RawFd,
    pub writable: bool,
}

/// One monitor record owned by the watching actor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MonitorRecord {
    pub mref: MonitorRef,
    pub target: ActorId,
}

/// Opaque trampoline argument; stable for the slot's lifetime because the
/// slot array never reallocates.
#[derive(Clone, Copy)]
pub(crate) struct BootArgs {
    pub core: *const (),
    pub slot: usize,
}

impl BootArgs {
    const fn empty() -> Self {
        Self {
            core: std::ptr::null(),
            slot: 0,
        }
    }
}

/// Control block of one actor slot.
pub(crate) struct ActorSlot {
    pub id: ActorId,
    pub state: ActorState,
    pub priority: Priority,
    pub name: Option<&'static str>,
    pub stack: StackKind,
    /// Cached stack extent, guards included. Null while `stack` is `None`.
    pub stack_base: *mut u8,
    pub stack_len: usize,
    pub ctx: Context,
    pub mailbox: Mailbox,
    /// Most recently consumed mailbox entry; its payload is what the actor
    /// currently borrows.
    pub active_msg: Option<PoolIdx>,
    /// Buffer holding the bus payload returned by the last select/bus read.
    pub active_bus: Option<PoolIdx>,
    /// Sources recorded while blocked in select; empty otherwise.
    pub select_sources: Vec<Source>,
    pub links: Vec<ActorId>,
    pub monitors: Vec<MonitorRecord>,
    pub exit_reason: ExitReason,
    pub siblings: Option<Rc<[SpawnInfo]>>,
    pub entry: Option<Box<dyn FnOnce(&mut Ctx)>>,
    pub boot: BootArgs,
    pub io_wait: Option<IoWait>,
    pub io_ready: bool,
}

impl ActorSlot {
    fn empty() -> Self {
        Self {
            id: ActorId::INVALID,
            state: ActorState::Dead,
            priority: Priority::Normal,
            name: None,
            stack: StackKind::None,
            stack_base: std::ptr::null_mut(),
            stack_len: 0,
            ctx: Context::new(),
            mailbox: Mailbox::new(),
            active_msg: None,
            active_bus: None,
            select_sources: Vec::with_capacity(8),
            links: Vec::with_capacity(8),
            monitors: Vec::with_capacity(8),
            exit_reason: ExitReason::Normal,
            siblings: None,
            entry: None,
            boot: BootArgs::empty(),
            io_wait: None,
            io_ready: false,
        }
    }

    /// Stamp the guard words at both ends of the attached stack.
    ///
    /// # Safety
    /// `stack_base`/`stack_len` must describe a live allocation.
    pub unsafe fn stamp_guards(&mut self) {
        debug_assert!(!self.stack_base.is_null());
        (self.stack_base as *mut u64).write_unaligned(STACK_GUARD);
        (self.stack_base.add(self.stack_len - GUARD_BYTES) as *mut u64)
            .write_unaligned(STACK_GUARD);
    }

    /// Verify both guard words. True when no stack is attached.
    pub fn guards_intact(&self) -> bool {
        if self.stack_base.is_null() {
            return true;
        }
        // SAFETY: base/len describe the live stack allocation.
        unsafe {
            (self.stack_base as *const u64).read_unaligned() == STACK_GUARD
                && (self.stack_base.add(self.stack_len - GUARD_BYTES) as *const u64)
                    .read_unaligned()
                    == STACK_GUARD
        }
    }

    /// The region between the two guard words, for context seeding.
    pub fn usable_stack(&self) -> (*mut u8, usize) {
        debug_assert!(self.stack_len > 2 * GUARD_BYTES);
        // SAFETY: base/len describe the live stack allocation.
        let base = unsafe { self.stack_base.add(GUARD_BYTES) };
        (base, self.stack_len - 2 * GUARD_BYTES)
    }
}

/// Fixed array of actor slots plus the monotonic id counter.
pub(crate) struct ActorTable {
    slots: Box<[ActorSlot]>,
    next_raw_id: u32,
}

impl ActorTable {
    pub fn new(max_actors: usize) -> Self {
        let mut slots = Vec::with_capacity(max_actors);
        slots.resize_with(max_actors, ActorSlot::empty);
        Self {
            slots: slots.into_boxed_slice(),
            next_raw_id: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Issue the next actor id, skipping the INVALID and ANY values.
    pub fn issue_id(&mut self) -> ActorId {
        loop {
            self.next_raw_id = self.next_raw_id.wrapping_add(1);
            let id = ActorId::from_raw(self.next_raw_id);
            if id.is_valid() {
                return id;
            }
        }
    }

    pub fn find_dead(&self) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.state == ActorState::Dead)
    }

    /// Slot currently holding a live (non-dead) actor with this id.
    pub fn resolve(&self, id: ActorId) -> Option<usize> {
        if !id.is_valid() {
            return None;
        }
        self.slots
            .iter()
            .position(|s| s.id == id && s.state != ActorState::Dead)
    }

    pub fn alive(&self, id: ActorId) -> bool {
        self.resolve(id).is_some()
    }

    pub fn all_dead(&self) -> bool {
        self.slots.iter().all(|s| s.state == ActorState::Dead)
    }

    pub fn slot(&self, idx: usize) -> &ActorSlot {
        &self.slots[idx]
    }

    pub fn slot_mut(&mut self, idx: usize) -> &mut ActorSlot {
        &mut self.slots[idx]
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &ActorSlot)> {
        self.slots.iter().enumerate()
    }
}

impl Drop for ActorTable {
    fn drop(&mut self) {
        // Arena spans die with the arena; heap stacks are freed here.
        for slot in self.slots.iter_mut() {
            let kind = std::mem::replace(&mut slot.stack, StackKind::None);
            if let StackKind::Heap(layout) = kind {
                // SAFETY: base was allocated with exactly this layout and is
                // not referenced anywhere once the table is dropped.
                unsafe { std::alloc::dealloc(slot.stack_base, layout) };
                slot.stack_base = std::ptr::null_mut();
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_and_valid() {
        let mut table = ActorTable::new(4);
        let a = table.issue_id();
        let b = table.issue_id();
        assert!(a.is_valid() && b.is_valid());
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_id_counter_skips_reserved_values() {
        let mut table = ActorTable::new(1);
        table.next_raw_id = u32::MAX - 1;
        let a = table.issue_id(); // u32::MAX is ANY, skipped to 1
        assert_eq!(a.raw(), 1);
    }

    #[test]
    fn test_resolve_ignores_dead_slots() {
        let mut table = ActorTable::new(2);
        let id = table.issue_id();
        let idx = table.find_dead().unwrap();
        table.slot_mut(idx).id = id;
        table.slot_mut(idx).state = ActorState::Ready;
        assert_eq!(table.resolve(id), Some(idx));
        assert!(table.alive(id));
        table.slot_mut(idx).state = ActorState::Dead;
        assert_eq!(table.resolve(id), None);
        assert!(!table.alive(id));
    }

    #[test]
    fn test_guard_stamp_and_check() {
        let mut table = ActorTable::new(1);
        let mut stack = vec![0u8; 256];
        let slot = table.slot_mut(0);
        slot.stack_base = stack.as_mut_ptr();
        slot.stack_len = stack.len();
        unsafe { slot.stamp_guards() };
        assert!(slot.guards_intact());
        stack[255] = 0; // clobber the high guard
        assert!(!table.slot(0).guards_intact());
        table.slot_mut(0).stack_base = std::ptr::null_mut();
    }
}
