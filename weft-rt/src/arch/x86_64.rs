//! x86-64 SysV context switch.
//!
//! The switch routine is an ordinary extern "C" function, so caller-saved
//! registers are already spilled at the call site; it needs to preserve only
//! rbp, rbx, r12–r15 and the stack pointer. SysV has no callee-saved FP
//! registers, so no FP state is touched here.

// Layer 1: Standard library imports
use core::arch::global_asm;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
use super::{Context, EntryFn};

global_asm!(
    ".text",
    ".balign 16",
    ".globl weft_ctx_switch",
    "weft_ctx_switch:",
    "push rbp",
    "push rbx",
    "push r12",
    "push r13",
    "push r14",
    "push r15",
    "mov [rdi], rsp",
    "mov rsp, [rsi]",
    "pop r15",
    "pop r14",
    "pop r13",
    "pop r12",
    "pop rbx",
    "pop rbp",
    "ret",
    // First-switch landing pad. The seeded frame put the entry function in
    // rbx and its argument in r12; re-align the stack before the call so the
    // entry observes a conformant SysV frame.
    ".balign 16",
    ".globl weft_actor_boot",
    "weft_actor_boot:",
    "and rsp, -16",
    "mov rdi, r12",
    "call rbx",
    "ud2",
);

extern "C" {
    pub(super) fn weft_ctx_switch(from: *mut Context, to: *const Context);
    fn weft_actor_boot() -> !;
}

/// Number of u64 slots in a seeded frame: r15 r14 r13 r12 rbx rbp ret.
const SEED_SLOTS: usize = 7;

/// Write the initial switch frame near the top of `stack` and return the
/// stack pointer value to store in the context.
pub(super) unsafe fn seed_stack(
    stack_base: *mut u8,
    usable_len: usize,
    entry: EntryFn,
    arg: *mut u8,
) -> usize {
    let top = stack_base as usize + usable_len;
    let sp = (top - SEED_SLOTS * 8) & !15;
    let slots = sp as *mut u64;
    slots.add(0).write(0); // r15
    slots.add(1).write(0); // r14
    slots.add(2).write(0); // r13
    slots.add(3).write(arg as u64); // r12
    slots.add(4).write(entry as usize as u64); // rbx
    slots.add(5).write(0); // rbp
    slots.add(6).write(weft_actor_boot as usize as u64); // return address
    sp
}
