//! Fixed-capacity allocators underlying every other subsystem.
//!
//! [`Pool`] is a preallocated slab of same-size records with a bitmap
//! freelist; [`StackArena`] is a first-fit, coalescing byte allocator that
//! backs actor stacks. Both are single-threaded, unsynchronized, and fail with
//! `Nomem` on exhaustion, leaving all other state untouched.

pub mod arena;
pub mod pool;

pub use arena::{StackArena, StackSpan};
pub use pool::{Pool, PoolIdx};
