//! Topic bus: many-to-many bounded rings with per-subscriber read tracking.
//!
//! A bus keeps a fixed ring of published entries and a fixed subscriber slot
//! table; the slot index is the subscriber's bit in each entry's
//! `readers_mask`. Retention is capacity (drop-oldest), optional age expiry,
//! and optional consume-after-N-reads. Blocking reads integrate with the
//! select primitive through the per-subscriber `blocked` flag.

pub mod config;
pub(crate) mod table;
pub(crate) mod topic;

pub use config::BusConfig;
pub(crate) use table::BusTable;
pub(crate) use topic::Bus;
