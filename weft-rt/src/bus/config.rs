//! Per-bus configuration, validated against global caps.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::error::{Error, Result};
use crate::message::MAX_MESSAGE_SIZE;

/// Hard cap on ring capacity.
pub const MAX_BUS_ENTRIES: usize = 4096;

/// Hard cap on subscribers; the readers mask is 32 bits wide.
pub const MAX_BUS_SUBSCRIBERS: usize = 32;

/// Default ring capacity.
pub const DEFAULT_BUS_ENTRIES: usize = 16;

/// Default per-entry payload limit.
pub const DEFAULT_BUS_ENTRY_SIZE: usize = 256;

/// Default subscriber slots.
pub const DEFAULT_BUS_SUBSCRIBERS: usize = 8;

/// Retention and capacity settings of one bus.
///
/// # Examples
///
/// ```rust
/// use weft_rt::bus::BusConfig;
///
/// let cfg = BusConfig::new()
///     .with_max_entries(4)
///     .with_max_entry_size(64)
///     .with_consume_after_reads(2);
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.max_entries, 4);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BusConfig {
    /// Ring capacity; the oldest entry is dropped when full.
    pub max_entries: usize,
    /// Largest accepted payload.
    pub max_entry_size: usize,
    /// Subscriber slots (≤ 32).
    pub max_subscribers: usize,
    /// Entries at least this old are expired from the tail; `0` disables.
    pub max_age_ms: u64,
    /// Free an entry once this many subscribers have read it; `0` keeps it
    /// until evicted.
    pub consume_after_reads: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_BUS_ENTRIES,
            max_entry_size: DEFAULT_BUS_ENTRY_SIZE,
            max_subscribers: DEFAULT_BUS_SUBSCRIBERS,
            max_age_ms: 0,
            consume_after_reads: 0,
        }
    }
}

impl BusConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    pub fn with_max_entry_size(mut self, max_entry_size: usize) -> Self {
        self.max_entry_size = max_entry_size;
        self
    }

    pub fn with_max_subscribers(mut self, max_subscribers: usize) -> Self {
        self.max_subscribers = max_subscribers;
        self
    }

    pub fn with_max_age_ms(mut self, max_age_ms: u64) -> Self {
        self.max_age_ms = max_age_ms;
        self
    }

    pub fn with_consume_after_reads(mut self, consume_after_reads: u32) -> Self {
        self.consume_after_reads = consume_after_reads;
        self
    }

    /// Check every field against the compile-time caps.
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 || self.max_entries > MAX_BUS_ENTRIES {
            return Err(Error::invalid("bus max_entries out of range"));
        }
        if self.max_entry_size == 0 || self.max_entry_size > MAX_MESSAGE_SIZE {
            return Err(Error::invalid("bus max_entry_size out of range"));
        }
        if self.max_subscribers == 0 || self.max_subscribers > MAX_BUS_SUBSCRIBERS {
            return Err(Error::invalid("bus max_subscribers out of range"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(BusConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(BusConfig::new().with_max_entries(0).validate().is_err());
        assert!(BusConfig::new()
            .with_max_subscribers(33)
            .validate()
            .is_err());
        assert!(BusConfig::new()
            .with_max_entry_size(MAX_MESSAGE_SIZE + 1)
            .validate()
            .is_err());
    }
}
