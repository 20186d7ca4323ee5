//! Runtime configuration with sensible defaults.

// Layer 1: Standard library imports
// (none)

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
use crate::error::{Error, Result};

/// Default actor table size.
pub const DEFAULT_MAX_ACTORS: usize = 64;

/// Hard cap on the actor table.
pub const MAX_ACTORS_CAP: usize = 1024;

/// Default stack bytes per actor (guards included).
pub const DEFAULT_STACK_SIZE: usize = 64 * 1024;

/// Smallest accepted actor stack.
pub const MIN_STACK_SIZE: usize = 16 * 1024;

/// Default stack arena size.
pub const DEFAULT_ARENA_SIZE: usize = 8 * 1024 * 1024;

/// Default message payload buffer count.
pub const DEFAULT_MSG_BUFS: usize = 512;

/// Default mailbox entry count.
pub const DEFAULT_MAIL_ENTRIES: usize = 512;

/// Default timer table size.
pub const DEFAULT_MAX_TIMERS: usize = 128;

/// Default bus table size.
pub const DEFAULT_MAX_BUSES: usize = 16;

/// Default name registry capacity.
pub const DEFAULT_REGISTRY_CAPACITY: usize = 64;

/// Reactor wait when no actor is ready. Short on purpose: IPC, bus, and
/// link wakeups happen outside the reactor and must be observed promptly.
pub const DEFAULT_POLL_TIMEOUT_MS: u64 = 10;

/// Most sources one select may wait on.
pub const MAX_SELECT_SOURCES: usize = 16;

/// Most filters one selective receive may scan.
pub const MAX_RECV_FILTERS: usize = 16;

/// Most links one actor may hold.
pub const MAX_LINKS: usize = 32;

/// Most monitors one actor may hold.
pub const MAX_MONITORS: usize = 32;

/// Sizing of every fixed table and pool in one runtime instance.
///
/// # Examples
///
/// ```rust
/// use weft_rt::RuntimeConfig;
///
/// let cfg = RuntimeConfig::builder()
///     .with_max_actors(8)
///     .with_arena_size(1024 * 1024)
///     .build()
///     .unwrap();
/// assert_eq!(cfg.max_actors, 8);
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Actor table slots.
    pub max_actors: usize,
    /// Stack bytes for spawns that pass `stack_size == 0`.
    pub default_stack_size: usize,
    /// Bytes in the stack arena.
    pub arena_size: usize,
    /// Message payload buffers (shared by mailboxes, buses, and select).
    pub msg_buf_count: usize,
    /// Mailbox entry records.
    pub mail_entry_count: usize,
    /// Timer table slots.
    pub max_timers: usize,
    /// Bus table slots.
    pub max_buses: usize,
    /// Name registry capacity.
    pub registry_capacity: usize,
    /// Reactor wait (ms) when no actor is ready.
    pub poll_timeout_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            max_actors: DEFAULT_MAX_ACTORS,
            default_stack_size: DEFAULT_STACK_SIZE,
            arena_size: DEFAULT_ARENA_SIZE,
            msg_buf_count: DEFAULT_MSG_BUFS,
            mail_entry_count: DEFAULT_MAIL_ENTRIES,
            max_timers: DEFAULT_MAX_TIMERS,
            max_buses: DEFAULT_MAX_BUSES,
            registry_capacity: DEFAULT_REGISTRY_CAPACITY,
            poll_timeout_ms: DEFAULT_POLL_TIMEOUT_MS,
        }
    }
}

impl RuntimeConfig {
    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder::default()
    }

    /// Check every field before the tables are sized from it.
    pub fn validate(&self) -> Result<()> {
        if self.max_actors == 0 || self.max_actors > MAX_ACTORS_CAP {
            return Err(Error::invalid("max_actors out of range"));
        }
        if self.default_stack_size < MIN_STACK_SIZE {
            return Err(Error::invalid("default_stack_size below minimum"));
        }
        if self.arena_size < self.default_stack_size {
            return Err(Error::invalid("arena smaller than one default stack"));
        }
        if self.msg_buf_count == 0 || self.mail_entry_count == 0 {
            return Err(Error::invalid("message pools must be non-empty"));
        }
        if self.max_timers == 0 {
            return Err(Error::invalid("max_timers must be non-zero"));
        }
        if self.poll_timeout_ms == 0 {
            return Err(Error::invalid("poll_timeout_ms must be non-zero"));
        }
        Ok(())
    }
}

/// Fluent builder for [`RuntimeConfig`].
#[derive(Debug, Default)]
pub struct RuntimeConfigBuilder {
    config: RuntimeConfig,
}

impl RuntimeConfigBuilder {
    pub fn with_max_actors(mut self, max_actors: usize) -> Self {
        self.config.max_actors = max_actors;
        self
    }

    pub fn with_default_stack_size(mut self, bytes: usize) -> Self {
        self.config.default_stack_size = bytes;
        self
    }

    pub fn with_arena_size(mut self, bytes: usize) -> Self {
        self.config.arena_size = bytes;
        self
    }

    pub fn with_msg_buf_count(mut self, count: usize) -> Self {
        self.config.msg_buf_count = count;
        self
    }

    pub fn with_mail_entry_count(mut self, count: usize) -> Self {
        self.config.mail_entry_count = count;
        self
    }

    pub fn with_max_timers(mut self, count: usize) -> Self {
        self.config.max_timers = count;
        self
    }

    pub fn with_max_buses(mut self, count: usize) -> Self {
        self.config.max_buses = count;
        self
    }

    pub fn with_registry_capacity(mut self, count: usize) -> Self {
        self.config.registry_capacity = count;
        self
    }

    pub fn with_poll_timeout_ms(mut self, ms: u64) -> Self {
        self.config.poll_timeout_ms = ms;
        self
    }

    /// Validate and produce the config.
    pub fn build(self) -> Result<RuntimeConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(RuntimeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_builder_round_trip() {
        let cfg = RuntimeConfig::builder()
            .with_max_actors(4)
            .with_max_buses(2)
            .build()
            .unwrap();
        assert_eq!(cfg.max_actors, 4);
        assert_eq!(cfg.max_buses, 2);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(RuntimeConfig::builder().with_max_actors(0).build().is_err());
        assert!(RuntimeConfig::builder()
            .with_default_stack_size(1024)
            .build()
            .is_err());
        assert!(RuntimeConfig::builder()
            .with_arena_size(MIN_STACK_SIZE - 1)
            .build()
            .is_err());
    }

    #[test]
    fn test_config_deserializes() {
        let json = r#"{
            "max_actors": 16,
            "default_stack_size": 32768,
            "arena_size": 1048576,
            "msg_buf_count": 64,
            "mail_entry_count": 64,
            "max_timers": 8,
            "max_buses": 4,
            "registry_capacity": 8,
            "poll_timeout_ms": 5
        }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.max_actors, 16);
    }
}
