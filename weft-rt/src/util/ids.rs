// Layer 1: Standard library imports
use std::fmt::{self, Display};

// Layer 2: Third-party crate imports
use serde::{Deserialize, Serialize};

// Layer 3: Internal module imports
// (none)

/// Unique identifier for actors in the runtime.
///
/// # Design
/// 32-bit values issued from a monotonic counter by the actor table, so an id
/// is never reused within a process even when its table slot is. `0` is
/// reserved as the invalid id and `0xFFFF_FFFF` as the receive-filter
/// wildcard.
///
/// # Example
/// ```rust
/// use weft_rt::util::ActorId;
///
/// assert!(!ActorId::INVALID.is_valid());
/// assert!(ActorId::from_raw(1).is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// Reserved "no actor" value.
    pub const INVALID: ActorId = ActorId(0);

    /// Wildcard sender in receive filters.
    pub const ANY: ActorId = ActorId(u32::MAX);

    /// Build an id from its raw value.
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// The raw 32-bit value.
    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// True for ids that can name a live actor (neither INVALID nor ANY).
    pub const fn is_valid(&self) -> bool {
        self.0 != Self::INVALID.0 && self.0 != Self::ANY.0
    }
}

impl Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::ANY {
            f.write_str("actor(*)")
        } else {
            write!(f, "actor({})", self.0)
        }
    }
}

/// Unique identifier for topic buses. `0` is reserved as invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BusId(u32);

impl BusId {
    pub const INVALID: BusId = BusId(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bus({})", self.0)
    }
}

/// Unique identifier for timers. `0` is reserved as invalid.
///
/// Timer ids double as the tag of the TIMER-class message a firing delivers,
/// so they are issued with the runtime tag bit (bit 27) already set and never
/// collide with user tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimerId(u32);

impl TimerId {
    pub const INVALID: TimerId = TimerId(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    pub const fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

impl Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer({:#x})", self.0)
    }
}

/// Reference naming one monitor record, issued at `monitor()` time.
///
/// Monitor refs share the runtime tag space with timer ids and request call
/// tags; the ref becomes the tag of the EXIT message the monitor delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonitorRef(u32);

impl MonitorRef {
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }
}

impl Display for MonitorRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mref({:#x})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id_reserved_values() {
        assert_eq!(ActorId::INVALID.raw(), 0);
        assert_eq!(ActorId::ANY.raw(), u32::MAX);
        assert!(!ActorId::INVALID.is_valid());
        assert!(!ActorId::ANY.is_valid());
        assert!(ActorId::from_raw(7).is_valid());
    }

    #[test]
    fn test_bus_and_timer_invalid_is_zero() {
        assert!(!BusId::INVALID.is_valid());
        assert!(!TimerId::INVALID.is_valid());
        assert!(BusId::from_raw(1).is_valid());
        assert!(TimerId::from_raw(0x0800_0001).is_valid());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ActorId::from_raw(3)), "actor(3)");
        assert_eq!(format!("{}", ActorId::ANY), "actor(*)");
        assert_eq!(format!("{}", BusId::from_raw(2)), "bus(2)");
    }
}
