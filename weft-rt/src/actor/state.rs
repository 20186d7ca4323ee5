// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
// (none)

/// Lifecycle state of one actor table slot.
///
/// Transitions: spawn sets `Ready`; dispatch sets `Running`; a running
/// actor leaves as `Ready` (voluntary yield), `Waiting` (blocking wait), or
/// `Dead` (exit, kill, crash). At most one actor is `Running` at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ActorState {
    /// Slot is free or the actor has terminated.
    Dead,
    /// Eligible for dispatch.
    Ready,
    /// Currently executing on its own stack.
    Running,
    /// Blocked on a receive/select/bus read/fd wait.
    Waiting,
}

impl fmt::Display for ActorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Dead => "dead",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Waiting => "waiting",
        };
        f.write_str(s)
    }
}

/// Why an actor died; carried in EXIT notifications to links and monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[repr(u32)]
pub enum ExitReason {
    /// Voluntary `exit()`.
    Normal = 0,
    /// Entry function returned (or panicked) without exiting.
    Crash = 1,
    /// Stack guard word violated.
    CrashStack = 2,
    /// Terminated by another actor's `kill`.
    Killed = 3,
}

impl ExitReason {
    pub const fn bits(&self) -> u32 {
        *self as u32
    }

    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Normal),
            1 => Some(Self::Crash),
            2 => Some(Self::CrashStack),
            3 => Some(Self::Killed),
            _ => None,
        }
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Normal => "normal",
            Self::Crash => "crash",
            Self::CrashStack => "crash-stack",
            Self::Killed => "killed",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_reason_round_trip() {
        for reason in [
            ExitReason::Normal,
            ExitReason::Crash,
            ExitReason::CrashStack,
            ExitReason::Killed,
        ] {
            assert_eq!(ExitReason::from_bits(reason.bits()), Some(reason));
        }
        assert_eq!(ExitReason::from_bits(99), None);
    }
}
