//! Blocking-operation deadlines.

// Layer 1: Standard library imports
use std::time::Duration;

// Layer 2: Third-party crate imports
// (none)

// Layer 3: Internal module imports
// (none)

/// How long a blocking operation may wait.
///
/// Mirrors the classic `timeout_ms` convention: `0` = poll, `> 0` =
/// deadline, `< 0` = wait indefinitely.
///
/// # Examples
/// ```rust
/// use std::time::Duration;
/// use weft_rt::Timeout;
///
/// assert_eq!(Timeout::ms(0), Timeout::Poll);
/// assert_eq!(Timeout::ms(-1), Timeout::Never);
/// assert_eq!(Timeout::ms(50), Timeout::In(Duration::from_millis(50)));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Never block; a wait becomes `WouldBlock`.
    Poll,
    /// Block up to this long, then `Timeout`.
    In(Duration),
    /// Block until the wait is satisfied.
    Never,
}

impl Timeout {
    /// Interpret a signed millisecond count.
    pub fn ms(ms: i64) -> Self {
        match ms {
            0 => Self::Poll,
            m if m < 0 => Self::Never,
            m => Self::In(Duration::from_millis(m as u64)),
        }
    }

    /// Deadline in microseconds, if one exists.
    pub(crate) fn deadline_us(&self) -> Option<u64> {
        match self {
            Self::In(d) => Some(d.as_micros() as u64),
            _ => None,
        }
    }
}

impl From<Duration> for Timeout {
    fn from(d: Duration) -> Self {
        Self::In(d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ms_convention() {
        assert_eq!(Timeout::ms(0), Timeout::Poll);
        assert_eq!(Timeout::ms(-7), Timeout::Never);
        assert_eq!(Timeout::ms(10), Timeout::In(Duration::from_millis(10)));
    }

    #[test]
    fn test_deadline_us() {
        assert_eq!(Timeout::Poll.deadline_us(), None);
        assert_eq!(Timeout::Never.deadline_us(), None);
        assert_eq!(
            Timeout::In(Duration::from_millis(2)).deadline_us(),
            Some(2_000)
        );
    }
}
