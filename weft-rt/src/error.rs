//! Crate-wide status type: a closed error taxonomy with static reasons.
//!
//! Every fallible runtime operation returns [`Result`] with an [`Error`]
//! carrying one of the seven [`ErrorCode`]s plus a `&'static str` reason.
//! Reasons are always string literals; nothing on the error path allocates.

// Layer 1: Standard library imports
use std::fmt;

// Layer 2: Third-party crate imports
use serde::Serialize;

// Layer 3: Internal module imports
// (none)

/// Closed set of failure codes produced by the runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorCode {
    /// A fixed pool or the stack arena is exhausted.
    Nomem,
    /// Bad arguments, wrong state, not subscribed, or self-target.
    Invalid,
    /// A deadline was reached before the operation completed.
    Timeout,
    /// The peer died during a synchronous operation.
    Closed,
    /// A non-blocking operation would have had to wait.
    WouldBlock,
    /// Reactor or OS-level failure.
    Io,
    /// Registry duplicate.
    Exists,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Nomem => "NOMEM",
            Self::Invalid => "INVALID",
            Self::Timeout => "TIMEOUT",
            Self::Closed => "CLOSED",
            Self::WouldBlock => "WOULDBLOCK",
            Self::Io => "IO",
            Self::Exists => "EXISTS",
        };
        f.write_str(s)
    }
}

/// Status pair `{code, reason}` returned by every fallible operation.
///
/// # Examples
///
/// ```rust
/// use weft_rt::{Error, ErrorCode};
///
/// let err = Error::nomem("mailbox entry pool exhausted");
/// assert_eq!(err.code(), ErrorCode::Nomem);
/// assert_eq!(err.reason(), "mailbox entry pool exhausted");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {reason}")]
pub struct Error {
    code: ErrorCode,
    reason: &'static str,
}

impl Error {
    /// Build an error with an explicit code.
    pub const fn new(code: ErrorCode, reason: &'static str) -> Self {
        Self { code, reason }
    }

    pub const fn nomem(reason: &'static str) -> Self {
        Self::new(ErrorCode::Nomem, reason)
    }

    pub const fn invalid(reason: &'static str) -> Self {
        Self::new(ErrorCode::Invalid, reason)
    }

    pub const fn timeout(reason: &'static str) -> Self {
        Self::new(ErrorCode::Timeout, reason)
    }

    pub const fn closed(reason: &'static str) -> Self {
        Self::new(ErrorCode::Closed, reason)
    }

    pub const fn would_block(reason: &'static str) -> Self {
        Self::new(ErrorCode::WouldBlock, reason)
    }

    pub const fn io(reason: &'static str) -> Self {
        Self::new(ErrorCode::Io, reason)
    }

    pub const fn exists(reason: &'static str) -> Self {
        Self::new(ErrorCode::Exists, reason)
    }

    /// The failure code.
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// The static reason literal.
    pub const fn reason(&self) -> &'static str {
        self.reason
    }

    /// Convenience predicate for the non-blocking path.
    pub const fn is_would_block(&self) -> bool {
        matches!(self.code, ErrorCode::WouldBlock)
    }
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::timeout("receive deadline reached");
        assert_eq!(format!("{err}"), "TIMEOUT: receive deadline reached");
    }

    #[test]
    fn test_error_accessors() {
        let err = Error::invalid("bad bus id");
        assert_eq!(err.code(), ErrorCode::Invalid);
        assert_eq!(err.reason(), "bad bus id");
        assert!(!err.is_would_block());
        assert!(Error::would_block("empty").is_would_block());
    }

    #[test]
    fn test_codes_are_distinct() {
        let codes = [
            ErrorCode::Nomem,
            ErrorCode::Invalid,
            ErrorCode::Timeout,
            ErrorCode::Closed,
            ErrorCode::WouldBlock,
            ErrorCode::Io,
            ErrorCode::Exists,
        ];
        for (i, a) in codes.iter().enumerate() {
            for (j, b) in codes.iter().enumerate() {
                assert_eq!(i == j, a == b);
            }
        }
    }
}
