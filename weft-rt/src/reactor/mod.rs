//! Readiness reactor: the single process-wide epoll handle.
//!
//! Timers, network fds, and the wakeup eventfd all register here under a
//! typed [`Token`]; the scheduler drains readiness between actor runs and
//! dispatches each token to the owning subsystem. Nothing else in the
//! runtime ever polls.

// Layer 1: Standard library imports
use std::os::fd::{AsFd, BorrowedFd};
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::Arc;
use std::time::Duration;

// Layer 2: Third-party crate imports
use nix::sys::epoll::{Epoll, EpollCreateFlags, EpollEvent, EpollFlags, EpollTimeout};
use nix::sys::eventfd::{EfdFlags, EventFd};
use nix::unistd;
use tracing::trace;

// Layer 3: Internal module imports
use crate::error::{Error, Result};
use crate::util::{ActorId, TimerId};

/// Largest batch of events drained per poll.
const EVENT_BATCH: usize = 32;

/// Identifies the subsystem behind one readiness source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    /// A timerfd owned by the timer service.
    Timer(TimerId),
    /// An fd wait submitted on behalf of a blocked actor.
    Network(ActorId),
    /// The cross-thread wakeup eventfd.
    Wakeup,
}

impl Token {
    const KIND_TIMER: u64 = 1;
    const KIND_NETWORK: u64 = 2;
    const KIND_WAKEUP: u64 = 3;

    fn encode(self) -> u64 {
        match self {
            Self::Timer(id) => (Self::KIND_TIMER << 32) | id.raw() as u64,
            Self::Network(id) => (Self::KIND_NETWORK << 32) | id.raw() as u64,
            Self::Wakeup => Self::KIND_WAKEUP << 32,
        }
    }

    fn decode(data: u64) -> Option<Self> {
        let low = data as u32;
        match data >> 32 {
            Self::KIND_TIMER => Some(Self::Timer(TimerId::from_raw(low))),
            Self::KIND_NETWORK => Some(Self::Network(ActorId::from_raw(low))),
            Self::KIND_WAKEUP => Some(Self::Wakeup),
            _ => None,
        }
    }
}

/// Readiness interest for [`Reactor::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Interest {
    Readable,
    Writable,
}

impl Interest {
    fn flags(self) -> EpollFlags {
        match self {
            Self::Readable => EpollFlags::EPOLLIN,
            Self::Writable => EpollFlags::EPOLLOUT,
        }
    }
}

/// Thread-safe handle that interrupts a sleeping reactor poll.
///
/// The only runtime surface that may be touched from another thread: it
/// just writes the wakeup eventfd, and the scheduler notices on its next
/// poll.
#[derive(Clone)]
pub struct RemoteWaker {
    fd: Arc<std::os::fd::OwnedFd>,
}

impl RemoteWaker {
    /// Interrupt the reactor sleep. Saturation (EAGAIN) is fine: the wakeup
    /// is level-observed and already pending.
    pub fn wake(&self) {
        let _ = unistd::write(self.fd.as_fd(), &1u64.to_ne_bytes());
    }
}

/// The epoll wrapper owned by the scheduler.
pub(crate) struct Reactor {
    epoll: Epoll,
    wakeup: EventFd,
}

impl Reactor {
    pub fn new() -> Result<Self> {
        let epoll = Epoll::new(EpollCreateFlags::EPOLL_CLOEXEC)
            .map_err(|_| Error::io("epoll_create failed"))?;
        let wakeup = EventFd::from_value_and_flags(
            0,
            EfdFlags::EFD_CLOEXEC | EfdFlags::EFD_NONBLOCK,
        )
        .map_err(|_| Error::io("eventfd creation failed"))?;
        epoll
            .add(
                wakeup.as_fd(),
                EpollEvent::new(EpollFlags::EPOLLIN, Token::Wakeup.encode()),
            )
            .map_err(|_| Error::io("wakeup registration failed"))?;
        Ok(Self { epoll, wakeup })
    }

    /// Register a readiness source under `token`.
    pub fn register(&self, fd: BorrowedFd<'_>, interest: Interest, token: Token) -> Result<()> {
        self.epoll
            .add(fd, EpollEvent::new(interest.flags(), token.encode()))
            .map_err(|_| Error::io("epoll add failed"))
    }

    /// Drop a previously registered source.
    pub fn deregister(&self, fd: BorrowedFd<'_>) -> Result<()> {
        self.epoll
            .delete(fd)
            .map_err(|_| Error::io("epoll delete failed"))
    }

    /// Raw-fd variant for callers that only kept the descriptor number.
    pub fn deregister_raw(&self, fd: RawFd) -> Result<()> {
        // SAFETY: the fd stays open for the duration of the call; the caller
        // registered it and has not closed it yet.
        let borrowed = unsafe { BorrowedFd::borrow_raw(fd) };
        self.deregister(borrowed)
    }

    /// Wait up to `timeout` (`None` = indefinitely) and collect ready
    /// tokens. Wakeup readiness is drained in place but still reported, so
    /// the scheduler can tell why it woke.
    pub fn poll(&self, timeout: Option<Duration>, out: &mut Vec<Token>) -> Result<()> {
        let timeout = match timeout {
            None => EpollTimeout::NONE,
            Some(d) => {
                let ms = d.as_millis().min(u16::MAX as u128) as u16;
                EpollTimeout::from(ms)
            }
        };
        let mut events = [EpollEvent::empty(); EVENT_BATCH];
        let n = match self.epoll.wait(&mut events, timeout) {
            Ok(n) => n,
            Err(nix::errno::Errno::EINTR) => 0,
            Err(_) => return Err(Error::io("epoll_wait failed")),
        };
        for event in events.iter().take(n) {
            match Token::decode(event.data()) {
                Some(Token::Wakeup) => {
                    self.drain_wakeup();
                    out.push(Token::Wakeup);
                }
                Some(token) => {
                    trace!(?token, "reactor readiness");
                    out.push(token);
                }
                None => {}
            }
        }
        Ok(())
    }

    /// A `Send + Clone` wakeup handle for embedders.
    pub fn waker(&self) -> Result<RemoteWaker> {
        let dup = unistd::dup(self.wakeup.as_fd()).map_err(|_| Error::io("dup failed"))?;
        Ok(RemoteWaker { fd: Arc::new(dup) })
    }

    fn drain_wakeup(&self) {
        let mut buf = [0u8; 8];
        // Nonblocking read; EAGAIN just means another drain got there first.
        let _ = unistd::read(self.wakeup.as_fd(), &mut buf);
    }
}

impl std::fmt::Debug for Reactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reactor")
            .field("wakeup_fd", &self.wakeup.as_fd().as_raw_fd())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        for token in [
            Token::Timer(TimerId::from_raw(0x0800_0001)),
            Token::Network(ActorId::from_raw(42)),
            Token::Wakeup,
        ] {
            assert_eq!(Token::decode(token.encode()), Some(token));
        }
        assert_eq!(Token::decode(u64::MAX), None);
    }

    #[test]
    fn test_poll_times_out_empty() {
        let reactor = Reactor::new().unwrap();
        let mut out = Vec::new();
        reactor
            .poll(Some(Duration::from_millis(1)), &mut out)
            .unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_waker_wakes_poll() {
        let reactor = Reactor::new().unwrap();
        let waker = reactor.waker().unwrap();
        waker.wake();
        let mut out = Vec::new();
        reactor
            .poll(Some(Duration::from_millis(100)), &mut out)
            .unwrap();
        assert_eq!(out, vec![Token::Wakeup]);
        // Drained: the next zero-timeout poll sees nothing.
        out.clear();
        reactor.poll(Some(Duration::ZERO), &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn test_waker_is_send() {
        fn assert_send<T: Send>(_: &T) {}
        let reactor = Reactor::new().unwrap();
        let waker = reactor.waker().unwrap();
        assert_send(&waker);
        let handle = std::thread::spawn(move || waker.wake());
        handle.join().unwrap();
    }
}
