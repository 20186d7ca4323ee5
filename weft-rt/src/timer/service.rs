// Layer 1: Standard library imports
use std::os::fd::AsFd;
use std::time::Duration;

// Layer 2: Third-party crate imports
use nix::sys::time::TimeSpec;
use nix::sys::timerfd::{ClockId, Expiration, TimerFd, TimerFlags, TimerSetTimeFlags};
use nix::unistd;
use tracing::{debug, trace};

// Layer 3: Internal module imports
use crate::alloc::{Pool, PoolIdx};
use crate::error::{Error, Result};
use crate::message::Tag;
use crate::reactor::{Interest, Reactor, Token};
use crate::util::{ActorId, TimerId};

/// One firing to be delivered as a TIMER message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TimerFire {
    pub id: TimerId,
    pub owner: ActorId,
}

/// Which clock drives the service.
#[derive(Debug)]
enum Backend {
    Wall,
    Sim { now_us: u64 },
}

struct TimerRec {
    id: TimerId,
    owner: ActorId,
    periodic: bool,
    interval_us: u64,
    /// Simulated-mode deadline; unused while a timerfd is attached.
    deadline_us: u64,
    tfd: Option<TimerFd>,
}

/// Timer table plus the active backend.
pub(crate) struct TimerService {
    pool: Pool<TimerRec>,
    backend: Backend,
    next_seq: u32,
}

impl TimerService {
    pub fn new(max_timers: usize) -> Self {
        Self {
            pool: Pool::new(max_timers, "timer pool exhausted"),
            backend: Backend::Wall,
            next_seq: 0,
        }
    }

    /// Timer ids live in the runtime tag space (bit 27 set) because the id
    /// doubles as the message tag. The 27-bit sequence wraps but never
    /// collides within the bounded pool.
    fn issue_id(&mut self) -> TimerId {
        loop {
            self.next_seq = (self.next_seq + 1) & (Tag::RUNTIME_BIT - 1);
            if self.next_seq == 0 {
                continue;
            }
            let id = TimerId::from_raw(Tag::RUNTIME_BIT | self.next_seq);
            if self.pool.iter().all(|(_, r)| r.id != id) {
                return id;
            }
        }
    }

    pub fn is_sim(&self) -> bool {
        matches!(self.backend, Backend::Sim { .. })
    }

    /// Simulated microseconds since the switch to simulation.
    pub fn sim_now_us(&self) -> Option<u64> {
        match self.backend {
            Backend::Wall => None,
            Backend::Sim { now_us } => Some(now_us),
        }
    }

    pub fn allocated(&self) -> usize {
        self.pool.allocated()
    }

    pub fn owner_of(&self, id: TimerId) -> Option<ActorId> {
        self.pool
            .iter()
            .find(|(_, r)| r.id == id)
            .map(|(_, r)| r.owner)
    }

    /// Arm a new timer. Zero durations are clamped to one tick so the timer
    /// fires on the earliest subsequent poll or advance.
    pub fn create(
        &mut self,
        reactor: &Reactor,
        owner: ActorId,
        delta_us: u64,
        periodic: bool,
    ) -> Result<TimerId> {
        let id = self.issue_id();
        let interval_us = delta_us.max(1);
        let rec = match &self.backend {
            Backend::Wall => {
                let tfd = TimerFd::new(
                    ClockId::CLOCK_MONOTONIC,
                    TimerFlags::TFD_NONBLOCK | TimerFlags::TFD_CLOEXEC,
                )
                .map_err(|_| Error::io("timerfd creation failed"))?;
                let spec = TimeSpec::from_duration(Duration::from_micros(interval_us));
                let expiration = if periodic {
                    Expiration::Interval(spec)
                } else {
                    Expiration::OneShot(spec)
                };
                tfd.set(expiration, TimerSetTimeFlags::empty())
                    .map_err(|_| Error::io("timerfd arm failed"))?;
                reactor.register(tfd.as_fd(), Interest::Readable, Token::Timer(id))?;
                TimerRec {
                    id,
                    owner,
                    periodic,
                    interval_us,
                    deadline_us: 0,
                    tfd: Some(tfd),
                }
            }
            Backend::Sim { now_us } => TimerRec {
                id,
                owner,
                periodic,
                interval_us,
                deadline_us: now_us + interval_us,
                tfd: None,
            },
        };
        // On pool exhaustion the record is dropped here, which closes the
        // timerfd and with it the epoll registration.
        self.pool.alloc(rec)?;
        trace!(%id, %owner, periodic, interval_us, "timer armed");
        Ok(id)
    }

    /// Disarm and free a timer.
    pub fn cancel(&mut self, reactor: &Reactor, id: TimerId) -> Result<()> {
        let idx = self
            .find(id)
            .ok_or(Error::invalid("unknown timer id"))?;
        self.release(reactor, idx);
        trace!(%id, "timer cancelled");
        Ok(())
    }

    /// Handle timerfd readiness reported by the reactor. Returns the fire
    /// to deliver, or `None` for a stale token.
    pub fn on_timerfd_ready(&mut self, reactor: &Reactor, id: TimerId) -> Option<TimerFire> {
        let idx = self.find(id)?;
        let (owner, periodic) = {
            let rec = self.pool.get(idx)?;
            let tfd = rec.tfd.as_ref()?;
            // Clear the level so epoll stops reporting this fd.
            let mut buf = [0u8; 8];
            let _ = unistd::read(tfd.as_fd(), &mut buf);
            (rec.owner, rec.periodic)
        };
        if !periodic {
            self.release(reactor, idx);
        }
        Some(TimerFire { id, owner })
    }

    /// Advance simulated time, switching backends on first use. Returns
    /// fires in strictly increasing deadline order (ties: table order).
    pub fn advance(&mut self, reactor: &Reactor, delta_us: u64) -> Vec<TimerFire> {
        if !self.is_sim() {
            self.enter_simulation(reactor);
        }
        let now_us = match &mut self.backend {
            Backend::Sim { now_us } => {
                *now_us += delta_us;
                *now_us
            }
            // enter_simulation above guarantees the Sim arm.
            Backend::Wall => return Vec::new(),
        };
        let mut fires = Vec::new();
        loop {
            let due = self
                .pool
                .iter()
                .filter(|(_, r)| r.deadline_us <= now_us)
                .fold(None::<(PoolIdx, u64)>, |best, (idx, r)| match best {
                    Some((_, d)) if d <= r.deadline_us => best,
                    _ => Some((idx, r.deadline_us)),
                });
            let Some((idx, _)) = due else { break };
            let (fire, periodic) = match self.pool.get_mut(idx) {
                Some(rec) => {
                    let fire = TimerFire {
                        id: rec.id,
                        owner: rec.owner,
                    };
                    if rec.periodic {
                        rec.deadline_us += rec.interval_us;
                    }
                    (fire, rec.periodic)
                }
                None => break,
            };
            if !periodic {
                self.pool.free(idx);
            }
            fires.push(fire);
        }
        if !fires.is_empty() {
            debug!(count = fires.len(), now_us, "simulated timers fired");
        }
        fires
    }

    /// Drop every timer owned by a dying actor.
    pub fn cancel_owned_by(&mut self, reactor: &Reactor, owner: ActorId) {
        let doomed: Vec<PoolIdx> = self
            .pool
            .iter()
            .filter(|(_, r)| r.owner == owner)
            .map(|(idx, _)| idx)
            .collect();
        for idx in doomed {
            self.release(reactor, idx);
        }
    }

    fn find(&self, id: TimerId) -> Option<PoolIdx> {
        self.pool.iter().find(|(_, r)| r.id == id).map(|(i, _)| i)
    }

    fn release(&mut self, reactor: &Reactor, idx: PoolIdx) {
        if let Some(rec) = self.pool.free(idx) {
            if let Some(tfd) = rec.tfd {
                let _ = reactor.deregister(tfd.as_fd());
                // Dropping the TimerFd closes and disarms it.
            }
        }
    }

    /// Detach every armed timerfd and convert its remaining time into a
    /// simulated deadline at tick zero.
    fn enter_simulation(&mut self, reactor: &Reactor) {
        debug!("timer service entering simulated time");
        let ids: Vec<PoolIdx> = self.pool.iter().map(|(i, _)| i).collect();
        for idx in ids {
            let Some(rec) = self.pool.get_mut(idx) else { continue };
            let remaining_us = match rec.tfd.take() {
                Some(tfd) => {
                    let _ = reactor.deregister(tfd.as_fd());
                    match tfd.get() {
                        Ok(Some(Expiration::OneShot(ts))) => timespec_us(ts),
                        Ok(Some(Expiration::IntervalDelayed(ts, _))) => timespec_us(ts),
                        Ok(Some(Expiration::Interval(ts))) => timespec_us(ts),
                        _ => rec.interval_us,
                    }
                }
                None => rec.interval_us,
            };
            rec.deadline_us = remaining_us.max(1);
        }
        self.backend = Backend::Sim { now_us: 0 };
    }
}

fn timespec_us(ts: TimeSpec) -> u64 {
    (ts.tv_sec() as u64)
        .saturating_mul(1_000_000)
        .saturating_add(ts.tv_nsec() as u64 / 1_000)
}
