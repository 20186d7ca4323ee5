//! Timer service with two interchangeable backends.
//!
//! Wall-clock mode gives every timer its own nonblocking monotonic timerfd
//! registered with the reactor; firing is observed as reactor readiness.
//! The first call to `advance_time` switches the whole service into
//! simulation: armed timerfds are detached and their remaining time becomes
//! a software deadline against a microsecond counter that only the caller
//! advances.
//!
//! In both modes a firing delivers a TIMER-class message whose tag equals
//! the timer id, sent from the owner to itself; the scheduler does the
//! actual message posting from the fire records this module returns.

pub(crate) mod service;

pub(crate) use service::{TimerFire, TimerService};
