//! The scheduling primitive every control loop suspends on.
//!
//! Loops in this crate are cooperative: each iteration does its work and then
//! awaits [`Clock::sleep`] for a fixed period. That call is the only suspension
//! point, which keeps the timing of every loop explicit and lets the same code
//! run on the V5 brain ([`VexClock`](crate::hardware::VexClock)) or against the
//! simulated plant ([`SimClock`](crate::sim::SimClock)).

use std::{future::Future, time::Duration};

/// A monotonic time source with a cooperative sleep.
pub trait Clock {
    /// Time elapsed since the clock was created.
    fn now(&self) -> Duration;

    /// Suspends the calling task for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()>;
}

impl<C: Clock> Clock for &C {
    fn now(&self) -> Duration { (**self).now() }

    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> { (**self).sleep(duration) }
}
