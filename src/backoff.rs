//! Bounded polling helper for the rendezvous wait.
//!
//! A classic spin-and-yield backoff is the right tool while waiting on a
//! lock that is expected to be held briefly. The wait this crate has to
//! perform — for a consumer process to create `shmem` — is I/O-bound and
//! can legitimately take anywhere from microseconds to seconds, so spinning
//! would burn a core for no benefit. This is the same "poll until a
//! condition holds or a deadline passes" shape, adapted to sleep between
//! checks instead.

use std::time::{Duration, Instant};

/// Sleeps between checks of an externally-polled condition, failing once a
/// deadline has elapsed.
pub struct Poll {
    interval: Duration,
    deadline: Instant,
}

impl Poll {
    /// Starts a new bounded poll that will fail once `timeout` has elapsed
    /// from now, sleeping `interval` between checks of the caller's
    /// condition.
    #[must_use]
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, deadline: Instant::now() + timeout }
    }

    /// `true` once the deadline has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Sleeps for one interval. Callers loop: check the condition, return
    /// if satisfied, call `is_expired` and bail out with a timeout error if
    /// it's `true`, otherwise call `wait` and check again.
    pub fn wait(&self) {
        std::thread::sleep(self.interval);
    }
}
