//! Lightweight counters for observing transport behavior.
//!
//! A [`Transport`](crate::Transport) is single-owner, not shared across
//! producer threads, so these counters are plain fields updated through
//! `&mut self` and read back with [`Metrics::snapshot`] rather than
//! `Arc`-wrapped atomics.

/// Point-in-time counters for a transport instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Metrics {
    /// Event slots successfully acquired.
    pub events_emitted: u64,
    /// Pool slots successfully acquired.
    pub pool_allocations: u64,
    /// Number of times the producer rotated to the next buffer.
    pub buffer_rotations: u64,
    /// Number of times rotation had to wait on the empty-fifo handshake
    /// because the next buffer was still marked full.
    pub rotation_waits: u64,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_event(&mut self) {
        self.events_emitted += 1;
    }

    pub(crate) fn record_pool_allocation(&mut self) {
        self.pool_allocations += 1;
    }

    pub(crate) fn record_rotation(&mut self) {
        self.buffer_rotations += 1;
    }

    pub(crate) fn record_rotation_wait(&mut self) {
        self.rotation_waits += 1;
    }

    /// Returns a copy of the current counters.
    #[must_use]
    pub fn snapshot(&self) -> Self {
        *self
    }
}
