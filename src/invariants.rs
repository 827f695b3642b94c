//! Debug-only invariant checks.
//!
//! Each macro documents one invariant the hot path relies on and is compiled
//! out entirely in release builds. These are internal consistency checks on
//! data this
//! crate itself produced — they are not a substitute for the `Result`-typed
//! errors in [`crate::error`], which cover conditions callers can trigger.

/// INV-BUF-01: a buffer's recorded event count never exceeds the
/// configured maximum.
#[macro_export]
macro_rules! debug_assert_events_in_bounds {
    ($used:expr, $max:expr) => {
        debug_assert!(
            $used <= $max,
            "INV-BUF-01 violated: events_used ({}) exceeds max_events ({})",
            $used,
            $max
        );
    };
}

/// INV-BUF-02: a buffer's recorded pool occupancy never exceeds the
/// configured pool size.
#[macro_export]
macro_rules! debug_assert_pool_in_bounds {
    ($used:expr, $capacity:expr) => {
        debug_assert!(
            $used <= $capacity,
            "INV-BUF-02 violated: pool_used ({}) exceeds pool_bytes ({})",
            $used,
            $capacity
        );
    };
}

/// INV-IDX-01: a buffer index produced by this crate is always within
/// `0..num_buffers`.
#[macro_export]
macro_rules! debug_assert_valid_buffer_index {
    ($idx:expr, $num_buffers:expr) => {
        debug_assert!(
            ($idx as usize) < $num_buffers,
            "INV-IDX-01 violated: buffer index {} out of range 0..{}",
            $idx,
            $num_buffers
        );
    };
}
