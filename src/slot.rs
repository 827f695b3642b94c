//! Safe RAII guards over a reserved region of the current buffer.
//!
//! The reference C implementation hands callers a raw pointer into shared
//! memory that they write through and release by hand, with no compiler
//! help if a caller forgets. This is the memory-safe replacement the
//! design notes call for: each guard borrows the buffer exclusively for
//! its lifetime and exposes only the write it was granted, shaped like a
//! reservation guard scoped to a single record (events) or a single byte
//! range (pool) rather than a batch. Committing consumes the guard by
//! value, so double-committing the same
//! reservation is a compile error rather than a runtime check.

use crate::layout::EventRecord;

/// A single reserved event-record slot in the current buffer.
///
/// Dropping this without calling [`EventSlot::commit`] leaves the
/// reservation uncommitted: the slot's bytes may have been written by the
/// caller, but `events_used` is only advanced on commit, so an
/// uncommitted write is simply never observed by the consumer.
pub struct EventSlot<'a> {
    slot: &'a mut EventRecord,
    events_used: &'a mut u32,
}

impl<'a> EventSlot<'a> {
    pub(crate) fn new(slot: &'a mut EventRecord, events_used: &'a mut u32) -> Self {
        Self { slot, events_used }
    }

    /// Writes `record` into the reserved slot and advances `events_used`,
    /// making it visible to the consumer.
    pub fn commit(self, record: EventRecord) {
        *self.slot = record;
        *self.events_used += 1;
    }
}

/// A reserved, variable-length byte range in the current buffer's pool.
///
/// Grounded the same way as [`EventSlot`]: the caller fills in
/// [`PoolSlot::as_mut_slice`] and then calls [`PoolSlot::commit`] to make
/// the allocation visible to the consumer. A `PoolSlot` that is simply
/// dropped leaves `pool_used` unchanged, so the bytes are reusable on the
/// very next allocation from the same buffer.
pub struct PoolSlot<'a> {
    bytes: &'a mut [u8],
    pool_used: &'a mut u32,
    len: u32,
}

impl<'a> PoolSlot<'a> {
    pub(crate) fn new(bytes: &'a mut [u8], pool_used: &'a mut u32, len: u32) -> Self {
        Self { bytes, pool_used, len }
    }

    /// The reserved byte range, writable in place.
    #[must_use]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        self.bytes
    }

    /// Number of bytes reserved.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Advances the pool's used-byte counter by this reservation's length,
    /// making the bytes currently in the slot visible to the consumer.
    pub fn commit(self) {
        *self.pool_used += self.len;
    }
}
