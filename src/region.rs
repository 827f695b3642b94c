//! Layout and access into the mapped shared region.
//!
//! The design notes call for never caching a raw pointer cursor across
//! calls: every access recomputes the byte offset for the buffer and field
//! in question from [`Config`] and the mapping's base pointer. `BufferView`
//! is that recomputation, done once per call to
//! [`crate::Transport::acquire_event_slot`]/`acquire_pool_slot` rather than
//! once per producer-lifetime the way the reference implementation's
//! `curr_buf`/`curr_used` pointers worked.

use std::marker::PhantomData;
use std::slice;

use crate::config::Config;
use crate::layout::EventRecord;
use crate::slot::{EventSlot, PoolSlot};

/// Byte layout of a single buffer within the mapped region.
///
/// Every buffer starts with two `u32` counters (`events_used`, `pool_used`)
/// followed by a fixed-size array of [`EventRecord`] and a variable-length
/// byte pool, matching the reference `BufferedSglEv` array + trailing pool
/// layout.
#[derive(Debug, Clone, Copy)]
struct BufferLayout {
    events_used_offset: usize,
    pool_used_offset: usize,
    events_offset: usize,
    pool_offset: usize,
    max_events: usize,
    pool_bytes: usize,
}

impl BufferLayout {
    fn new(config: &Config) -> Self {
        Self {
            events_used_offset: 0,
            pool_used_offset: 4,
            events_offset: 8,
            pool_offset: 8 + config.max_events * crate::layout::EVENT_RECORD_SIZE,
            max_events: config.max_events,
            pool_bytes: config.pool_bytes,
        }
    }
}

/// A live view into one buffer of the mapped region, borrowed for `'a` —
/// in practice the lifetime of the `&'a mut Transport` call that created
/// it, so that guards handed out through it ([`EventSlot`], [`PoolSlot`])
/// can outlive this short-lived view itself while still being bounded by
/// the transport's exclusive borrow.
///
/// Holds no pointer arithmetic state across calls beyond what it computes
/// in [`BufferView::new`]; every accessor derives its address from `base`
/// and the precomputed [`BufferLayout`] offsets on every call.
pub struct BufferView<'a> {
    base: *mut u8,
    layout: BufferLayout,
    _marker: PhantomData<&'a mut u8>,
}

impl<'a> BufferView<'a> {
    /// # Safety
    ///
    /// `region_base` must point to a mapping at least `config.region_size()`
    /// bytes long, and the caller must not allow any other access to buffer
    /// `buffer_index` of that mapping for as long as `'a` lasts.
    pub(crate) unsafe fn new(region_base: *mut u8, config: &Config, buffer_index: u32) -> BufferView<'a> {
        let stride = config.buffer_stride();
        let base = region_base.add(stride * buffer_index as usize);
        BufferView { base, layout: BufferLayout::new(config), _marker: PhantomData }
    }

    fn events_used_ptr(&self) -> *mut u32 {
        unsafe { self.base.add(self.layout.events_used_offset).cast::<u32>() }
    }

    fn pool_used_ptr(&self) -> *mut u32 {
        unsafe { self.base.add(self.layout.pool_used_offset).cast::<u32>() }
    }

    /// Number of event records currently occupied in this buffer.
    #[must_use]
    pub fn events_used(&self) -> u32 {
        unsafe { self.events_used_ptr().read() }
    }

    /// Number of pool bytes currently occupied in this buffer.
    #[must_use]
    pub fn pool_used(&self) -> u32 {
        unsafe { self.pool_used_ptr().read() }
    }

    fn set_events_used(&mut self, value: u32) {
        unsafe { self.events_used_ptr().write(value) }
    }

    fn set_pool_used(&mut self, value: u32) {
        unsafe { self.pool_used_ptr().write(value) }
    }

    /// Remaining free event slots in this buffer.
    #[must_use]
    pub fn events_free(&self) -> usize {
        self.layout.max_events - self.events_used() as usize
    }

    /// Remaining free pool bytes in this buffer.
    #[must_use]
    pub fn pool_free(&self) -> usize {
        self.layout.pool_bytes - self.pool_used() as usize
    }

    /// Capacity of this buffer's byte pool.
    #[must_use]
    pub fn pool_capacity(&self) -> usize {
        self.layout.pool_bytes
    }

    /// Reserves the next free event slot, returning a guard that advances
    /// `events_used` only once the caller commits a record into it.
    ///
    /// Returns `None` if the buffer's event array is already full.
    pub(crate) fn acquire_event_slot(&mut self) -> Option<EventSlot<'a>> {
        let used = self.events_used() as usize;
        if used >= self.layout.max_events {
            return None;
        }
        let slot_ptr = unsafe { self.base.add(self.layout.events_offset).cast::<EventRecord>().add(used) };
        // SAFETY: `slot_ptr` and `events_used_ptr()` address disjoint
        // regions of the same mapping (the event array and the leading
        // counter pair respectively); both are valid and exclusively ours
        // for `'a` per this view's construction contract.
        let slot = unsafe { &mut *slot_ptr };
        let events_used = unsafe { &mut *self.events_used_ptr() };
        crate::debug_assert_events_in_bounds!(used, self.layout.max_events);
        Some(EventSlot::new(slot, events_used))
    }

    /// Reserves `len` free pool bytes, returning a guard that advances
    /// `pool_used` only once the caller commits the reservation.
    ///
    /// Returns `None` if fewer than `len` bytes remain free.
    pub(crate) fn acquire_pool_slot(&mut self, len: usize) -> Option<PoolSlot<'a>> {
        let used = self.pool_used() as usize;
        if len > self.layout.pool_bytes - used {
            return None;
        }
        let bytes_ptr = unsafe { self.base.add(self.layout.pool_offset).add(used) };
        // SAFETY: see `acquire_event_slot` — disjoint regions of the same
        // mapping.
        let bytes = unsafe { slice::from_raw_parts_mut(bytes_ptr, len) };
        let pool_used = unsafe { &mut *self.pool_used_ptr() };
        crate::debug_assert_pool_in_bounds!(used + len, self.layout.pool_bytes);
        Some(PoolSlot::new(bytes, pool_used, len as u32))
    }

    /// Resets both counters to zero. Called after the consumer has
    /// released this buffer, before the producer writes into it again.
    pub(crate) fn reset(&mut self) {
        self.set_events_used(0);
        self.set_pool_used(0);
    }
}
