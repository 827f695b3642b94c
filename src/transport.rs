//! The producer-side handle: buffer rotation, slot acquisition, and the
//! connect/close lifecycle.
//!
//! This is the Rust counterpart of the reference `SGL_(init_IPC)` /
//! `SGL_(acq_event_slot)` / `SGL_(acq_event_pool_slot)` / `SGL_(term_IPC)`
//! quartet, reshaped around ownership: `connect` and `close` consume and
//! produce a `Transport` by value so that calling an acquisition method
//! before connecting, or after closing, is not a state this crate can even
//! express, let alone has to check for at runtime.

use std::os::fd::AsFd;

use crate::config::Config;
use crate::error::TransportError;
use crate::handshake::{self, FINISHED};
use crate::metrics::Metrics;
use crate::region::BufferView;
use crate::rendezvous::Endpoints;
use crate::slot::{EventSlot, PoolSlot};

/// A connected producer.
///
/// Single-owner and `!Sync`: every acquisition method takes `&mut self`,
/// which is this crate's way of expressing the single-producer model — two
/// threads cannot both hold a `&mut Transport`, so the exclusivity the
/// reference implementation's global `curr_buf` relied on is enforced by
/// the borrow checker instead of by convention.
pub struct Transport {
    config: Config,
    endpoints: Endpoints,
    current_buffer: u32,
    is_full: Vec<bool>,
    metrics: Metrics,
}

impl Transport {
    /// Waits for a consumer to publish its endpoints under
    /// `config.ipc_dir` and attaches to them.
    pub fn connect(config: Config) -> Result<Self, TransportError> {
        config.validate()?;
        let endpoints = Endpoints::connect(&config)?;
        let num_buffers = config.num_buffers;
        Ok(Self { config, endpoints, current_buffer: 0, is_full: vec![false; num_buffers], metrics: Metrics::new() })
    }

    /// Current metrics snapshot.
    #[must_use]
    pub fn metrics(&self) -> Metrics {
        self.metrics.snapshot()
    }

    fn current_view(&mut self) -> BufferView<'_> {
        // SAFETY: `endpoints.region_ptr` was mapped to `config.region_size()`
        // bytes in `Endpoints::connect`, `current_buffer` is always kept
        // within `0..config.num_buffers`, and nothing else observes this
        // buffer while it is exclusively borrowed from `&mut self`.
        unsafe { BufferView::new(self.endpoints.region_ptr, &self.config, self.current_buffer) }
    }

    /// Reserves the next event-record slot in the current buffer, rotating
    /// to the next buffer first if the current one is full.
    pub fn acquire_event_slot(&mut self) -> Result<EventSlot<'_>, TransportError> {
        if self.current_view().events_free() == 0 {
            self.rotate_buffer()?;
        }
        self.metrics.record_event();
        let mut view = self.current_view();
        Ok(view.acquire_event_slot().expect("space was just ensured by rotation"))
    }

    /// Reserves `len` bytes from the current buffer's pool, rotating to the
    /// next buffer first if the current one does not have enough room.
    ///
    /// Returns [`TransportError::PoolRequestTooLarge`] if `len` exceeds the
    /// pool's total capacity, since no amount of rotation would ever make
    /// room for it.
    pub fn acquire_pool_slot(&mut self, len: usize) -> Result<PoolSlot<'_>, TransportError> {
        if len > self.config.pool_bytes {
            return Err(TransportError::PoolRequestTooLarge { requested: len, capacity: self.config.pool_bytes });
        }
        if self.current_view().pool_free() < len {
            self.rotate_buffer()?;
        }
        self.metrics.record_pool_allocation();
        let mut view = self.current_view();
        Ok(view.acquire_pool_slot(len).expect("space was just ensured by rotation"))
    }

    /// Reserves one event slot and `size` pool bytes from the same buffer,
    /// checking and rotating at most once for both together rather than
    /// risking the event landing in one buffer and its pool payload in
    /// another.
    ///
    /// Returns the pool allocation's offset within the buffer's pool (not
    /// the whole buffer) so a committed event can record where its
    /// associated bytes live, matching the reference
    /// `SGL_(acq_event_pool_slot)`.
    pub fn acquire_event_and_pool(&mut self, size: usize) -> Result<(EventSlot<'_>, PoolSlot<'_>, u32), TransportError> {
        if size > self.config.pool_bytes {
            return Err(TransportError::PoolRequestTooLarge { requested: size, capacity: self.config.pool_bytes });
        }
        let needs_rotation = {
            let view = self.current_view();
            view.events_free() == 0 || view.pool_free() < size
        };
        if needs_rotation {
            self.rotate_buffer()?;
        }

        let pool_offset = self.current_view().pool_used();
        self.metrics.record_event();
        self.metrics.record_pool_allocation();
        let mut view = self.current_view();
        let event = view.acquire_event_slot().expect("space was just ensured by rotation");
        let pool = view.acquire_pool_slot(size).expect("space was just ensured by rotation");
        Ok((event, pool, pool_offset))
    }

    /// Marks the current buffer full, advances to the next one (waiting on
    /// the empty-fifo handshake if the consumer has not released it yet),
    /// and resets its counters.
    fn rotate_buffer(&mut self) -> Result<(), TransportError> {
        self.flush_current()?;

        let next = (self.current_buffer + 1) % self.config.num_buffers as u32;
        crate::debug_assert_valid_buffer_index!(next, self.config.num_buffers);
        if self.is_full[next as usize] {
            self.metrics.record_rotation_wait();
            let released =
                handshake::read_message(self.endpoints.emptyfifo.as_fd(), &self.config.emptyfifo_path())?;
            if released != next {
                return Err(TransportError::Desync { expected: next, actual: released });
            }
            self.is_full[next as usize] = false;
        }

        self.current_buffer = next;
        self.current_view().reset();
        self.metrics.record_rotation();
        Ok(())
    }

    /// Marks the current buffer full and notifies the consumer over
    /// `fullfifo`, without yet advancing to another buffer.
    fn flush_current(&mut self) -> Result<(), TransportError> {
        self.is_full[self.current_buffer as usize] = true;
        handshake::write_message(self.endpoints.fullfifo.as_fd(), &self.config.fullfifo_path(), self.current_buffer)
    }

    /// Flushes whatever is left in the current buffer, tells the consumer
    /// there is nothing more coming, and waits for it to drain and close
    /// its end of `emptyfifo` before returning.
    ///
    /// Consumes `self`, so a closed transport cannot be used again; the
    /// underlying mapping and fifos are released when the returned
    /// [`Endpoints`] (held internally) is dropped.
    pub fn close(mut self) -> Result<(), TransportError> {
        self.flush_current()?;
        handshake::write_message(self.endpoints.fullfifo.as_fd(), &self.config.fullfifo_path(), FINISHED)?;
        drain_emptyfifo(&self.endpoints, &self.config)
    }
}

/// Reads from `emptyfifo` until the consumer closes its write end (`read`
/// returning `0`), matching the reference `SGL_(term_IPC)` shutdown drain.
fn drain_emptyfifo(endpoints: &Endpoints, config: &Config) -> Result<(), TransportError> {
    let path = config.emptyfifo_path();
    let mut buf = [0u8; 4];
    loop {
        let n = nix::unistd::read(endpoints.emptyfifo.as_fd(), &mut buf)
            .map_err(|errno| TransportError::HandshakeIo { path: path.clone(), source: std::io::Error::from(errno) })?;
        if n == 0 {
            break;
        }
    }
    Ok(())
}
