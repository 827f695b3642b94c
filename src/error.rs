//! Error types returned by the transport.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Everything that can go wrong while setting up or driving the transport.
///
/// Roughly follows the four error classes the wire protocol distinguishes:
/// configuration mistakes caught before any I/O, failure to rendezvous with
/// a consumer, malformed I/O on the handshake fifos, and protocol
/// desynchronization detected by a sanity check on the handshake payload.
/// `is_recoverable` mirrors the style of the streaming adapter's
/// `StreamError` (`is_recoverable`/`is_terminal`) so callers can decide
/// whether a retry makes sense without matching on every variant.
#[derive(Debug, Error)]
pub enum TransportError {
    /// A configuration value failed validation before any filesystem or IPC
    /// call was attempted.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The consumer's shared-memory file never appeared within the
    /// configured timeout, or a filesystem call needed to locate it failed.
    #[error("rendezvous with consumer failed: {0}")]
    Rendezvous(String),

    /// An I/O operation on one of the handshake fifos failed or returned
    /// fewer bytes than the fixed-width protocol requires.
    #[error("handshake I/O error on {path}: {source}")]
    HandshakeIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A `read`/`write` on a fifo returned a byte count inconsistent with
    /// the fixed-size payload being transferred (a short read/write that
    /// is not an `io::Error`, e.g. a `read` returning `0` mid-message).
    #[error("short {op} on {path}: expected {expected} bytes, got {actual}")]
    ShortIo { path: PathBuf, op: &'static str, expected: usize, actual: usize },

    /// The index reported by the consumer across an empty-fifo handshake
    /// does not match the buffer the producer is rotating away from.
    #[error("handshake desync: producer expects buffer {expected}, consumer released {actual}")]
    Desync { expected: u32, actual: u32 },

    /// A byte-pool allocation requested more bytes than the pool can ever
    /// hold, independent of current occupancy.
    #[error("pool request of {requested} bytes exceeds pool capacity of {capacity} bytes")]
    PoolRequestTooLarge { requested: usize, capacity: usize },

    /// The mmap/shm_open/mkfifo/ftruncate syscalls underlying the transport
    /// failed.
    #[error("shared memory setup failed: {0}")]
    SharedMemory(#[source] nix::Error),
}

impl TransportError {
    /// `true` for errors a caller could plausibly retry (rendezvous timing
    /// out, a transient short read); `false` for errors that indicate a
    /// misconfigured caller or a desynchronized protocol, where retrying
    /// without intervention will just fail again.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Rendezvous(_) | Self::ShortIo { .. })
    }

    /// Prints this error to stderr and terminates the process with exit
    /// code 1, matching the reference implementation's whole-process-abort
    /// behavior on unrecoverable handshake failures. Library code never
    /// calls this itself; it exists for host binaries (see
    /// `demos/producer_demo.rs`) that want that exact behavior.
    pub fn abort(&self) -> ! {
        eprintln!("dbi-event-ipc: fatal: {self}");
        std::process::exit(1);
    }
}
