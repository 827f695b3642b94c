//! Configuration for the event transport.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::TransportError;

/// Basenames of the three filesystem endpoints the consumer publishes under
/// `ipc_dir`.
pub const SHMEM_NAME: &str = "shmem";
pub const EMPTYFIFO_NAME: &str = "emptyfifo";
pub const FULLFIFO_NAME: &str = "fullfifo";

/// Validated configuration for a [`crate::Transport`].
///
/// A plain struct built through `new`/`Default` with asserts on
/// construction rather than deferred validation, except that `ipc_dir` is
/// only checked for
/// non-emptiness here — the directory's actual presence is checked during
/// rendezvous, where a missing directory is a `Rendezvous` error rather
/// than a `Config` error.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory the consumer publishes `shmem`/`emptyfifo`/`fullfifo` under.
    pub ipc_dir: PathBuf,
    /// Number of buffers in the ring, always `>= 2`, typically 4-8. Kept
    /// runtime-configurable so tests can use small values while production
    /// uses a handful of multi-megabyte buffers.
    pub num_buffers: usize,
    /// Maximum event records per buffer.
    pub max_events: usize,
    /// Size in bytes of each buffer's variable-length byte pool.
    pub pool_bytes: usize,
    /// Overall timeout for the producer's wait for `shmem` to appear.
    pub rendezvous_timeout: Duration,
    /// Sleep interval between existence checks while waiting for the
    /// consumer's `shmem` file to appear.
    pub rendezvous_poll_interval: Duration,
}

impl Config {
    /// Creates a new configuration, validating buffer geometry.
    ///
    /// # Panics
    ///
    /// Panics if `num_buffers < 2`, or if `max_events == 0`.
    #[must_use]
    pub fn new(ipc_dir: impl Into<PathBuf>, num_buffers: usize, max_events: usize, pool_bytes: usize) -> Self {
        assert!(num_buffers >= 2, "num_buffers must be at least 2");
        assert!(max_events > 0, "max_events must be positive");

        Self {
            ipc_dir: ipc_dir.into(),
            num_buffers,
            max_events,
            pool_bytes,
            rendezvous_timeout: Duration::from_secs(30),
            rendezvous_poll_interval: Duration::from_millis(500),
        }
    }

    /// A production-sized configuration: 4 buffers, 64K events and a 1MiB
    /// pool each (an `EventBuffer` of a few MB).
    #[must_use]
    pub fn production(ipc_dir: impl Into<PathBuf>) -> Self {
        Self::new(ipc_dir, 4, 65536, 1024 * 1024)
    }

    /// Sets the overall rendezvous timeout.
    #[must_use]
    pub fn with_rendezvous_timeout(mut self, timeout: Duration) -> Self {
        self.rendezvous_timeout = timeout;
        self
    }

    /// Sets the rendezvous poll interval.
    #[must_use]
    pub fn with_rendezvous_poll_interval(mut self, interval: Duration) -> Self {
        self.rendezvous_poll_interval = interval;
        self
    }

    /// Validates the parts of the configuration that can be checked without
    /// touching the filesystem.
    pub fn validate(&self) -> Result<(), TransportError> {
        if self.ipc_dir.as_os_str().is_empty() {
            return Err(TransportError::Config("ipc_dir must not be empty".into()));
        }
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn shmem_path(&self) -> PathBuf {
        self.join(SHMEM_NAME)
    }

    #[inline]
    #[must_use]
    pub fn emptyfifo_path(&self) -> PathBuf {
        self.join(EMPTYFIFO_NAME)
    }

    #[inline]
    #[must_use]
    pub fn fullfifo_path(&self) -> PathBuf {
        self.join(FULLFIFO_NAME)
    }

    fn join(&self, name: &str) -> PathBuf {
        let mut p = self.ipc_dir.clone();
        p.push(name);
        p
    }

    /// Number of bytes occupied by the two `u32` counters at the front of
    /// every buffer (`events_used`, `pool_used`).
    const COUNTERS_BYTES: usize = 8;

    /// Byte stride from the start of one buffer to the start of the next.
    #[must_use]
    pub fn buffer_stride(&self) -> usize {
        Self::COUNTERS_BYTES + self.max_events * crate::layout::EVENT_RECORD_SIZE + self.pool_bytes
    }

    /// Total size of the mapped `SharedRegion`.
    #[must_use]
    pub fn region_size(&self) -> usize {
        self.buffer_stride() * self.num_buffers
    }
}

impl Default for Config {
    /// Defaults to `production("/tmp/dbi-ipc")`; callers virtually always
    /// override `ipc_dir`.
    fn default() -> Self {
        Self::production(Path::new("/tmp/dbi-ipc"))
    }
}
