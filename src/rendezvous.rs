//! Locating and attaching to a consumer's shared-memory region and fifos.
//!
//! Three filesystem objects under [`Config::ipc_dir`] anchor the handshake:
//! `shmem` (a plain file the producer maps), and `emptyfifo`/`fullfifo`
//! (named pipes). Opening a named pipe for one end blocks in the kernel
//! until the other end is opened too, which is the synchronization the
//! reference implementation relies on; a plain file has no such blocking
//! open, so `shmem`'s appearance has to be polled for instead. This module
//! does both: poll for `shmem`, then open the fifos, which is also the
//! order the reference `SGL_(init_IPC)` uses.

use std::fs::OpenOptions;
use std::num::NonZeroUsize;
use std::os::fd::OwnedFd;

use nix::fcntl::OFlag;
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd;

use crate::backoff::Poll;
use crate::config::Config;
use crate::error::TransportError;

/// The three attached endpoints a connected producer holds for its
/// lifetime.
///
/// `region_ptr`/`region_len` describe the `mmap`ed `shmem` file; `emptyfifo`
/// is opened read-only (the producer receives "buffer released" signals on
/// it) and `fullfifo` write-only (the producer sends "buffer full" signals
/// on it), matching the roles described in the wire protocol.
pub struct Endpoints {
    pub region_ptr: *mut u8,
    pub region_len: usize,
    pub emptyfifo: OwnedFd,
    pub fullfifo: OwnedFd,
}

// SAFETY: the mapping and fifo descriptors are only ever accessed through
// `&mut Transport`, so `Endpoints` is safe to move across threads.
unsafe impl Send for Endpoints {}

impl Endpoints {
    /// Waits for the consumer to publish its endpoints under
    /// `config.ipc_dir`, then attaches to all three.
    pub fn connect(config: &Config) -> Result<Self, TransportError> {
        wait_for_shmem(config)?;
        let region_ptr = map_shmem(config)?;

        let emptyfifo = open_fifo(&config.emptyfifo_path(), OFlag::O_RDONLY)?;
        let fullfifo = open_fifo(&config.fullfifo_path(), OFlag::O_WRONLY)?;

        Ok(Self { region_ptr, region_len: config.region_size(), emptyfifo, fullfifo })
    }
}

impl Drop for Endpoints {
    fn drop(&mut self) {
        // SAFETY: `region_ptr`/`region_len` describe exactly the mapping
        // created in `connect` and are not used again after this call.
        let Some(ptr) = std::ptr::NonNull::new(self.region_ptr.cast()) else { return };
        if let Err(err) = unsafe { munmap(ptr, self.region_len) } {
            tracing::error!(error = %err, "failed to unmap shared region on shutdown");
        }
    }
}

fn wait_for_shmem(config: &Config) -> Result<(), TransportError> {
    let path = config.shmem_path();
    let poll = Poll::new(config.rendezvous_poll_interval, config.rendezvous_timeout);
    while !path.exists() {
        if poll.is_expired() {
            return Err(TransportError::Rendezvous(format!(
                "timed out waiting for {} to appear",
                path.display()
            )));
        }
        poll.wait();
    }
    Ok(())
}

fn map_shmem(config: &Config) -> Result<*mut u8, TransportError> {
    let path = config.shmem_path();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(&path)
        .map_err(|source| TransportError::HandshakeIo { path: path.clone(), source })?;

    let len = config.region_size();
    let nz_len = NonZeroUsize::new(len).expect("region_size must be nonzero");
    // SAFETY: `file` outlives the call and the mapped range matches what
    // was reserved for it by `publish_endpoints`'s `ftruncate`.
    let ptr = unsafe { mmap(None, nz_len, ProtFlags::PROT_READ | ProtFlags::PROT_WRITE, MapFlags::MAP_SHARED, &file, 0) }
        .map_err(TransportError::SharedMemory)?;

    Ok(ptr.cast().as_ptr())
}

fn open_fifo(path: &std::path::Path, flags: OFlag) -> Result<OwnedFd, TransportError> {
    use std::os::fd::FromRawFd;

    let raw = nix::fcntl::open(path, flags, Mode::empty()).map_err(TransportError::SharedMemory)?;
    // SAFETY: `open` above returned a freshly-opened, uniquely-owned fd.
    Ok(unsafe { OwnedFd::from_raw_fd(raw) })
}

/// Creates the three filesystem endpoints a consumer is expected to publish.
///
/// Exposed for the integration test harness, which plays the consumer's
/// role: creating the fifos and the backing shmem file before a producer's
/// `Transport::connect` call can observe them, using [`unistd::mkfifo`]
/// directly the same way ordinary file creation does elsewhere in this
/// crate.
pub fn publish_endpoints(config: &Config) -> Result<(), TransportError> {
    std::fs::create_dir_all(&config.ipc_dir)
        .map_err(|source| TransportError::HandshakeIo { path: config.ipc_dir.clone(), source })?;

    for path in [config.emptyfifo_path(), config.fullfifo_path()] {
        match unistd::mkfifo(&path, Mode::from_bits_truncate(0o600)) {
            Ok(()) | Err(nix::Error::EEXIST) => {}
            Err(err) => return Err(TransportError::SharedMemory(err)),
        }
    }

    let shmem_path = config.shmem_path();
    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(&shmem_path)
        .map_err(|source| TransportError::HandshakeIo { path: shmem_path.clone(), source })?;
    unistd::ftruncate(&file, config.region_size() as i64).map_err(TransportError::SharedMemory)?;

    Ok(())
}
