//! Fixed-width messages exchanged over the two handshake fifos.
//!
//! Every message on `emptyfifo`/`fullfifo` is a single little-endian `u32`:
//! a buffer index, or the `FINISHED` sentinel. This mirrors the newer of
//! the two reference dialects (`sigil2_ipc.c`), which writes `curr_idx`
//! alone rather than the older dialect's three-value
//! `FINISHED`/`curr_idx`/`curr_used` framing — see the design notes for why
//! that dialect was chosen.
//!
//! Each message is a single `read`/`write` syscall, exactly as the reference
//! `flush_to_sigil2`/handshake-read do (`res != sizeof(curr_idx)` is fatal
//! immediately, with no retry): these are 4-byte payloads on a pipe, well
//! under `PIPE_BUF`, so a partial transfer here means the handshake itself
//! is broken, not an ordinary short write worth retrying.

use std::io;
use std::os::fd::BorrowedFd;
use std::path::Path;

use nix::unistd::{read, write};

use crate::error::TransportError;

/// Sentinel value written to `fullfifo` in place of a buffer index to tell
/// the consumer the producer is shutting down.
pub const FINISHED: u32 = u32::MAX;

const MESSAGE_BYTES: usize = 4;

/// Writes a single `u32` message in one `write` call.
pub fn write_message(fd: BorrowedFd<'_>, path: &Path, value: u32) -> Result<(), TransportError> {
    let bytes = value.to_le_bytes();
    let n = write(fd, &bytes)
        .map_err(|errno| TransportError::HandshakeIo { path: path.to_path_buf(), source: io::Error::from(errno) })?;
    if n != MESSAGE_BYTES {
        return Err(TransportError::ShortIo { path: path.to_path_buf(), op: "write", expected: MESSAGE_BYTES, actual: n });
    }
    Ok(())
}

/// Reads a single `u32` message in one `read` call.
///
/// A `read` returning `0` bytes here means the writer closed its end of
/// the pipe before sending a complete message, which is reported the same
/// as any other short read.
pub fn read_message(fd: BorrowedFd<'_>, path: &Path) -> Result<u32, TransportError> {
    let mut bytes = [0u8; MESSAGE_BYTES];
    let n = read(fd, &mut bytes)
        .map_err(|errno| TransportError::HandshakeIo { path: path.to_path_buf(), source: io::Error::from(errno) })?;
    if n != MESSAGE_BYTES {
        return Err(TransportError::ShortIo { path: path.to_path_buf(), op: "read", expected: MESSAGE_BYTES, actual: n });
    }
    Ok(u32::from_le_bytes(bytes))
}
