//! Shared-memory event transport for streaming dynamic-instrumentation
//! trace records from a producer process to a consumer process.
//!
//! A producer fills a rotating set of buffers, each holding a fixed-size
//! array of [`EventRecord`]s plus a variable-length byte pool for
//! associated data (function names, literal operands, and the like).
//! Handoff between producer and consumer runs over a pair of named pipes:
//! the producer announces a full buffer on one, and the consumer announces
//! a released buffer on the other. See [`Transport`] for the entry point.
//!
//! ```no_run
//! use dbi_event_ipc::{Config, MemoryKind, Transport};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut transport = Transport::connect(Config::production("/tmp/dbi-ipc"))?;
//! let slot = transport.acquire_event_slot()?;
//! slot.commit(dbi_event_ipc::EventRecord::memory(MemoryKind::Load, 0x1000, 8));
//! transport.close()?;
//! # Ok(())
//! # }
//! ```

mod backoff;
mod config;
mod error;
mod handshake;
mod invariants;
mod layout;
mod metrics;
mod region;
mod rendezvous;
mod slot;
mod transport;

pub use config::Config;
pub use error::TransportError;
pub use handshake::FINISHED;
pub use layout::{CompArity, CompClass, ContextKind, DecodedEvent, EventRecord, MemoryKind, EVENT_RECORD_SIZE};
pub use metrics::Metrics;
pub use rendezvous::publish_endpoints;
pub use slot::{EventSlot, PoolSlot};
pub use transport::Transport;
