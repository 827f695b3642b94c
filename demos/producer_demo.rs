//! Minimal producer: connects, emits a handful of events and one pool
//! allocation, then shuts down cleanly.
//!
//! Run a consumer that creates `shmem`/`emptyfifo`/`fullfifo` under the
//! given directory first (see `publish_endpoints` in the library, or
//! `tests/integration_tests.rs` for a reference consumer loop), then:
//!
//! ```text
//! producer-demo /tmp/dbi-ipc
//! ```

use std::env;

use dbi_event_ipc::{Config, ContextKind, EventRecord, MemoryKind, Transport};

fn main() {
    tracing_subscriber::fmt::init();

    let ipc_dir = env::args().nth(1).unwrap_or_else(|| "/tmp/dbi-ipc".to_string());

    let config = Config::production(ipc_dir);
    let mut transport = Transport::connect(config).unwrap_or_else(|e| e.abort());

    // A function-entry event's `id` is the pool offset locating its
    // UTF-8 name, so the event and the name bytes are acquired together:
    // committing a standalone id unrelated to the pool allocation would
    // leave the consumer with no way to find the name.
    let name = b"example-symbol";
    let (entry_slot, mut pool_slot, pool_offset) =
        transport.acquire_event_and_pool(name.len()).unwrap_or_else(|e| e.abort());
    pool_slot.as_mut_slice().copy_from_slice(name);
    pool_slot.commit();
    entry_slot.commit(EventRecord::context(ContextKind::FunctionEntry, u64::from(pool_offset)));

    transport
        .acquire_event_slot()
        .unwrap_or_else(|e| e.abort())
        .commit(EventRecord::memory(MemoryKind::Load, 0x7fff_0000, 8));

    transport
        .acquire_event_slot()
        .unwrap_or_else(|e| e.abort())
        .commit(EventRecord::context(ContextKind::FunctionLeave, u64::from(pool_offset)));

    transport.close().unwrap_or_else(|e| e.abort());
}
