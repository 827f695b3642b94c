//! End-to-end tests driving a real producer against a hand-rolled
//! reference consumer over actual named pipes and a real `mmap`ed file.
//!
//! The consumer here never calls into `dbi_event_ipc`'s own buffer/region
//! code — it parses the wire format directly off raw bytes — so these
//! tests exercise the producer's half of the protocol against an
//! independent implementation of the consumer's half, rather than the
//! producer's encode path checked against itself.
//!
//! Buffer geometry is deliberately tiny (`NUM_BUFFERS=4`, `MAX_EVENTS=2`,
//! `POOL_BYTES=8`) so rotation and backpressure are reachable in a few
//! calls.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::Path;
use std::thread;
use std::time::Duration;

use nix::sys::mman::{mmap, MapFlags, ProtFlags};
use tempfile::TempDir;

use dbi_event_ipc::{
    publish_endpoints, CompArity, CompClass, Config, ContextKind, DecodedEvent, EventRecord, MemoryKind, Transport,
    EVENT_RECORD_SIZE, FINISHED,
};

const NUM_BUFFERS: usize = 4;
const MAX_EVENTS: usize = 2;
const POOL_BYTES: usize = 8;

fn test_config(dir: &Path) -> Config {
    Config::new(dir, NUM_BUFFERS, MAX_EVENTS, POOL_BYTES)
        .with_rendezvous_timeout(Duration::from_secs(5))
        .with_rendezvous_poll_interval(Duration::from_millis(5))
}

fn read_u32(file: &mut File) -> u32 {
    let mut bytes = [0u8; 4];
    file.read_exact(&mut bytes).expect("expected a 4-byte handshake message");
    u32::from_le_bytes(bytes)
}

fn write_u32(file: &mut File, value: u32) {
    file.write_all(&value.to_le_bytes()).expect("handshake write failed");
}

/// A reference consumer's view of the mapped region: raw pointer
/// arithmetic mirroring `region::BufferLayout`, kept deliberately separate
/// from that module.
struct ConsumerRegion {
    base: *const u8,
    stride: usize,
    #[allow(dead_code)]
    file: File,
}

// SAFETY: the mapping outlives every test that constructs one, and tests
// only read through `base`, never write.
unsafe impl Send for ConsumerRegion {}

impl ConsumerRegion {
    fn open(config: &Config) -> Self {
        let file = OpenOptions::new().read(true).write(true).open(config.shmem_path()).expect("open shmem");
        let len = config.region_size();
        let nz_len = NonZeroUsize::new(len).unwrap();
        let ptr = unsafe { mmap(None, nz_len, ProtFlags::PROT_READ, MapFlags::MAP_SHARED, &file, 0) }.expect("mmap shmem");
        Self { base: ptr.cast().as_ptr(), stride: config.buffer_stride(), file }
    }

    fn events_used(&self, buffer: u32) -> u32 {
        unsafe { self.base.add(self.stride * buffer as usize).cast::<u32>().read_unaligned() }
    }

    fn decode_event(&self, buffer: u32, slot: usize) -> DecodedEvent {
        let offset = self.stride * buffer as usize + 8 + slot * EVENT_RECORD_SIZE;
        let record = unsafe { self.base.add(offset).cast::<EventRecord>().read_unaligned() };
        record.decode()
    }

    fn pool_bytes(&self, buffer: u32, pool_offset: u32, len: usize) -> Vec<u8> {
        let pool_base = self.stride * buffer as usize + 8 + MAX_EVENTS * EVENT_RECORD_SIZE;
        let offset = pool_base + pool_offset as usize;
        unsafe { std::slice::from_raw_parts(self.base.add(offset), len).to_vec() }
    }
}

/// Publishes the consumer's endpoints, then opens the complementary ends
/// of both fifos. Must run concurrently with `Transport::connect`, since
/// opening a fifo blocks until both ends are open.
fn spawn_producer(config: Config) -> (thread::JoinHandle<Result<Transport, dbi_event_ipc::TransportError>>, File, File) {
    publish_endpoints(&config).expect("publish endpoints");
    let connect_config = config.clone();
    let handle = thread::spawn(move || Transport::connect(connect_config));

    let emptyfifo_w = OpenOptions::new().write(true).open(config.emptyfifo_path()).expect("open emptyfifo for write");
    let fullfifo_r = OpenOptions::new().read(true).open(config.fullfifo_path()).expect("open fullfifo for read");

    (handle, emptyfifo_w, fullfifo_r)
}

#[test]
fn single_event_then_shutdown() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp.path().join("ipc"));
    let (handle, emptyfifo_w, mut fullfifo_r) = spawn_producer(config.clone());

    let mut transport = handle.join().unwrap().expect("connect");
    transport.acquire_event_slot().unwrap().commit(EventRecord::memory(MemoryKind::Load, 0x1000, 8));

    let close_handle = thread::spawn(move || transport.close());

    assert_eq!(read_u32(&mut fullfifo_r), 0, "buffer 0 flushed on shutdown");
    assert_eq!(read_u32(&mut fullfifo_r), FINISHED, "termination sentinel follows");

    let region = ConsumerRegion::open(&config);
    assert_eq!(region.events_used(0), 1);
    assert_eq!(region.decode_event(0, 0), DecodedEvent::Memory { kind: MemoryKind::Load, address: 0x1000, size: 8 });

    drop(emptyfifo_w);
    close_handle.join().unwrap().expect("close");
}

#[test]
fn rotation_on_third_event() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp.path().join("ipc"));
    let (handle, mut emptyfifo_w, mut fullfifo_r) = spawn_producer(config.clone());
    let mut transport = handle.join().unwrap().expect("connect");

    transport.acquire_event_slot().unwrap().commit(EventRecord::context(ContextKind::Instruction, 1));
    transport.acquire_event_slot().unwrap().commit(EventRecord::context(ContextKind::Instruction, 2));
    // Buffer 0 is now full (MAX_EVENTS=2); this call rotates first.
    transport.acquire_event_slot().unwrap().commit(EventRecord::context(ContextKind::Instruction, 3));

    assert_eq!(read_u32(&mut fullfifo_r), 0, "buffer 0 announced full");

    let region = ConsumerRegion::open(&config);
    assert_eq!(region.events_used(0), 2);
    assert_eq!(region.decode_event(0, 0), DecodedEvent::Context { kind: ContextKind::Instruction, id: 1 });
    assert_eq!(region.decode_event(0, 1), DecodedEvent::Context { kind: ContextKind::Instruction, id: 2 });
    assert_eq!(region.events_used(1), 1);
    assert_eq!(region.decode_event(1, 0), DecodedEvent::Context { kind: ContextKind::Instruction, id: 3 });

    write_u32(&mut emptyfifo_w, 0);
    let close_handle = thread::spawn(move || transport.close());
    assert_eq!(read_u32(&mut fullfifo_r), 1);
    assert_eq!(read_u32(&mut fullfifo_r), FINISHED);
    drop(emptyfifo_w);
    close_handle.join().unwrap().expect("close");
}

#[test]
fn pool_allocation_spans_rotation() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp.path().join("ipc"));
    let (handle, mut emptyfifo_w, mut fullfifo_r) = spawn_producer(config.clone());
    let mut transport = handle.join().unwrap().expect("connect");

    let (event, pool, offset) = transport.acquire_event_and_pool(5).unwrap();
    event.commit(EventRecord::context(ContextKind::FunctionEntry, u64::from(offset)));
    let mut pool = pool;
    pool.as_mut_slice().copy_from_slice(b"alpha");
    pool.commit();
    assert_eq!(offset, 0);

    // alpha(5) + beta(4) = 9 > POOL_BYTES(8): this call must rotate even
    // though only one event has been placed in buffer 0 so far.
    let (event, pool, offset) = transport.acquire_event_and_pool(4).unwrap();
    event.commit(EventRecord::context(ContextKind::FunctionEntry, u64::from(offset)));
    let mut pool = pool;
    pool.as_mut_slice().copy_from_slice(b"beta");
    pool.commit();
    assert_eq!(offset, 0, "beta lands at the start of buffer 1's pool");

    assert_eq!(read_u32(&mut fullfifo_r), 0);

    let region = ConsumerRegion::open(&config);
    assert_eq!(region.pool_bytes(0, 0, 5), b"alpha");
    assert_eq!(region.pool_bytes(1, 0, 4), b"beta");
    assert_eq!(
        region.decode_event(0, 0),
        DecodedEvent::Context { kind: ContextKind::FunctionEntry, id: 0 },
        "committed event's id equals the pool offset its name was acquired at"
    );
    assert_eq!(
        region.decode_event(1, 0),
        DecodedEvent::Context { kind: ContextKind::FunctionEntry, id: 0 },
        "beta's event id equals its own buffer's pool offset, 0"
    );

    let close_handle = thread::spawn(move || transport.close());
    assert_eq!(read_u32(&mut fullfifo_r), 1);
    assert_eq!(read_u32(&mut fullfifo_r), FINISHED);
    drop(emptyfifo_w);
    close_handle.join().unwrap().expect("close");
}

#[test]
fn backpressure_blocks_after_num_buffers_rotations() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp.path().join("ipc"));
    let (handle, mut emptyfifo_w, mut fullfifo_r) = spawn_producer(config.clone());
    let mut transport = handle.join().unwrap().expect("connect");

    // Fill all four buffers completely. Three of the four rotations this
    // takes (0->1, 1->2, 2->3) happen inline, since none of those target
    // buffers have ever been sent to the consumer before.
    for id in 0..(NUM_BUFFERS * MAX_EVENTS) as u64 {
        transport.acquire_event_slot().unwrap().commit(EventRecord::context(ContextKind::Instruction, id));
    }

    // The next acquisition rotates 3->0: it flushes buffer 3 immediately,
    // then blocks on emptyfifo because buffer 0 was sent earlier and has
    // never been released.
    let blocked = thread::spawn(move || transport.acquire_event_slot().map(|_| ()));

    for expected in 0..NUM_BUFFERS as u32 {
        assert_eq!(read_u32(&mut fullfifo_r), expected, "all four buffers, including the wrap-around flush, are announced");
    }

    thread::sleep(Duration::from_millis(50));
    assert!(!blocked.is_finished(), "producer should still be blocked waiting for a release");

    write_u32(&mut emptyfifo_w, 0);
    blocked.join().unwrap().expect("producer resumes once buffer 0 is released");
}

#[test]
fn termination_with_partial_buffer() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp.path().join("ipc"));
    let (handle, emptyfifo_w, mut fullfifo_r) = spawn_producer(config.clone());
    let mut transport = handle.join().unwrap().expect("connect");

    transport.acquire_event_slot().unwrap().commit(EventRecord::computation(CompClass::Integer, CompArity::Binary));

    let close_handle = thread::spawn(move || transport.close());
    assert_eq!(read_u32(&mut fullfifo_r), 0, "partial buffer still flushed");
    assert_eq!(read_u32(&mut fullfifo_r), FINISHED);

    drop(emptyfifo_w);
    close_handle.join().unwrap().expect("producer observes EOF on emptyfifo and returns");
}

#[test]
fn corrupt_consumer_release_is_reported_as_desync() {
    let tmp = TempDir::new().unwrap();
    let config = test_config(&tmp.path().join("ipc"));
    let (handle, mut emptyfifo_w, mut fullfifo_r) = spawn_producer(config.clone());
    let mut transport = handle.join().unwrap().expect("connect");

    // Fill all four buffers, exactly as in the backpressure scenario.
    for id in 0..(NUM_BUFFERS * MAX_EVENTS) as u64 {
        transport.acquire_event_slot().unwrap().commit(EventRecord::context(ContextKind::Instruction, id));
    }

    // Rotating out of buffer 3 wraps back to buffer 0, which was sent
    // earlier and never released: the producer blocks waiting for its
    // release index. The consumer reports releasing buffer 2 instead.
    let blocked = thread::spawn(move || transport.acquire_event_slot().map(|_| ()));

    for expected in 0..NUM_BUFFERS as u32 {
        assert_eq!(read_u32(&mut fullfifo_r), expected);
    }
    write_u32(&mut emptyfifo_w, 2);

    let err = blocked.join().unwrap().unwrap_err();
    assert!(matches!(err, dbi_event_ipc::TransportError::Desync { expected: 0, actual: 2 }));
}
