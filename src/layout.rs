//! Wire-format definitions for event records.
//!
//! This module is the Rust analogue of a single shared C header: both the
//! producer (this crate) and the consumer process must agree on these byte
//! layouts exactly. `EventRecord` is a fixed-size tagged union matching
//! `BufferedSglEv` from the reference C implementation
//! (`sigrind/sigil2_ipc.h`) field-for-field.
//!
//! A `const` size assertion below pins `size_of::<EventRecord>()` so any
//! change to a variant that would break ABI parity with the consumer fails
//! to compile rather than silently shipping a mismatched layout.

use std::fmt;

/// Discriminant tag stored at the front of every [`EventRecord`].
const TAG_MEMORY: u32 = 0;
const TAG_COMPUTATION: u32 = 1;
const TAG_SYNC: u32 = 2;
const TAG_CONTEXT: u32 = 3;

/// Total on-wire size of one [`EventRecord`], in bytes.
///
/// Kept in sync with the struct below via a compile-time assertion.
pub const EVENT_RECORD_SIZE: usize = 24;

/// Memory access kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MemoryKind {
    Load = 0,
    Store = 1,
}

/// Computation class: integer or floating-point op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompClass {
    Integer = 0,
    Float = 1,
}

/// Computation arity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompArity {
    Unary = 0,
    Binary = 1,
    Ternary = 2,
    Quaternary = 3,
}

/// Context-event kind: a single instruction, or a function boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContextKind {
    Instruction = 0,
    FunctionEntry = 1,
    FunctionLeave = 2,
}

impl ContextKind {
    /// `true` for the two variants whose `id` indexes a pool-resident
    /// function-name string rather than being a raw instruction address.
    #[inline]
    #[must_use]
    pub fn is_function_boundary(self) -> bool {
        matches!(self, ContextKind::FunctionEntry | ContextKind::FunctionLeave)
    }
}

#[derive(Clone, Copy)]
#[repr(C)]
struct MemoryEvent {
    kind: u8,
    _pad: [u8; 3],
    size: u32,
    address: u64,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct ComputationEvent {
    class: u8,
    arity: u8,
    /// Reserved for a specific op code, matching a TODO left in the
    /// reference `log_comp_event`. Always zero in this version; part of the
    /// wire layout so a future revision never needs to resize the record.
    op: u8,
    _pad: [u8; 13],
}

#[derive(Clone, Copy)]
#[repr(C)]
struct SyncEvent {
    kind: u8,
    _pad: [u8; 7],
    data: u64,
}

#[derive(Clone, Copy)]
#[repr(C)]
struct ContextEvent {
    kind: u8,
    _pad: [u8; 7],
    id: u64,
}

#[derive(Clone, Copy)]
#[repr(C)]
union EventPayload {
    memory: MemoryEvent,
    computation: ComputationEvent,
    sync: SyncEvent,
    context: ContextEvent,
}

/// A single fixed-size event record, matching the consumer's wire ABI.
///
/// Construct one with [`EventRecord::memory`], [`EventRecord::computation`],
/// [`EventRecord::sync`], or [`EventRecord::context`]; read one back with
/// [`EventRecord::decode`].
#[derive(Clone, Copy)]
#[repr(C)]
pub struct EventRecord {
    tag: u32,
    _pad: [u8; 4],
    payload: EventPayload,
}

const _: () = assert!(std::mem::size_of::<EventRecord>() == EVENT_RECORD_SIZE);

impl EventRecord {
    #[must_use]
    pub fn memory(kind: MemoryKind, address: u64, size: u32) -> Self {
        Self {
            tag: TAG_MEMORY,
            _pad: [0; 4],
            payload: EventPayload {
                memory: MemoryEvent { kind: kind as u8, _pad: [0; 3], size, address },
            },
        }
    }

    #[must_use]
    pub fn computation(class: CompClass, arity: CompArity) -> Self {
        Self {
            tag: TAG_COMPUTATION,
            _pad: [0; 4],
            payload: EventPayload {
                computation: ComputationEvent {
                    class: class as u8,
                    arity: arity as u8,
                    op: 0,
                    _pad: [0; 13],
                },
            },
        }
    }

    #[must_use]
    pub fn sync(kind: u8, data: u64) -> Self {
        Self {
            tag: TAG_SYNC,
            _pad: [0; 4],
            payload: EventPayload { sync: SyncEvent { kind, _pad: [0; 7], data } },
        }
    }

    #[must_use]
    pub fn context(kind: ContextKind, id: u64) -> Self {
        Self {
            tag: TAG_CONTEXT,
            _pad: [0; 4],
            payload: EventPayload { context: ContextEvent { kind: kind as u8, _pad: [0; 7], id } },
        }
    }

    /// Decodes this record back into a safe, owned representation.
    ///
    /// # Panics
    ///
    /// Panics if the tag or an enum discriminant is not one this crate ever
    /// writes — this can only happen if the record was corrupted or never
    /// initialized by one of the constructors above, which is an internal
    /// bug rather than something a caller can trigger.
    #[must_use]
    pub fn decode(&self) -> DecodedEvent {
        // SAFETY: `tag` always matches the variant written by the
        // constructor that produced this record (invariant upheld by
        // construction; the union is never written to except through
        // `memory`/`computation`/`sync`/`context`).
        unsafe {
            match self.tag {
                TAG_MEMORY => {
                    let m = self.payload.memory;
                    DecodedEvent::Memory {
                        kind: if m.kind == 0 { MemoryKind::Load } else { MemoryKind::Store },
                        address: m.address,
                        size: m.size,
                    }
                }
                TAG_COMPUTATION => {
                    let c = self.payload.computation;
                    DecodedEvent::Computation {
                        class: if c.class == 0 { CompClass::Integer } else { CompClass::Float },
                        arity: match c.arity {
                            0 => CompArity::Unary,
                            1 => CompArity::Binary,
                            2 => CompArity::Ternary,
                            3 => CompArity::Quaternary,
                            other => panic!("invalid computation arity tag: {other}"),
                        },
                        op: c.op,
                    }
                }
                TAG_SYNC => {
                    let s = self.payload.sync;
                    DecodedEvent::Sync { kind: s.kind, data: s.data }
                }
                TAG_CONTEXT => {
                    let c = self.payload.context;
                    DecodedEvent::Context {
                        kind: match c.kind {
                            0 => ContextKind::Instruction,
                            1 => ContextKind::FunctionEntry,
                            2 => ContextKind::FunctionLeave,
                            other => panic!("invalid context kind tag: {other}"),
                        },
                        id: c.id,
                    }
                }
                other => panic!("invalid event record tag: {other}"),
            }
        }
    }
}

impl fmt::Debug for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.decode().fmt(f)
    }
}

/// Safe, owned view of a decoded [`EventRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodedEvent {
    Memory { kind: MemoryKind, address: u64, size: u32 },
    Computation { class: CompClass, arity: CompArity, op: u8 },
    Sync { kind: u8, data: u64 },
    Context { kind: ContextKind, id: u64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_round_trips() {
        let rec = EventRecord::memory(MemoryKind::Load, 0x1000, 8);
        assert_eq!(rec.decode(), DecodedEvent::Memory { kind: MemoryKind::Load, address: 0x1000, size: 8 });
    }

    #[test]
    fn computation_round_trips() {
        let rec = EventRecord::computation(CompClass::Float, CompArity::Binary);
        assert_eq!(
            rec.decode(),
            DecodedEvent::Computation { class: CompClass::Float, arity: CompArity::Binary, op: 0 }
        );
    }

    #[test]
    fn sync_round_trips() {
        let rec = EventRecord::sync(7, 0xdead_beef);
        assert_eq!(rec.decode(), DecodedEvent::Sync { kind: 7, data: 0xdead_beef });
    }

    #[test]
    fn context_function_entry_round_trips() {
        let rec = EventRecord::context(ContextKind::FunctionEntry, 42);
        assert_eq!(rec.decode(), DecodedEvent::Context { kind: ContextKind::FunctionEntry, id: 42 });
        assert!(ContextKind::FunctionEntry.is_function_boundary());
        assert!(!ContextKind::Instruction.is_function_boundary());
    }

    #[test]
    fn record_size_is_fixed() {
        assert_eq!(std::mem::size_of::<EventRecord>(), EVENT_RECORD_SIZE);
    }
}
