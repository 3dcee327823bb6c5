//! Slicewatch: a zero-copy buffer lifecycle validator.
//!
//! A producer slices a payload into views over shared backing stores, a
//! transport relays them with injected delays (and, on request, the
//! misbehaviours real transports have), and a consumer reassembles them.
//! Slicewatch records who held which view in which mode, replays every
//! store mutation against those claims, and verifies the bytes that came
//! out. Aliasing bugs that only show up under jitter become deterministic,
//! reproducible failures.
//!
//! This is the facade crate; it re-exports the public API of every
//! sub-crate.
//!
//! # Quick start
//!
//! ```rust
//! use slicewatch::prelude::*;
//!
//! // 64000 bytes in one store; the transport doubles the store while
//! // earlier slices are still held by the consumer.
//! let config = SessionConfig::new(7)
//!     .with_chunks(1, 64_000)
//!     .with_slice_size(4000)
//!     .with_jitter(JitterRange::none());
//! let sim = SimConfig::default().with_fault(Fault::GrowBacking {
//!     at: SeqNo(8),
//!     additional: 64_000,
//! });
//!
//! let report = Session::new(config.clone())
//!     .unwrap()
//!     .run(&mut SimTransport::new(sim.clone()));
//! assert_eq!(report.error().map(SessionError::kind), Some("concurrency-violation"));
//!
//! // Copying on view removes the aliasing.
//! let fixed = SessionConfig { copy_on_view: true, ..config };
//! let report = Session::new(fixed).unwrap().run(&mut SimTransport::new(sim));
//! assert!(report.is_ok());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `slicewatch-core` | IDs, logical clock, access modes, byte ranges |
//! | [`arena`] | `slicewatch-arena` | Backing stores, views, payloads, fixture I/O |
//! | [`tracker`] | `slicewatch-tracker` | Claims and the ownership invariant |
//! | [`sched`] | `slicewatch-sched` | Slicing and delay assignment |
//! | [`transport`] | `slicewatch-transport` | Transport trait, simulator, faults |
//! | [`verify`] | `slicewatch-verify` | Reassembly and byte comparison |
//! | [`session`] | `slicewatch-session` | Sessions, runners, batches, reports |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core identifiers and primitives (`slicewatch-core`).
pub use slicewatch_core as types;

/// Backing stores, views and payloads (`slicewatch-arena`).
///
/// [`arena::BufferArena`] owns the stores of one session and issues
/// [`arena::View`]s over them.
pub use slicewatch_arena as arena;

/// Ownership claims and violation detection (`slicewatch-tracker`).
pub use slicewatch_tracker as tracker;

/// Slicing and delay assignment (`slicewatch-sched`).
pub use slicewatch_sched as sched;

/// The transport contract and its simulators (`slicewatch-transport`).
///
/// Implement [`transport::Transport`] to put a real relay under test.
pub use slicewatch_transport as transport;

/// Reassembly and verification (`slicewatch-verify`).
pub use slicewatch_verify as verify;

/// Sessions and batches (`slicewatch-session`).
pub use slicewatch_session as session;

/// Common imports for typical slicewatch usage.
///
/// ```rust
/// use slicewatch::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use slicewatch_core::{AccessMode, Actor, ByteRange, SeqNo, SessionId};

    // Arena
    pub use slicewatch_arena::{ArenaConfig, BufferArena, FillMode, Payload, View};

    // Tracker
    pub use slicewatch_tracker::{ConcurrencyViolation, OwnershipTracker, ViolationKind};

    // Scheduler
    pub use slicewatch_sched::{Delivery, JitterRange, JitterScope, ScheduleConfig};

    // Transport
    pub use slicewatch_transport::{Fault, FifoTransport, SimConfig, SimTransport, Transport};

    // Verifier
    pub use slicewatch_verify::{ReassemblyOrder, Verdict};

    // Session
    pub use slicewatch_session::{
        BatchReport, ExecutionMode, PayloadSource, Session, SessionBatch, SessionConfig,
        SessionError, SessionReport, SessionState,
    };
}
