//! Buffer arena for the slicewatch harness.
//!
//! Owns raw byte storage and hands out zero-copy views over it. Every
//! mutation of a backing store (a write or a capacity change) is appended
//! to that store's journal, stamped by the session's logical clock, so the
//! ownership tracker can decide after the fact whether a view was mutated
//! underneath one of its readers.
//!
//! # Architecture
//!
//! ```text
//! BufferArena (per session)
//! ├── Arc<ArenaShared>  (clock, id counters, stats, growth policy)
//! ├── Payload × N
//! │   ├── pristine bytes (Arc<[u8]>, compared against by the verifier)
//! │   └── Chunk[] → Arc<BackingStore> (one store per source buffer)
//! └── marker store (1 byte, shared by every marker view)
//! ```
//!
//! # Copy toggles
//!
//! - **CopyOnView:** every view gets a private store holding a copy of its
//!   bytes. Mutations of the payload store can no longer reach it.
//! - **CopyOnGrow:** capacity growth forks the store instead of reallocating
//!   in place, so previously issued views stay valid.
//!
//! Both default to `false`: the harness exists to observe what happens when
//! nothing is copied.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod error;
pub mod fixture;
pub mod payload;
pub mod store;
pub mod view;

pub use arena::{ArenaStats, BufferArena};
pub use config::{ArenaConfig, FillMode};
pub use error::ArenaError;
pub use payload::{Chunk, Payload};
pub use store::{BackingStore, Growth, SharedStore, StoreEvent, WriteOutcome};
pub use view::{View, ViewBytes};
