//! Core types for the slicewatch buffer lifecycle validator.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the identifiers, the logical clock, byte ranges and access modes
//! shared by every other crate in the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod id;
pub mod mode;
pub mod range;

pub use clock::{LogicalClock, SharedClock, Stamp};
pub use id::{ChunkIndex, PayloadId, SeqNo, SessionId, StoreId, ViewId};
pub use mode::{AccessMode, Actor};
pub use range::ByteRange;
