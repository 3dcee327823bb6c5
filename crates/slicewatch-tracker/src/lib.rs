//! Ownership tracking for the slicewatch harness.
//!
//! Races between the producer, the transport and the consumer are made
//! explicit: every actor that holds a view records a [`Claim`] on it, and
//! every mutation of a backing store is already in that store's journal.
//! [`OwnershipTracker::check_invariant`] replays each journal against the
//! claims that were live at each event's stamp and reports the first
//! [`ConcurrencyViolation`].
//!
//! The check runs once, after the stream ends. Nothing here blocks or
//! reorders the actors it watches.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod claim;
pub mod tracker;
pub mod violation;

pub use claim::Claim;
pub use tracker::OwnershipTracker;
pub use violation::{ConcurrencyViolation, ViolationKind};
