//! Verifier for the slicewatch harness.
//!
//! Reassembles the received data deliveries and compares them with the
//! original payload: FNV-1a hashes first, then a byte scan for the first
//! mismatch when the hashes differ.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod hash;
pub mod verify;

pub use error::VerifyError;
pub use hash::payload_hash;
pub use verify::{verify, verify_with, Mismatch, ReassemblyOrder, Verdict};
