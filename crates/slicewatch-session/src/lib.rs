//! Session engine for the slicewatch harness.
//!
//! A [`Session`] wires one payload through the whole pipeline: arena,
//! scheduler, transport, consumer, ownership check and verifier. It runs
//! in one of two [`ExecutionMode`]s:
//!
//! - **Lockstep**: a single thread walks the event timeline on a virtual
//!   clock. Deterministic; the default for tests.
//! - **Realtime**: a producer thread sleeps until each event and hands
//!   arrivals to the consumer over a bounded channel, under a wall-clock
//!   deadline.
//!
//! Every run ends in exactly one terminal [`SessionState`] and produces a
//! [`SessionReport`] carrying the full config, so any failure reruns from
//! its seed. [`SessionBatch`] runs many independent sessions on a worker
//! pool.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod batch;
pub mod config;
pub mod error;
pub mod report;
pub mod session;
pub mod state;

mod consumer;
mod lockstep;
mod realtime;
mod timeline;

pub use batch::{BatchReport, SessionBatch};
pub use config::{ConfigError, ExecutionMode, PayloadSource, SessionConfig};
pub use error::SessionError;
pub use report::SessionReport;
pub use session::Session;
pub use state::SessionState;

// Compile-time assertion: sessions move between batch workers.
const _: fn() = || {
    fn assert<T: Send>() {}
    assert::<Session>();
    assert::<SessionReport>();
};
