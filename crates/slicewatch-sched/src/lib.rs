//! Chunk scheduler for the slicewatch harness.
//!
//! Slices a payload into zero-copy views, assigns each a sequence number
//! and a jittered delay, and yields the resulting [`Delivery`] values
//! lazily in payload order. Optionally interleaves 1-byte marker views
//! between data slices and tags every issued view with the producer's
//! claim.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod delivery;
pub mod error;
pub mod schedule;

pub use config::{JitterRange, JitterScope, ScheduleConfig};
pub use delivery::{Delivery, DeliveryKind};
pub use error::ScheduleError;
pub use schedule::{schedule, slice_count, Schedule};
