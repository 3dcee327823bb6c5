//! Transport contract and simulators for the slicewatch harness.
//!
//! A [`Transport`] takes each [`Delivery`](slicewatch_sched::Delivery) as
//! the producer hands it off and returns the [`Arrival`]s it will produce.
//! The contract: no byte loss, no duplication, order may vary, and bytes
//! arrive unmodified unless the view is `MutableShared` and the scenario
//! mutates it.
//!
//! [`SimTransport`] honours the contract deterministically and can break it
//! on purpose through injected [`Fault`]s. [`FifoTransport`] is the
//! zero-delay, order-preserving reference.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arrival;
pub mod error;
pub mod fifo;
pub mod sim;

pub use arrival::{sort_arrivals, write_received, Arrival, Arrivals};
pub use error::TransportError;
pub use fifo::FifoTransport;
pub use sim::{Fault, SimConfig, SimTransport, TransportStats};

use std::time::Duration;

use slicewatch_sched::Delivery;

/// A relay between producer and consumer.
pub trait Transport: Send {
    /// Relay one delivery handed off at virtual time `sent_at`.
    ///
    /// Returns zero or more arrivals; a well-behaved transport returns
    /// exactly one.
    fn relay(&mut self, delivery: Delivery, sent_at: Duration) -> Result<Arrivals, TransportError>;

    /// Virtual time between consecutive hand-offs.
    fn pacing(&self) -> Duration {
        Duration::ZERO
    }

    /// Called once after the last delivery has been relayed.
    fn finish(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Relay a whole batch, starting at `start`, and return the arrivals
    /// in consumer order (arrival time, then sequence number).
    fn send(&mut self, outbound: Vec<Delivery>, start: Duration) -> Result<Vec<Arrival>, TransportError> {
        let mut arrivals = Vec::with_capacity(outbound.len());
        let mut sent_at = start;
        for delivery in outbound {
            arrivals.extend(self.relay(delivery, sent_at)?);
            sent_at += self.pacing();
        }
        self.finish()?;
        sort_arrivals(&mut arrivals);
        Ok(arrivals)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn relay(&mut self, delivery: Delivery, sent_at: Duration) -> Result<Arrivals, TransportError> {
        (**self).relay(delivery, sent_at)
    }

    fn pacing(&self) -> Duration {
        (**self).pacing()
    }

    fn finish(&mut self) -> Result<(), TransportError> {
        (**self).finish()
    }
}
