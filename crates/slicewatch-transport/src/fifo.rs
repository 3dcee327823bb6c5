//! Zero-delay, order-preserving transport.

use std::time::Duration;

use smallvec::smallvec;

use slicewatch_sched::Delivery;

use crate::arrival::{Arrival, Arrivals};
use crate::error::TransportError;
use crate::Transport;

/// Delivers everything immediately, ignoring scheduled delays.
///
/// Every arrival lands at its hand-off time, so consumer order equals
/// sequence order.
#[derive(Clone, Copy, Debug, Default)]
pub struct FifoTransport;

impl Transport for FifoTransport {
    fn relay(&mut self, delivery: Delivery, sent_at: Duration) -> Result<Arrivals, TransportError> {
        Ok(smallvec![Arrival::at(delivery, sent_at)])
    }
}
