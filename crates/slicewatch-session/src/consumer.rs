//! The receiving side of a session.

use std::time::Duration;

use slicewatch_core::{AccessMode, Actor};
use slicewatch_sched::Delivery;
use slicewatch_tracker::OwnershipTracker;

/// Collects arrivals, claiming each received view read-only.
pub(crate) struct Consumer<'a> {
    tracker: &'a OwnershipTracker,
    received: Vec<Delivery>,
    data_bytes: usize,
}

impl<'a> Consumer<'a> {
    pub(crate) fn new(tracker: &'a OwnershipTracker) -> Self {
        Self {
            tracker,
            received: Vec::new(),
            data_bytes: 0,
        }
    }

    pub(crate) fn receive(&mut self, delivery: Delivery) {
        self.tracker
            .tag_as(&delivery.view, Actor::Consumer, AccessMode::ReadOnly);
        if !delivery.is_marker() {
            self.data_bytes += delivery.len();
        }
        tracing::trace!(seq = %delivery.seq, view = %delivery.view.id(), "received");
        self.received.push(delivery);
    }

    pub(crate) fn data_bytes(&self) -> usize {
        self.data_bytes
    }

    pub(crate) fn finish(self, sent: usize, timed_out: bool, elapsed: Duration) -> Streamed {
        Streamed {
            data_bytes: self.data_bytes,
            received: self.received,
            sent,
            timed_out,
            elapsed,
        }
    }
}

/// What a runner hands back once the stream has ended.
pub(crate) struct Streamed {
    /// Deliveries in the order the consumer received them, markers included.
    pub(crate) received: Vec<Delivery>,
    /// Data bytes received.
    pub(crate) data_bytes: usize,
    /// Deliveries handed to the transport.
    pub(crate) sent: usize,
    /// Whether the deadline passed first.
    pub(crate) timed_out: bool,
    /// Virtual or wall time from the first hand-off to the end.
    pub(crate) elapsed: Duration,
}
