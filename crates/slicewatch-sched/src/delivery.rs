//! Scheduled deliveries.

use std::fmt;
use std::time::Duration;

use slicewatch_arena::View;
use slicewatch_core::SeqNo;

/// What a delivery carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryKind {
    /// Payload bytes starting at `offset` in the logical payload.
    Data {
        /// Payload-relative offset of the view's first byte.
        offset: usize,
    },
    /// A 1-byte synchronization marker; never part of the payload.
    Marker,
}

/// A view scheduled with a delay and a sequence number.
#[derive(Clone, Debug)]
pub struct Delivery {
    /// Creation-order sequence number, unique within a schedule.
    pub seq: SeqNo,
    /// The bytes to deliver.
    pub view: View,
    /// Injected delay between hand-off and arrival.
    pub delay: Duration,
    /// Data slice or marker.
    pub kind: DeliveryKind,
}

impl Delivery {
    /// Whether this is a marker delivery.
    pub fn is_marker(&self) -> bool {
        matches!(self.kind, DeliveryKind::Marker)
    }

    /// Payload offset of a data delivery.
    pub fn offset(&self) -> Option<usize> {
        match self.kind {
            DeliveryKind::Data { offset } => Some(offset),
            DeliveryKind::Marker => None,
        }
    }

    /// Bytes carried.
    pub fn len(&self) -> usize {
        self.view.len()
    }

    /// Whether the delivery carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.view.is_empty()
    }
}

impl fmt::Display for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DeliveryKind::Data { offset } => write!(
                f,
                "#{} data@{offset} len={} delay={:?}",
                self.seq,
                self.len(),
                self.delay
            ),
            DeliveryKind::Marker => write!(f, "#{} marker delay={:?}", self.seq, self.delay),
        }
    }
}
