//! Arrivals: deliveries paired with their virtual arrival time.

use std::path::Path;
use std::time::Duration;

use smallvec::SmallVec;

use slicewatch_arena::{fixture, ArenaError};
use slicewatch_sched::Delivery;

/// What one relay produced. Usually a single arrival.
pub type Arrivals = SmallVec<[Arrival; 1]>;

/// A delivery as seen by the consumer.
#[derive(Clone, Debug)]
pub struct Arrival {
    /// The relayed delivery. Its view may differ from the one handed off
    /// if the transport copied before writing.
    pub delivery: Delivery,
    /// Virtual arrival time, or `None` if it never arrives.
    pub at: Option<Duration>,
}

impl Arrival {
    /// An arrival at `at`.
    pub fn at(delivery: Delivery, at: Duration) -> Self {
        Self {
            delivery,
            at: Some(at),
        }
    }

    /// A delivery that never arrives.
    pub fn never(delivery: Delivery) -> Self {
        Self { delivery, at: None }
    }

    /// Whether this arrival never happens.
    pub fn is_never(&self) -> bool {
        self.at.is_none()
    }
}

/// Sort into consumer order: arrival time, then sequence number. Arrivals
/// that never happen go last.
pub fn sort_arrivals(arrivals: &mut [Arrival]) {
    arrivals.sort_by_key(|a| (a.at.is_none(), a.at, a.delivery.seq));
}

/// Write the data bytes of `arrivals` to `path` in the given order.
///
/// Markers and arrivals that never happen are skipped. Returns the number
/// of bytes written.
pub fn write_received(path: impl AsRef<Path>, arrivals: &[Arrival]) -> Result<u64, ArenaError> {
    fixture::write_views(
        path,
        arrivals
            .iter()
            .filter(|a| !a.is_never() && !a.delivery.is_marker())
            .map(|a| &a.delivery.view),
    )
}
