//! Session-wide logical clock.
//!
//! Every event that matters to the ownership check (view issue, claim,
//! release, write, growth) takes a [`Stamp`] from the same [`LogicalClock`].
//! Stamps totally order those events within a session regardless of
//! which thread produced them.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A point on the logical clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Stamp(pub u64);

impl Stamp {
    /// The stamp before any event has happened.
    pub const ZERO: Stamp = Stamp(0);
}

impl fmt::Display for Stamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "t{}", self.0)
    }
}

/// Monotonic counter handing out [`Stamp`]s.
#[derive(Debug, Default)]
pub struct LogicalClock {
    now: AtomicU64,
}

/// A clock shared between the arena, its stores and the tracker.
pub type SharedClock = Arc<LogicalClock>;

// Compile-time assertion: LogicalClock must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<LogicalClock>();
};

impl LogicalClock {
    /// Create a clock at [`Stamp::ZERO`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a clock already wrapped for sharing.
    pub fn shared() -> SharedClock {
        Arc::new(Self::new())
    }

    /// Advance the clock and return the new stamp.
    pub fn tick(&self) -> Stamp {
        Stamp(self.now.fetch_add(1, Ordering::AcqRel) + 1)
    }

    /// The most recently issued stamp.
    pub fn now(&self) -> Stamp {
        Stamp(self.now.load(Ordering::Acquire))
    }
}
