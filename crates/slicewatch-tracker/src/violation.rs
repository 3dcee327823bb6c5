//! Aliasing violations found by the tracker.

use std::error::Error;
use std::fmt;

use slicewatch_core::{Actor, ByteRange, Stamp, StoreId, ViewId};

/// The class of aliasing hazard observed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViolationKind {
    /// A write overlapped a `ReadOnly` claim that was live at the time.
    ReadOnlyMutated,
    /// Two or more actors wrote the same `MutableShared` claim without
    /// synchronizing.
    UnsynchronizedWriters,
    /// A store reallocated in place while a `ReadOnly` claim over it was
    /// live.
    GrowthWithOutstandingReaders,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnlyMutated => write!(f, "read-only view mutated"),
            Self::UnsynchronizedWriters => write!(f, "unsynchronized writers"),
            Self::GrowthWithOutstandingReaders => {
                write!(f, "store grew with outstanding readers")
            }
        }
    }
}

/// An aliasing hazard: some actor changed bytes another actor was
/// entitled to see unchanged.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConcurrencyViolation {
    /// What went wrong.
    pub kind: ViolationKind,
    /// The store whose journal holds the offending event.
    pub store: StoreId,
    /// The claimed view the event violated.
    pub view: ViewId,
    /// Store-relative range of that view.
    pub view_range: ByteRange,
    /// Who held the violated claim.
    pub claimant: Actor,
    /// Store-relative range the offending event touched. For growth this
    /// is the grown region `[old_capacity, new_capacity)`.
    pub range: ByteRange,
    /// Who performed the offending mutation.
    pub actor: Actor,
    /// When the offending mutation happened.
    pub at: Stamp,
}

impl fmt::Display for ConcurrencyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} touched {} of {} at {} while {} held {} {}",
            self.kind,
            self.actor,
            self.range,
            self.store,
            self.at,
            self.claimant,
            self.view,
            self.view_range
        )
    }
}

impl Error for ConcurrencyViolation {}
