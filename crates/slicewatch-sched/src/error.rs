//! Scheduler errors.

use std::error::Error;
use std::fmt;

use slicewatch_arena::ArenaError;

/// Errors from building or running a schedule.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ScheduleError {
    /// `slice_size` was zero.
    ZeroSliceSize,
    /// `jitter.min_ms > jitter.max_ms`.
    InvalidJitter {
        /// Configured lower bound.
        min_ms: u64,
        /// Configured upper bound.
        max_ms: u64,
    },
    /// The arena refused to issue a view.
    Arena(ArenaError),
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSliceSize => write!(f, "slice size must be non-zero"),
            Self::InvalidJitter { min_ms, max_ms } => {
                write!(f, "jitter minimum {min_ms}ms exceeds maximum {max_ms}ms")
            }
            Self::Arena(e) => write!(f, "arena: {e}"),
        }
    }
}

impl Error for ScheduleError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ArenaError> for ScheduleError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
