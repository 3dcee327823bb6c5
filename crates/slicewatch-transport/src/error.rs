//! Transport errors.

use std::error::Error;
use std::fmt;

use slicewatch_arena::ArenaError;

use crate::sim::Fault;

/// Errors raised while relaying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportError {
    /// A store mutation failed.
    Arena(ArenaError),
    /// A fault targeted a sequence number that was never relayed.
    FaultOutOfRange {
        /// The fault that never fired.
        fault: Fault,
        /// Deliveries relayed in total.
        relayed: u64,
    },
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::FaultOutOfRange { fault, relayed } => {
                write!(f, "fault {fault:?} never fired ({relayed} deliveries relayed)")
            }
        }
    }
}

impl Error for TransportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Arena(e) => Some(e),
            Self::FaultOutOfRange { .. } => None,
        }
    }
}

impl From<ArenaError> for TransportError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
