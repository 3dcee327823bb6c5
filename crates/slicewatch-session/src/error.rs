//! Session errors.

use std::error::Error;
use std::fmt;
use std::time::Duration;

use slicewatch_arena::ArenaError;
use slicewatch_core::SeqNo;
use slicewatch_sched::ScheduleError;
use slicewatch_tracker::ConcurrencyViolation;
use slicewatch_transport::TransportError;
use slicewatch_verify::VerifyError;

use crate::config::ConfigError;

/// Why a session did not verify. Every variant is terminal.
///
/// When several apply, the reported one follows
/// `TimedOut > ConcurrencyViolation > length errors > ContentMismatch`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// The configuration failed validation.
    Config(ConfigError),
    /// A view range was outside its payload.
    OutOfRange {
        /// Requested start offset.
        start: usize,
        /// Requested end offset (exclusive).
        end: usize,
        /// Length addressed.
        len: usize,
    },
    /// Any other arena failure (fixture I/O, chunk lookup).
    Arena(ArenaError),
    /// The scheduler failed.
    Schedule(ScheduleError),
    /// The transport failed.
    Transport(TransportError),
    /// The ownership check found an aliasing hazard.
    ConcurrencyViolation(ConcurrencyViolation),
    /// Fewer data bytes arrived than were sent.
    IncompleteTransfer {
        /// Payload length.
        expected: usize,
        /// Data bytes received.
        received: usize,
    },
    /// Duplicated, overlapping or surplus bytes arrived.
    DuplicateOrExtraBytes {
        /// Payload length.
        expected: usize,
        /// Data bytes received.
        received: usize,
        /// The offending delivery, when one is to blame.
        duplicate_seq: Option<SeqNo>,
    },
    /// Reassembled bytes differ from the payload.
    ContentMismatch {
        /// First differing offset.
        offset: usize,
        /// Payload byte.
        expected: u8,
        /// Received byte.
        actual: u8,
    },
    /// The stream did not complete by the deadline.
    TimedOut {
        /// The configured deadline.
        deadline: Duration,
        /// Data bytes received before the deadline.
        received: usize,
        /// Payload length.
        expected: usize,
    },
    /// The realtime producer thread panicked.
    ProducerPanicked,
    /// The realtime producer thread could not be spawned.
    ThreadSpawnFailed {
        /// The spawn error.
        reason: String,
    },
}

impl SessionError {
    /// Short stable name of the error kind, for reports and batch tallies.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config(_) => "config",
            Self::OutOfRange { .. } => "out-of-range",
            Self::Arena(_) => "arena",
            Self::Schedule(_) => "schedule",
            Self::Transport(_) => "transport",
            Self::ConcurrencyViolation(_) => "concurrency-violation",
            Self::IncompleteTransfer { .. } => "incomplete-transfer",
            Self::DuplicateOrExtraBytes { .. } => "duplicate-or-extra-bytes",
            Self::ContentMismatch { .. } => "content-mismatch",
            Self::TimedOut { .. } => "timed-out",
            Self::ProducerPanicked => "producer-panicked",
            Self::ThreadSpawnFailed { .. } => "thread-spawn-failed",
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "invalid config: {e}"),
            Self::OutOfRange { start, end, len } => {
                write!(f, "range [{start}, {end}) out of bounds for length {len}")
            }
            Self::Arena(e) => write!(f, "arena: {e}"),
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::ConcurrencyViolation(v) => write!(f, "concurrency violation: {v}"),
            Self::IncompleteTransfer { expected, received } => {
                write!(f, "incomplete transfer: {received} of {expected} bytes")
            }
            Self::DuplicateOrExtraBytes {
                expected,
                received,
                duplicate_seq,
            } => {
                write!(f, "duplicate or extra bytes: {received} for {expected}")?;
                if let Some(seq) = duplicate_seq {
                    write!(f, " (delivery #{seq})")?;
                }
                Ok(())
            }
            Self::ContentMismatch {
                offset,
                expected,
                actual,
            } => write!(
                f,
                "content mismatch at offset {offset}: expected {expected:#04x}, got {actual:#04x}"
            ),
            Self::TimedOut {
                deadline,
                received,
                expected,
            } => write!(
                f,
                "timed out after {deadline:?} with {received} of {expected} bytes"
            ),
            Self::ProducerPanicked => write!(f, "producer thread panicked"),
            Self::ThreadSpawnFailed { reason } => {
                write!(f, "failed to spawn producer thread: {reason}")
            }
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Arena(e) => Some(e),
            Self::Schedule(e) => Some(e),
            Self::Transport(e) => Some(e),
            Self::ConcurrencyViolation(v) => Some(v),
            _ => None,
        }
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<ArenaError> for SessionError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::OutOfRange { start, end, len } => Self::OutOfRange { start, end, len },
            other => Self::Arena(other),
        }
    }
}

impl From<ScheduleError> for SessionError {
    fn from(e: ScheduleError) -> Self {
        match e {
            ScheduleError::Arena(inner) => inner.into(),
            other => Self::Schedule(other),
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

impl From<ConcurrencyViolation> for SessionError {
    fn from(v: ConcurrencyViolation) -> Self {
        Self::ConcurrencyViolation(v)
    }
}

impl From<VerifyError> for SessionError {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::IncompleteTransfer { expected, received } => {
                Self::IncompleteTransfer { expected, received }
            }
            VerifyError::DuplicateOrExtraBytes {
                expected,
                received,
                duplicate_seq,
            } => Self::DuplicateOrExtraBytes {
                expected,
                received,
                duplicate_seq,
            },
            VerifyError::ContentMismatch {
                offset,
                expected,
                actual,
            } => Self::ContentMismatch {
                offset,
                expected,
                actual,
            },
        }
    }
}
