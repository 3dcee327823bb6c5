//! Per-session results.

use std::fmt;
use std::time::Duration;

use slicewatch_arena::ArenaStats;
use slicewatch_core::SessionId;
use slicewatch_tracker::ConcurrencyViolation;
use slicewatch_verify::Verdict;

use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::state::SessionState;

/// Everything known about a finished session.
///
/// The full configuration, seed included, is part of the report so a
/// failure can be rerun exactly.
#[derive(Clone, Debug)]
pub struct SessionReport {
    /// Which session.
    pub session: SessionId,
    /// The configuration it ran with.
    pub config: SessionConfig,
    /// States visited, starting with `Created`.
    pub history: Vec<SessionState>,
    /// The verdict, or the error that decided the session.
    pub outcome: Result<Verdict, SessionError>,
    /// Payload length.
    pub bytes_expected: usize,
    /// Data bytes the consumer received.
    pub bytes_received: usize,
    /// Data deliveries scheduled.
    pub deliveries: usize,
    /// Marker deliveries scheduled.
    pub markers: usize,
    /// Deliveries handed to the transport.
    pub sent: usize,
    /// Deliveries the consumer received, markers included.
    pub received: usize,
    /// Every ownership violation found, not only the reported one.
    pub violations: Vec<ConcurrencyViolation>,
    /// Arena counters at the end of the run.
    pub arena: ArenaStats,
    /// Virtual (lockstep) or wall (realtime) stream duration.
    pub elapsed: Duration,
}

impl SessionReport {
    /// The final state.
    pub fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or_default()
    }

    /// Whether the session verified.
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The deciding error, if any.
    pub fn error(&self) -> Option<&SessionError> {
        self.outcome.as_ref().err()
    }

    /// Consume the report, keeping only the outcome.
    pub fn into_result(self) -> Result<Verdict, SessionError> {
        self.outcome
    }
}

impl fmt::Display for SessionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {}/{} bytes, {} deliveries ({} markers), {:?}",
            self.session,
            self.state(),
            self.bytes_received,
            self.bytes_expected,
            self.deliveries,
            self.markers,
            self.elapsed
        )?;
        if let Err(e) = &self.outcome {
            write!(f, "; {} ({e})", e.kind())?;
        }
        write!(f, "; config {:?}", self.config)
    }
}
