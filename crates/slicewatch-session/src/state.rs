//! Session lifecycle.

use std::fmt;

/// Where a session is in its lifecycle.
///
/// ```text
/// Created ──first hand-off──▶ Streaming ──▶ Verified | Failed | TimedOut
///    └──────── empty stream or setup error ──▶ Verified | Failed
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Configured, nothing sent.
    #[default]
    Created,
    /// At least one delivery has been handed to the transport.
    Streaming,
    /// The stream completed, the ownership check passed and every byte
    /// matched.
    Verified,
    /// The stream completed (or could not start) and some check failed.
    Failed,
    /// The stream did not complete by the deadline.
    TimedOut,
}

impl SessionState {
    /// Whether no further transition is possible.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Failed | Self::TimedOut)
    }

    /// Whether `self → to` is a legal transition.
    pub fn can_transition(self, to: SessionState) -> bool {
        matches!(
            (self, to),
            (Self::Created, Self::Streaming)
                | (Self::Created, Self::Verified)
                | (Self::Created, Self::Failed)
                | (Self::Streaming, Self::Verified)
                | (Self::Streaming, Self::Failed)
                | (Self::Streaming, Self::TimedOut)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Streaming => "streaming",
            Self::Verified => "verified",
            Self::Failed => "failed",
            Self::TimedOut => "timed-out",
        };
        f.write_str(s)
    }
}
