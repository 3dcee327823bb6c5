//! One end-to-end run.
//!
//! A [`Session`] is created from a validated [`SessionConfig`] and consumed
//! by [`Session::run`]; it is never reused. A run:
//!
//! 1. allocates the payload in a fresh arena on a fresh logical clock,
//! 2. slices it, tagging each view with the producer's claim,
//! 3. streams the deliveries through the transport (lockstep or realtime),
//!    the consumer claiming every received view read-only,
//! 4. checks ownership, then verifies the reassembled bytes.
//!
//! The deciding error follows
//! `TimedOut > ConcurrencyViolation > length errors > ContentMismatch`.

use std::time::Duration;

use slicewatch_arena::{fixture, BufferArena, Payload};
use slicewatch_core::{LogicalClock, SessionId};
use slicewatch_sched::{schedule, Delivery};
use slicewatch_tracker::{ConcurrencyViolation, OwnershipTracker};
use slicewatch_transport::Transport;
use slicewatch_verify::{verify_with, Verdict, VerifyError};

use crate::config::{ConfigError, ExecutionMode, PayloadSource, SessionConfig};
use crate::error::SessionError;
use crate::report::SessionReport;
use crate::state::SessionState;
use crate::{lockstep, realtime};

/// A configured, not yet run session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    config: SessionConfig,
    history: Vec<SessionState>,
}

/// Counters gathered while running, folded into the report.
#[derive(Default)]
struct Tally {
    bytes_expected: usize,
    bytes_received: usize,
    deliveries: usize,
    markers: usize,
    sent: usize,
    received: usize,
    elapsed: Duration,
}

impl Session {
    /// Validate `config` and create a session.
    pub fn new(config: SessionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            id: SessionId::next(),
            config,
            history: vec![SessionState::Created],
        })
    }

    /// This session's ID.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Current state. Always `Created` before [`run`](Self::run).
    pub fn state(&self) -> SessionState {
        self.history.last().copied().unwrap_or_default()
    }

    fn advance(history: &mut Vec<SessionState>, session: SessionId, to: SessionState) {
        let from = history.last().copied().unwrap_or_default();
        if !from.can_transition(to) {
            tracing::error!(%session, %from, %to, "illegal session transition");
        }
        tracing::debug!(%session, %from, %to, "session state");
        history.push(to);
    }

    /// Stream the payload through `transport` and report the outcome.
    pub fn run<T: Transport + ?Sized>(mut self, transport: &mut T) -> SessionReport {
        let clock = LogicalClock::shared();
        let mut arena = BufferArena::new(self.config.arena_config(), clock.clone());
        let tracker = OwnershipTracker::new(clock);
        let mut tally = Tally::default();

        tracing::debug!(
            session = %self.id, seed = self.config.seed, mode = ?self.config.mode,
            "session start"
        );
        let outcome = self.execute(&mut arena, &tracker, transport, &mut tally);
        let violations = tracker.violations();
        let outcome = outcome.and_then(|streamed| {
            decide(streamed, &violations, self.config.deadline, &tally)
        });

        let end = match &outcome {
            Ok(_) => SessionState::Verified,
            Err(SessionError::TimedOut { .. }) => SessionState::TimedOut,
            Err(_) => SessionState::Failed,
        };
        Self::advance(&mut self.history, self.id, end);

        match &outcome {
            Ok(verdict) => tracing::debug!(
                session = %self.id, bytes = verdict.bytes_checked, "session verified"
            ),
            Err(e) => tracing::warn!(
                session = %self.id, seed = self.config.seed, kind = e.kind(), error = %e,
                "session failed"
            ),
        }

        SessionReport {
            session: self.id,
            config: self.config,
            history: self.history,
            outcome,
            bytes_expected: tally.bytes_expected,
            bytes_received: tally.bytes_received,
            deliveries: tally.deliveries,
            markers: tally.markers,
            sent: tally.sent,
            received: tally.received,
            violations,
            arena: arena.stats(),
            elapsed: tally.elapsed,
        }
    }

    fn execute<T: Transport + ?Sized>(
        &mut self,
        arena: &mut BufferArena,
        tracker: &OwnershipTracker,
        transport: &mut T,
        tally: &mut Tally,
    ) -> Result<Outcome, SessionError> {
        let payload = self.allocate(arena)?;
        tally.bytes_expected = payload.len();

        let outbound: Vec<Delivery> = schedule(arena, &payload, &self.config.schedule_config())?
            .with_tracker(tracker)
            .collect::<Result<_, _>>()?;
        tally.markers = outbound.iter().filter(|d| d.is_marker()).count();
        tally.deliveries = outbound.len() - tally.markers;

        let (id, deadline) = (self.id, self.config.deadline);
        let history = &mut self.history;
        let on_first_send = || Self::advance(history, id, SessionState::Streaming);
        let streamed = match self.config.mode {
            ExecutionMode::Lockstep => {
                lockstep::run(id, outbound, transport, tracker, deadline, on_first_send)?
            }
            ExecutionMode::Realtime => realtime::run(
                id,
                outbound,
                transport,
                tracker,
                deadline,
                self.config.channel_capacity,
                on_first_send,
            )?,
        };
        tally.bytes_received = streamed.data_bytes;
        tally.sent = streamed.sent;
        tally.received = streamed.received.len();
        tally.elapsed = streamed.elapsed;

        let recorded = match &self.config.record_to {
            Some(path) => {
                let views = streamed
                    .received
                    .iter()
                    .filter(|d| !d.is_marker())
                    .map(|d| &d.view);
                fixture::write_views(path, views)
            }
            None => Ok(0),
        };

        if streamed.timed_out {
            if let Err(e) = recorded {
                tracing::warn!(session = %id, error = %e, "recording after timeout failed");
            }
            return Ok(Outcome::TimedOut);
        }
        recorded?;
        Ok(Outcome::Completed(verify_with(
            payload.bytes(),
            &streamed.received,
            self.config.reassembly,
        )))
    }

    fn allocate(&self, arena: &mut BufferArena) -> Result<Payload, SessionError> {
        Ok(match &self.config.payload {
            PayloadSource::Generated {
                chunk_count,
                chunk_len,
            } => arena.allocate_chunked(*chunk_count, *chunk_len),
            PayloadSource::Fixture(path) => arena.from_bytes(fixture::read_all(path)?),
        })
    }
}

/// How the stream ended.
enum Outcome {
    TimedOut,
    Completed(Result<Verdict, VerifyError>),
}

/// Apply error precedence to a completed stream.
fn decide(
    outcome: Outcome,
    violations: &[ConcurrencyViolation],
    deadline: Duration,
    tally: &Tally,
) -> Result<Verdict, SessionError> {
    let verified = match outcome {
        Outcome::TimedOut => {
            return Err(SessionError::TimedOut {
                deadline,
                received: tally.bytes_received,
                expected: tally.bytes_expected,
            })
        }
        Outcome::Completed(verified) => verified,
    };
    if let Some(v) = violations.first() {
        return Err(v.clone().into());
    }
    Ok(verified?.into_result()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicewatch_core::SeqNo;
    use slicewatch_sched::JitterRange;
    use slicewatch_transport::{Fault, FifoTransport, SimConfig, SimTransport};

    fn small(seed: u64) -> SessionConfig {
        SessionConfig::new(seed)
            .with_chunks(3, 640)
            .with_slice_size(640)
            .with_jitter(JitterRange::new(1, 5))
    }

    #[test]
    fn new_rejects_invalid_config() {
        let err = Session::new(SessionConfig::new(1).with_slice_size(0)).unwrap_err();
        assert!(matches!(err, ConfigError::Schedule(_)));
    }

    #[test]
    fn fresh_session_is_created() {
        let s = Session::new(small(1)).unwrap();
        assert_eq!(s.state(), SessionState::Created);
        assert_eq!(s.config().seed, 1);
    }

    #[test]
    fn verified_session_passes_through_streaming() {
        let report = Session::new(small(42))
            .unwrap()
            .run(&mut SimTransport::new(SimConfig::default()));
        assert!(report.is_ok(), "{report}");
        assert_eq!(
            report.history,
            vec![
                SessionState::Created,
                SessionState::Streaming,
                SessionState::Verified
            ]
        );
        assert_eq!(report.bytes_expected, 1920);
        assert_eq!(report.bytes_received, 1920);
        assert_eq!(report.deliveries, 3);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn empty_payload_verifies_without_streaming() {
        let report = Session::new(SessionConfig::new(3).with_chunks(0, 0))
            .unwrap()
            .run(&mut FifoTransport);
        assert!(report.is_ok());
        assert_eq!(
            report.history,
            vec![SessionState::Created, SessionState::Verified]
        );
        assert_eq!(report.sent, 0);
    }

    #[test]
    fn transport_error_fails_session() {
        let sim = SimConfig::default().with_fault(Fault::Drop { at: SeqNo(999) });
        let report = Session::new(small(5)).unwrap().run(&mut SimTransport::new(sim));
        assert_eq!(report.state(), SessionState::Failed);
        assert_eq!(report.error().map(SessionError::kind), Some("transport"));
    }

    #[test]
    fn missing_fixture_fails_before_streaming() {
        let mut config = SessionConfig::new(9);
        config.payload = PayloadSource::Fixture("/nonexistent/slicewatch/fixture.bin".into());
        let report = Session::new(config).unwrap().run(&mut FifoTransport);
        assert_eq!(
            report.history,
            vec![SessionState::Created, SessionState::Failed]
        );
        assert_eq!(report.error().map(SessionError::kind), Some("arena"));
    }

    #[test]
    fn timeout_outranks_violation() {
        let outcome = Outcome::TimedOut;
        let tally = Tally {
            bytes_expected: 10,
            bytes_received: 4,
            ..Tally::default()
        };
        let violation = ConcurrencyViolation {
            kind: slicewatch_tracker::ViolationKind::GrowthWithOutstandingReaders,
            store: slicewatch_core::StoreId(0),
            view: slicewatch_core::ViewId(0),
            view_range: slicewatch_core::ByteRange { start: 0, end: 4 },
            claimant: slicewatch_core::Actor::Consumer,
            range: slicewatch_core::ByteRange { start: 10, end: 20 },
            actor: slicewatch_core::Actor::Transport,
            at: slicewatch_core::Stamp(3),
        };
        let err = decide(outcome, &[violation], Duration::from_secs(1), &tally).unwrap_err();
        assert_eq!(
            err,
            SessionError::TimedOut {
                deadline: Duration::from_secs(1),
                received: 4,
                expected: 10
            }
        );
    }
}
