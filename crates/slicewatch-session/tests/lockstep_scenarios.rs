//! Integration test: the known aliasing failures and their mitigations,
//! run deterministically on the virtual clock.
//!
//! Each scenario comes from `slicewatch_test_utils::scenarios`; the tests
//! flip one mitigation at a time and check which error decides the run.

use std::time::Duration;

use slicewatch_core::{AccessMode, Actor, ByteRange, SeqNo};
use slicewatch_sched::JitterRange;
use slicewatch_session::{Session, SessionConfig, SessionError, SessionReport, SessionState};
use slicewatch_test_utils::{init_tracing, scenarios, RecordingTransport, ReverseTransport};
use slicewatch_tracker::ViolationKind;
use slicewatch_transport::{Fault, FifoTransport, SimConfig, SimTransport};
use slicewatch_verify::ReassemblyOrder;

fn run(config: SessionConfig, sim: SimConfig) -> SessionReport {
    init_tracing();
    Session::new(config)
        .unwrap()
        .run(&mut SimTransport::new(sim))
}

// ── Baseline ─────────────────────────────────────────────────────────

#[test]
fn three_small_chunks_verify() {
    let (config, sim) = scenarios::small_ok(42);
    let report = run(config, sim);
    assert!(report.is_ok(), "{report}");
    assert_eq!(report.state(), SessionState::Verified);
    let verdict = report.outcome.as_ref().unwrap();
    assert!(verdict.ok);
    assert_eq!(verdict.bytes_checked, 1920);
    assert_eq!(verdict.expected_hash, verdict.actual_hash);
    assert_eq!(report.received, 3);
}

#[test]
fn default_reproduction_case_verifies_without_faults() {
    let report = run(SessionConfig::new(1), SimConfig::default());
    assert!(report.is_ok(), "{report}");
    assert_eq!(report.bytes_expected, 192_000);
    assert_eq!(report.deliveries, 48);
    // Virtual time: the last hand-off plus at most the largest delay.
    assert!(report.elapsed <= Duration::from_millis(47 + 300));
}

#[test]
fn same_seed_same_outcome() {
    let a = run(scenarios::growth().0, scenarios::growth().1);
    let b = run(scenarios::growth().0, scenarios::growth().1);
    assert_eq!(a.outcome, b.outcome);
    assert_eq!(a.violations, b.violations);
    assert_eq!(a.arena, b.arena);

    let (config, sim) = scenarios::small_ok(9);
    let a = run(config.clone(), sim.clone());
    let b = run(config, sim);
    assert_eq!(a.outcome, b.outcome);
    assert_eq!(a.elapsed, b.elapsed);
}

#[test]
fn markers_are_not_data() {
    let (mut config, sim) = scenarios::small_ok(4);
    config.interleave_markers = true;
    let report = run(config, sim);
    assert!(report.is_ok(), "{report}");
    assert_eq!(report.deliveries, 3);
    assert!(report.markers >= 2);
    assert_eq!(report.bytes_received, 1920);
    assert_eq!(report.received, report.deliveries + report.markers);
}

// ── Growth with outstanding readers ──────────────────────────────────

#[test]
fn growth_under_readers_is_a_violation() {
    let (config, sim) = scenarios::growth();
    let report = run(config, sim);
    assert_eq!(report.state(), SessionState::Failed);

    let Some(SessionError::ConcurrencyViolation(v)) = report.error() else {
        panic!("expected a concurrency violation, got {report}");
    };
    assert_eq!(v.kind, ViolationKind::GrowthWithOutstandingReaders);
    assert_eq!(v.actor, Actor::Transport);
    assert_eq!(v.claimant, Actor::Consumer);
    assert_eq!(v.range, ByteRange { start: 64_000, end: 128_000 });
    assert_eq!(report.arena.in_place_growths, 1);
}

#[test]
fn growth_is_harmless_with_copy_on_view() {
    let (mut config, sim) = scenarios::growth();
    config.copy_on_view = true;
    let report = run(config, sim);
    assert!(report.is_ok(), "{report}");
    assert!(report.violations.is_empty());
    assert!(report.arena.bytes_copied >= scenarios::GROWTH_STORE_LEN as u64);
}

#[test]
fn growth_is_harmless_with_copy_on_grow() {
    let (mut config, sim) = scenarios::growth();
    config.copy_on_grow = true;
    let report = run(config, sim);
    assert!(report.is_ok(), "{report}");
    assert_eq!(report.arena.forks, 1);
    assert_eq!(report.arena.in_place_growths, 0);
}

#[test]
fn growth_is_harmless_with_read_only_views() {
    let (mut config, sim) = scenarios::growth();
    config.view_mode = AccessMode::ReadOnly;
    let report = run(config, sim);
    assert!(report.is_ok(), "{report}");
}

// ── Write-through ────────────────────────────────────────────────────

#[test]
fn write_through_on_shared_views_never_passes() {
    let (config, sim) = scenarios::write_through();
    let report = run(config, sim);
    assert!(!report.is_ok());
    match report.error() {
        Some(SessionError::ContentMismatch { offset, actual, .. }) => {
            assert!((12_000..16_000).contains(offset), "offset {offset}");
            assert_eq!(*actual, SimConfig::DEFAULT_FILLER);
        }
        Some(SessionError::ConcurrencyViolation(_)) => {}
        other => panic!("unexpected outcome {other:?}"),
    }
}

#[test]
fn write_through_on_read_only_views_is_copied_first() {
    let (mut config, sim) = scenarios::write_through();
    config.view_mode = AccessMode::ReadOnly;
    let report = run(config, sim);
    assert!(report.is_ok(), "{report}");
}

#[test]
fn careless_transport_breaks_read_only_views() {
    let (mut config, mut sim) = scenarios::write_through();
    config.view_mode = AccessMode::ReadOnly;
    sim.respect_read_only = false;
    let report = run(config, sim);
    let Some(SessionError::ConcurrencyViolation(v)) = report.error() else {
        panic!("expected a concurrency violation, got {report}");
    };
    assert_eq!(v.kind, ViolationKind::ReadOnlyMutated);
    assert_eq!(v.range, ByteRange { start: 12_000, end: 16_000 });
}

// ── Stalls, drops, duplicates ────────────────────────────────────────

#[test]
fn stall_times_out() {
    let (config, sim) = scenarios::stall();
    let report = run(config, sim);
    assert_eq!(report.state(), SessionState::TimedOut);
    assert_eq!(
        report.error(),
        Some(&SessionError::TimedOut {
            deadline: Duration::from_secs(120),
            received: scenarios::STALL_AFTER_BYTES,
            expected: scenarios::STALL_PAYLOAD_LEN,
        })
    );
    assert_eq!(report.bytes_received, 90_000);
    assert_eq!(report.elapsed, Duration::from_secs(120));
    assert_eq!(
        report.sent,
        scenarios::STALL_PAYLOAD_LEN / scenarios::STALL_SLICE_SIZE
    );
}

#[test]
fn stall_timeout_outranks_recording_failure() {
    let (mut config, sim) = scenarios::stall();
    config.record_to = Some("/nonexistent/slicewatch/recording.bin".into());
    let report = run(config, sim);
    assert_eq!(report.state(), SessionState::TimedOut);
    assert_eq!(report.error().map(SessionError::kind), Some("timed-out"));
}

#[test]
fn stall_timeout_outranks_concurrent_growth() {
    let (config, mut sim) = scenarios::stall();
    sim.faults.push(Fault::GrowBacking {
        at: SeqNo(5),
        additional: 10,
    });
    let report = run(config.with_jitter(JitterRange::none()), sim);
    assert!(!report.violations.is_empty());
    assert_eq!(report.error().map(SessionError::kind), Some("timed-out"));
}

#[test]
fn duplicate_is_detected() {
    let (config, sim) = scenarios::small_ok(8);
    let report = run(config, sim.with_fault(Fault::Duplicate { at: SeqNo(1) }));
    assert_eq!(
        report.error(),
        Some(&SessionError::DuplicateOrExtraBytes {
            expected: 1920,
            received: 2560,
            duplicate_seq: Some(SeqNo(1)),
        })
    );
}

#[test]
fn drop_is_incomplete_not_timed_out() {
    let (config, sim) = scenarios::small_ok(8);
    let report = run(config, sim.with_fault(Fault::Drop { at: SeqNo(2) }));
    assert_eq!(report.state(), SessionState::Failed);
    assert_eq!(
        report.error(),
        Some(&SessionError::IncompleteTransfer {
            expected: 1920,
            received: 1280,
        })
    );
}

// ── Ordering ─────────────────────────────────────────────────────────

#[test]
fn fifo_with_arrival_reassembly_verifies() {
    let mut config = SessionConfig::new(21).with_chunks(2, 3000).with_slice_size(700);
    config.reassembly = ReassemblyOrder::Arrival;
    let mut transport = RecordingTransport::new(FifoTransport);
    let report = Session::new(config).unwrap().run(&mut transport);
    assert!(report.is_ok(), "{report}");
    let relayed = transport.relayed();
    assert_eq!(relayed.len(), report.deliveries);
    assert!(relayed.windows(2).all(|w| w[0] < w[1]));
}

#[test]
fn reversed_arrivals_need_offset_reassembly() {
    let config = SessionConfig::new(22).with_chunks(2, 3000).with_slice_size(700);
    let horizon = Duration::from_secs(1);

    let report = Session::new(config.clone())
        .unwrap()
        .run(&mut ReverseTransport::new(horizon));
    assert!(report.is_ok(), "{report}");

    let mut by_arrival = config;
    by_arrival.reassembly = ReassemblyOrder::Arrival;
    let report = Session::new(by_arrival)
        .unwrap()
        .run(&mut ReverseTransport::new(horizon));
    assert_eq!(report.error().map(SessionError::kind), Some("content-mismatch"));
}

// ── Fixtures ─────────────────────────────────────────────────────────

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!(
        "slicewatch-session-{}-{name}",
        std::process::id()
    ))
}

#[test]
fn received_bytes_are_recorded() {
    let path = temp_path("recorded.bin");
    let mut config = SessionConfig::new(0).with_chunks(2, 1000).with_slice_size(300);
    config.fill = slicewatch_arena::FillMode::Pattern;
    config.record_to = Some(path.clone());
    let report = Session::new(config).unwrap().run(&mut FifoTransport);
    assert!(report.is_ok(), "{report}");

    let written = std::fs::read(&path).unwrap();
    let expected: Vec<u8> = (0..2000).map(|i| (i % 251) as u8).collect();
    assert_eq!(written, expected);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn fixture_payload_streams() {
    let path = temp_path("fixture.bin");
    std::fs::write(&path, vec![0x5Au8; 10_000]).unwrap();
    let mut config = SessionConfig::new(5).with_slice_size(4000);
    config.payload = slicewatch_session::PayloadSource::Fixture(path.clone());
    let report = Session::new(config).unwrap().run(&mut FifoTransport);
    assert!(report.is_ok(), "{report}");
    assert_eq!(report.bytes_expected, 10_000);
    assert_eq!(report.deliveries, 3);
    let _ = std::fs::remove_file(&path);
}
