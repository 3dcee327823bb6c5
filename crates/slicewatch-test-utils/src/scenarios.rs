//! Canned sessions.
//!
//! Each scenario returns the session config and the transport config that
//! go together. Tests tweak the returned values (copy-on-view, read-only
//! views, realtime mode) to show which mitigation fixes what.

use std::time::Duration;

use slicewatch_core::SeqNo;
use slicewatch_sched::JitterRange;
use slicewatch_session::SessionConfig;
use slicewatch_transport::{Fault, SimConfig};

/// Bytes in the single store of the growth and write-through scenarios.
pub const GROWTH_STORE_LEN: usize = 64_000;
/// Sequence number the growth fault fires on.
pub const GROWTH_AT: SeqNo = SeqNo(8);
/// Payload length of the stall scenario.
pub const STALL_PAYLOAD_LEN: usize = 96_000;
/// Data bytes that still arrive in the stall scenario.
pub const STALL_AFTER_BYTES: usize = 90_000;
/// Slice size of the stall scenario. Divides both byte counts.
pub const STALL_SLICE_SIZE: usize = 3000;

/// Three 640-byte chunks, one slice each. Verifies under any order.
pub fn small_ok(seed: u64) -> (SessionConfig, SimConfig) {
    let config = SessionConfig::new(seed)
        .with_chunks(3, 640)
        .with_slice_size(640);
    (config, SimConfig::default())
}

/// One 64000-byte store sliced by 4000; the transport doubles the store
/// while relaying delivery #8.
///
/// Zero jitter makes every earlier slice arrive, and be claimed by the
/// consumer, before the growth.
pub fn growth() -> (SessionConfig, SimConfig) {
    let config = SessionConfig::new(7)
        .with_chunks(1, GROWTH_STORE_LEN)
        .with_slice_size(4000)
        .with_jitter(JitterRange::none());
    let sim = SimConfig::default().with_fault(Fault::GrowBacking {
        at: GROWTH_AT,
        additional: GROWTH_STORE_LEN,
    });
    (config, sim)
}

/// One 64000-byte store; the transport writes a full slice of filler
/// past the end of delivery #2, clobbering delivery #3.
pub fn write_through() -> (SessionConfig, SimConfig) {
    let config = SessionConfig::new(11)
        .with_chunks(1, GROWTH_STORE_LEN)
        .with_slice_size(4000)
        .with_jitter(JitterRange::none());
    let sim = SimConfig::default().with_fault(Fault::WriteThrough {
        at: SeqNo(2),
        len: 4000,
    });
    (config, sim)
}

/// 96000 bytes sliced by 3000; the transport stops delivering after
/// exactly 90000.
pub fn stall() -> (SessionConfig, SimConfig) {
    let config = SessionConfig::new(3)
        .with_chunks(1, STALL_PAYLOAD_LEN)
        .with_slice_size(STALL_SLICE_SIZE);
    let sim = SimConfig::default().with_fault(Fault::Stall {
        after_bytes: STALL_AFTER_BYTES,
    });
    (config, sim)
}

/// The stall scenario under a wall-clock deadline short enough for tests.
pub fn stall_realtime(deadline: Duration) -> (SessionConfig, SimConfig) {
    let (mut config, sim) = stall();
    config.mode = slicewatch_session::ExecutionMode::Realtime;
    config.jitter = JitterRange::none();
    config.deadline = deadline;
    (config, sim)
}
