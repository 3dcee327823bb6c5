//! Benchmark profiles for the slicewatch harness.
//!
//! - [`reference_profile`]: the 3 × 64000-byte reproduction payload with
//!   default slicing and jitter.
//! - [`stress_profile`]: 16 × 1 MiB chunks with markers, for throughput.
//! - [`mitigation_matrix`]: the reference profile under each combination
//!   of the three mitigations.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use slicewatch_core::{AccessMode, SeqNo};
use slicewatch_sched::JitterRange;
use slicewatch_session::SessionConfig;
use slicewatch_transport::{Fault, SimConfig};

/// The reproduction payload: 3 chunks of 64000 bytes, 4000-byte slices,
/// 100..=300 ms jitter.
pub fn reference_profile(seed: u64) -> SessionConfig {
    SessionConfig::new(seed)
}

/// 16 chunks of 1 MiB, 16 KiB slices, markers interleaved.
pub fn stress_profile(seed: u64) -> SessionConfig {
    let mut config = SessionConfig::new(seed)
        .with_chunks(16, 1 << 20)
        .with_slice_size(16 << 10)
        .with_jitter(JitterRange::new(0, 50));
    config.interleave_markers = true;
    config
}

/// A transport that grows the first chunk's store while relaying its ninth
/// slice. Zero jitter on the session keeps readers outstanding.
pub fn growth_transport() -> SimConfig {
    SimConfig::default().with_fault(Fault::GrowBacking {
        at: SeqNo(8),
        additional: 64_000,
    })
}

/// One labelled config per combination of read-only views, copy-on-view
/// and copy-on-grow, all with zero jitter.
pub fn mitigation_matrix(seed: u64) -> Vec<(String, SessionConfig)> {
    let mut out = Vec::with_capacity(8);
    for bits in 0..8u8 {
        let mut config = reference_profile(seed).with_jitter(JitterRange::none());
        let mut label = Vec::new();
        if bits & 1 != 0 {
            config.view_mode = AccessMode::ReadOnly;
            label.push("read-only");
        }
        if bits & 2 != 0 {
            config.copy_on_view = true;
            label.push("copy-on-view");
        }
        if bits & 4 != 0 {
            config.copy_on_grow = true;
            label.push("copy-on-grow");
        }
        let label = if label.is_empty() {
            "none".to_string()
        } else {
            label.join("+")
        };
        out.push((label, config));
    }
    out
}
