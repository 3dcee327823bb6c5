//! Run the growth scenario under every mitigation combination.
//!
//! Shows which toggles turn the concurrency violation into a pass.

use slicewatch_bench::{growth_transport, mitigation_matrix};
use slicewatch_session::Session;
use slicewatch_transport::SimTransport;

fn main() {
    slicewatch_test_utils::init_tracing();
    println!("=== slicewatch: growth with outstanding readers ===\n");

    for (label, config) in mitigation_matrix(42) {
        let report = Session::new(config)
            .unwrap()
            .run(&mut SimTransport::new(growth_transport()));
        let outcome = match report.error() {
            None => "verified".to_string(),
            Some(e) => e.kind().to_string(),
        };
        println!(
            "{label:<40} {outcome:<24} copied={:>7} forks={}",
            report.arena.bytes_copied, report.arena.forks
        );
    }
}
