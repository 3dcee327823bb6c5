//! Reassembly and comparison.

use std::collections::HashSet;

use slicewatch_sched::Delivery;

use crate::error::VerifyError;
use crate::hash::payload_hash;

/// How received data is put back together.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReassemblyOrder {
    /// Place each delivery at its logical payload offset. Correct for any
    /// arrival order.
    #[default]
    ByOffset,
    /// Concatenate in arrival order, as a running-index check does. Only
    /// passes over an order-preserving transport.
    Arrival,
}

/// The first differing byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mismatch {
    /// Payload offset.
    pub offset: usize,
    /// Payload byte.
    pub expected: u8,
    /// Received byte.
    pub actual: u8,
}

/// Outcome of a length-complete comparison.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verdict {
    /// Whether every byte matched.
    pub ok: bool,
    /// Where the first difference is, if any.
    pub first_mismatch: Option<Mismatch>,
    /// Bytes compared.
    pub bytes_checked: usize,
    /// Hash of the original payload.
    pub expected_hash: u64,
    /// Hash of the reassembled bytes.
    pub actual_hash: u64,
}

impl Verdict {
    /// Turn a failed verdict into [`VerifyError::ContentMismatch`].
    pub fn into_result(self) -> Result<Verdict, VerifyError> {
        match self.first_mismatch {
            Some(m) => Err(VerifyError::ContentMismatch {
                offset: m.offset,
                expected: m.expected,
                actual: m.actual,
            }),
            None => Ok(self),
        }
    }
}

/// Verify `received` against `original`, reassembling by offset.
///
/// `received` is in consumer order; markers are ignored. Length errors
/// are returned as `Err`; a content difference is reported in the
/// [`Verdict`].
pub fn verify(original: &[u8], received: &[Delivery]) -> Result<Verdict, VerifyError> {
    verify_with(original, received, ReassemblyOrder::ByOffset)
}

/// Verify with an explicit reassembly order.
pub fn verify_with(
    original: &[u8],
    received: &[Delivery],
    order: ReassemblyOrder,
) -> Result<Verdict, VerifyError> {
    let data: Vec<&Delivery> = received.iter().filter(|d| !d.is_marker()).collect();
    let expected = original.len();
    let total: usize = data.iter().map(|d| d.len()).sum();

    let mut seen = HashSet::with_capacity(data.len());
    if let Some(dup) = data.iter().find(|d| !seen.insert(d.seq)) {
        return Err(VerifyError::DuplicateOrExtraBytes {
            expected,
            received: total,
            duplicate_seq: Some(dup.seq),
        });
    }
    if total > expected {
        return Err(VerifyError::DuplicateOrExtraBytes {
            expected,
            received: total,
            duplicate_seq: None,
        });
    }
    if total < expected {
        return Err(VerifyError::IncompleteTransfer {
            expected,
            received: total,
        });
    }

    let assembled = match order {
        ReassemblyOrder::ByOffset => by_offset(&data, expected, total)?,
        ReassemblyOrder::Arrival => {
            let mut out = Vec::with_capacity(total);
            for d in &data {
                out.extend_from_slice(&d.view.read());
            }
            out
        }
    };

    // Equal hashes prove nothing; the byte scan decides.
    let first_mismatch = first_difference(original, &assembled);
    let verdict = Verdict {
        ok: first_mismatch.is_none(),
        first_mismatch,
        bytes_checked: expected,
        expected_hash: payload_hash(original),
        actual_hash: payload_hash(&assembled),
    };
    tracing::debug!(
        ok = verdict.ok, bytes = expected, deliveries = data.len(), ?order,
        mismatch = ?verdict.first_mismatch, "verified"
    );
    Ok(verdict)
}

/// Place each delivery at its offset. Totals already match, so any
/// overlap or out-of-bounds span means a byte is covered twice.
fn by_offset(data: &[&Delivery], expected: usize, total: usize) -> Result<Vec<u8>, VerifyError> {
    let mut spans: Vec<(usize, &Delivery)> = data
        .iter()
        .filter_map(|d| d.offset().map(|o| (o, *d)))
        .collect();
    spans.sort_by_key(|(o, d)| (*o, d.seq));

    let mut out = vec![0u8; expected];
    let mut next = 0;
    for (offset, d) in spans {
        let end = offset + d.len();
        if offset < next || end > expected {
            return Err(VerifyError::DuplicateOrExtraBytes {
                expected,
                received: total,
                duplicate_seq: Some(d.seq),
            });
        }
        out[offset..end].copy_from_slice(&d.view.read());
        next = end;
    }
    Ok(out)
}

fn first_difference(expected: &[u8], actual: &[u8]) -> Option<Mismatch> {
    expected
        .iter()
        .zip(actual)
        .position(|(e, a)| e != a)
        .map(|offset| Mismatch {
            offset,
            expected: expected[offset],
            actual: actual[offset],
        })
}
