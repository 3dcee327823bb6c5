//! Verification errors.

use std::error::Error;
use std::fmt;

use slicewatch_core::SeqNo;

/// Ways the received stream can fail to match the payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VerifyError {
    /// Fewer data bytes arrived than the payload holds.
    IncompleteTransfer {
        /// Payload length.
        expected: usize,
        /// Data bytes received.
        received: usize,
    },
    /// A sequence number arrived twice, bytes overlap, or more bytes
    /// arrived than the payload holds.
    DuplicateOrExtraBytes {
        /// Payload length.
        expected: usize,
        /// Data bytes received.
        received: usize,
        /// The repeated or overlapping delivery, when one is to blame.
        duplicate_seq: Option<SeqNo>,
    },
    /// Reassembled bytes differ from the payload.
    ContentMismatch {
        /// First differing offset.
        offset: usize,
        /// Payload byte at `offset`.
        expected: u8,
        /// Received byte at `offset`.
        actual: u8,
    },
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
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
        }
    }
}

impl Error for VerifyError {}
