//! Arena-specific error types.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;

use slicewatch_core::{ChunkIndex, StoreId};

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// View or write bounds fall outside the target, or `start > end`.
    ///
    /// This is a caller bug and is never retried.
    OutOfRange {
        /// Requested start offset.
        start: usize,
        /// Requested end offset (exclusive).
        end: usize,
        /// Length of the payload, chunk or store addressed.
        len: usize,
    },
    /// A payload-relative view range spans more than one chunk.
    CrossesChunk {
        /// Requested start offset.
        start: usize,
        /// Requested end offset (exclusive).
        end: usize,
        /// End of the chunk that contains `start`.
        chunk_end: usize,
    },
    /// A chunk index past the payload's chunk count.
    UnknownChunk {
        /// The requested chunk.
        chunk: ChunkIndex,
        /// Number of chunks in the payload.
        chunk_count: usize,
    },
    /// A write landed on a store whose capacity could not hold it.
    StoreOverflow {
        /// The store written to.
        store: StoreId,
        /// Requested end offset of the write.
        end: usize,
        /// Store capacity at the time of the write.
        capacity: usize,
    },
    /// Reading or writing a fixture file failed.
    Fixture {
        /// The file involved.
        path: PathBuf,
        /// The I/O error kind.
        kind: std::io::ErrorKind,
        /// Human-readable detail from the I/O error.
        detail: String,
    },
}

impl ArenaError {
    pub(crate) fn fixture(path: impl Into<PathBuf>, e: std::io::Error) -> Self {
        Self::Fixture {
            path: path.into(),
            kind: e.kind(),
            detail: e.to_string(),
        }
    }
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { start, end, len } => {
                write!(f, "range [{start}, {end}) out of bounds for length {len}")
            }
            Self::CrossesChunk {
                start,
                end,
                chunk_end,
            } => write!(
                f,
                "range [{start}, {end}) crosses chunk boundary at {chunk_end}"
            ),
            Self::UnknownChunk { chunk, chunk_count } => {
                write!(f, "chunk {chunk} does not exist (payload has {chunk_count})")
            }
            Self::StoreOverflow {
                store,
                end,
                capacity,
            } => write!(
                f,
                "write to {store} ends at {end}, past capacity {capacity}"
            ),
            Self::Fixture { path, detail, .. } => {
                write!(f, "fixture {}: {detail}", path.display())
            }
        }
    }
}

impl Error for ArenaError {}
