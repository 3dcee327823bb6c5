//! Payloads: the immutable byte sequence a session streams.

use std::sync::Arc;

use smallvec::SmallVec;

use slicewatch_core::{ByteRange, ChunkIndex, PayloadId};

use crate::error::ArenaError;
use crate::store::SharedStore;

/// One source buffer of a payload, living in its own backing store.
#[derive(Clone, Debug)]
pub struct Chunk {
    index: ChunkIndex,
    store: SharedStore,
    range: ByteRange,
}

impl Chunk {
    pub(crate) fn new(index: ChunkIndex, store: SharedStore, range: ByteRange) -> Self {
        Self {
            index,
            store,
            range,
        }
    }

    /// Position of this chunk within the payload.
    pub fn index(&self) -> ChunkIndex {
        self.index
    }

    /// The store holding this chunk's bytes.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Payload-relative range covered by this chunk.
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Chunk length in bytes.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether the chunk is empty.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }
}

/// An immutable logical byte sequence made of one or more chunks.
///
/// The payload keeps a pristine copy of its bytes taken at allocation.
/// Views read the chunk stores, which actors may corrupt; the verifier
/// compares against the pristine copy, which nothing can.
#[derive(Clone, Debug)]
pub struct Payload {
    id: PayloadId,
    chunks: SmallVec<[Chunk; 4]>,
    pristine: Arc<[u8]>,
}

impl Payload {
    pub(crate) fn new(id: PayloadId, chunks: SmallVec<[Chunk; 4]>, pristine: Arc<[u8]>) -> Self {
        Self {
            id,
            chunks,
            pristine,
        }
    }

    /// This payload's ID.
    pub fn id(&self) -> PayloadId {
        self.id
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        self.pristine.len()
    }

    /// Whether the payload has no bytes.
    pub fn is_empty(&self) -> bool {
        self.pristine.is_empty()
    }

    /// The bytes as they were at allocation.
    pub fn bytes(&self) -> &[u8] {
        &self.pristine
    }

    /// All chunks in payload order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Number of chunks.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Look up a chunk by index.
    pub fn chunk(&self, index: ChunkIndex) -> Result<&Chunk, ArenaError> {
        self.chunks
            .get(index.0 as usize)
            .ok_or(ArenaError::UnknownChunk {
                chunk: index,
                chunk_count: self.chunks.len(),
            })
    }

    /// The chunk containing payload offset `offset`, if any.
    pub fn chunk_for_offset(&self, offset: usize) -> Option<&Chunk> {
        let idx = self
            .chunks
            .partition_point(|c| c.range.end <= offset);
        self.chunks.get(idx).filter(|c| c.range.start <= offset && offset < c.range.end)
    }
}
