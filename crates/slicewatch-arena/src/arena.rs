//! The per-session buffer arena.
//!
//! [`BufferArena`] allocates payloads (one backing store per chunk) and
//! issues views over them. With `copy_on_view` unset, [`BufferArena::view`]
//! never copies a byte; with it set, each view gets a private store.
//! [`ArenaStats`] exposes the counters tests use to tell the two apart.

use std::sync::atomic::Ordering;
use std::sync::{Arc, OnceLock};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use smallvec::SmallVec;

use slicewatch_core::{AccessMode, Actor, ByteRange, ChunkIndex, PayloadId, SharedClock};

use crate::config::{ArenaConfig, FillMode};
use crate::error::ArenaError;
use crate::payload::{Chunk, Payload};
use crate::store::{ArenaShared, BackingStore, SharedStore};
use crate::view::View;

/// Counters describing what an arena has done so far.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Views issued, including marker and detached views.
    pub views_issued: u64,
    /// Bytes copied by copy-on-view, detach or copy-on-grow.
    pub bytes_copied: u64,
    /// Backing stores created.
    pub stores_created: u32,
    /// In-place capacity growths.
    pub in_place_growths: u32,
    /// Copy-on-grow forks.
    pub forks: u32,
}

/// Owns raw byte storage for one session and issues views over it.
pub struct BufferArena {
    config: ArenaConfig,
    shared: Arc<ArenaShared>,
    rng: ChaCha8Rng,
    next_payload: u32,
    marker: OnceLock<SharedStore>,
}

impl BufferArena {
    /// Create an arena stamping its events on `clock`.
    pub fn new(config: ArenaConfig, clock: SharedClock) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed ^ ArenaConfig::FILL_SEED_SALT);
        let shared = Arc::new(ArenaShared::new(clock, config.copy_on_grow));
        Self {
            config,
            shared,
            rng,
            next_payload: 0,
            marker: OnceLock::new(),
        }
    }

    /// The arena's configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The clock this arena stamps events on.
    pub fn clock(&self) -> &SharedClock {
        &self.shared.clock
    }

    /// Allocate a single-chunk payload of `len` bytes.
    pub fn allocate(&mut self, len: usize) -> Payload {
        self.allocate_chunked(1, len)
    }

    /// Allocate `chunk_count` chunks of `chunk_len` bytes each, every chunk
    /// in its own backing store.
    pub fn allocate_chunked(&mut self, chunk_count: usize, chunk_len: usize) -> Payload {
        let chunks = (0..chunk_count)
            .map(|i| {
                let mut data = vec![0u8; chunk_len];
                match self.config.fill {
                    FillMode::Random => self.rng.fill_bytes(&mut data),
                    FillMode::Pattern => {
                        let base = i * chunk_len;
                        for (j, b) in data.iter_mut().enumerate() {
                            *b = ((base + j) % 251) as u8;
                        }
                    }
                    FillMode::Zero => {}
                }
                data
            })
            .collect();
        self.from_chunks(chunks)
    }

    /// Build a single-chunk payload from existing bytes (e.g. a fixture file).
    pub fn from_bytes(&mut self, bytes: Vec<u8>) -> Payload {
        self.from_chunks(vec![bytes])
    }

    /// Build a payload from existing chunks, one store per chunk.
    pub fn from_chunks(&mut self, chunks: Vec<Vec<u8>>) -> Payload {
        let id = PayloadId(self.next_payload);
        self.next_payload += 1;

        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut pristine = Vec::with_capacity(total);
        let mut parts: SmallVec<[Chunk; 4]> = SmallVec::with_capacity(chunks.len());
        for (i, data) in chunks.into_iter().enumerate() {
            let start = pristine.len();
            pristine.extend_from_slice(&data);
            let range = ByteRange {
                start,
                end: pristine.len(),
            };
            let store = BackingStore::create(&self.shared, data, None);
            parts.push(Chunk::new(ChunkIndex(i as u32), store, range));
        }

        tracing::debug!(payload = %id, len = total, chunks = parts.len(), "payload allocated");
        Payload::new(id, parts, pristine.into())
    }

    /// Issue a view over payload bytes `[start, end)`.
    ///
    /// The range must lie inside one chunk. Fails with
    /// [`ArenaError::OutOfRange`] if `start > end` or `end` exceeds the
    /// payload length, and with [`ArenaError::CrossesChunk`] if the range
    /// spans a chunk boundary. An empty payload has no store to view, so
    /// every range over it is out of range.
    pub fn view(
        &self,
        payload: &Payload,
        start: usize,
        end: usize,
        mode: AccessMode,
    ) -> Result<View, ArenaError> {
        let out_of_range = ArenaError::OutOfRange {
            start,
            end,
            len: payload.len(),
        };
        if start > end || end > payload.len() {
            return Err(out_of_range);
        }
        // An empty range at the very end belongs to the last chunk.
        let chunk = match payload.chunk_for_offset(start) {
            Some(c) => c,
            None if start == end => payload.chunks().last().ok_or(out_of_range)?,
            None => return Err(out_of_range),
        };
        let chunk_range = chunk.range();
        if end > chunk_range.end {
            return Err(ArenaError::CrossesChunk {
                start,
                end,
                chunk_end: chunk_range.end,
            });
        }
        let local = ByteRange {
            start: start - chunk_range.start,
            end: end - chunk_range.start,
        };
        Ok(self.issue(chunk.store(), local, mode))
    }

    /// Issue a view over chunk-relative bytes `[start, end)` of one chunk.
    pub fn view_chunk(
        &self,
        payload: &Payload,
        chunk: ChunkIndex,
        start: usize,
        end: usize,
        mode: AccessMode,
    ) -> Result<View, ArenaError> {
        let chunk = payload.chunk(chunk)?;
        if start > end || end > chunk.len() {
            return Err(ArenaError::OutOfRange {
                start,
                end,
                len: chunk.len(),
            });
        }
        Ok(self.issue(chunk.store(), ByteRange { start, end }, mode))
    }

    /// A view over the 1-byte synchronization marker.
    ///
    /// All marker views alias one read-only store.
    pub fn marker_view(&self) -> View {
        let store = self
            .marker
            .get_or_init(|| BackingStore::create(&self.shared, vec![ArenaConfig::MARKER_BYTE], None));
        View::issue(store, ByteRange { start: 0, end: 1 }, AccessMode::ReadOnly, Actor::Producer)
    }

    fn issue(&self, store: &SharedStore, range: ByteRange, mode: AccessMode) -> View {
        if !self.config.copy_on_view {
            return View::issue(store, range, mode, Actor::Producer);
        }
        let bytes = store.read_range(range).unwrap_or_default();
        self.shared.record_copy(bytes.len());
        let len = bytes.len();
        let private = BackingStore::create(&self.shared, bytes, None);
        View::issue(&private, ByteRange { start: 0, end: len }, mode, Actor::Producer)
    }

    /// Snapshot of the arena's counters.
    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            views_issued: self.shared.views_issued.load(Ordering::Relaxed),
            bytes_copied: self.shared.bytes_copied.load(Ordering::Relaxed),
            stores_created: self.shared.stores_created(),
            in_place_growths: self.shared.in_place_growths.load(Ordering::Relaxed),
            forks: self.shared.forks.load(Ordering::Relaxed),
        }
    }
}
