//! Shared backing stores and their mutation journals.
//!
//! A [`BackingStore`] is a `Vec<u8>` behind an `RwLock` plus an append-only
//! journal of [`StoreEvent`]s. Views never copy out of a store; they hold an
//! `Arc` to it and a range. Anything that changes the bytes or the capacity
//! goes through a store method, which records the change with the acting
//! [`Actor`] and a [`Stamp`] from the session clock.
//!
//! Growth is the hazard the harness looks for. Without copy-on-grow, a
//! store that grows reallocates in place and bumps its generation: every view
//! issued before that point is stale, and any reader still holding one is
//! reading memory the writer considers its own. With copy-on-grow, the
//! store forks and the original is left untouched.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use slicewatch_core::{Actor, ByteRange, SharedClock, Stamp, StoreId, ViewId};

use crate::error::ArenaError;

/// A backing store shared between the arena, its views and any actor
/// that mutates it.
pub type SharedStore = Arc<BackingStore>;

/// One recorded mutation of a backing store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    /// Bytes in `range` were overwritten.
    Write {
        /// Who wrote.
        actor: Actor,
        /// Store-relative range written.
        range: ByteRange,
        /// Whether the writer held a lock the other writers also honour.
        synchronized: bool,
        /// When the write happened.
        at: Stamp,
    },
    /// Capacity grew in place; all earlier views over the store are stale.
    Grow {
        /// Who grew the store.
        actor: Actor,
        /// Capacity before growth.
        old_capacity: usize,
        /// Capacity after growth.
        new_capacity: usize,
        /// When the growth happened.
        at: Stamp,
    },
    /// Capacity growth was redirected into a new store; this one is unchanged.
    Fork {
        /// Who requested the growth.
        actor: Actor,
        /// The store that received the grown copy.
        into: StoreId,
        /// When the fork happened.
        at: Stamp,
    },
}

impl StoreEvent {
    /// When the event happened.
    pub fn at(&self) -> Stamp {
        match self {
            Self::Write { at, .. } | Self::Grow { at, .. } | Self::Fork { at, .. } => *at,
        }
    }

    /// Who caused the event.
    pub fn actor(&self) -> Actor {
        match self {
            Self::Write { actor, .. } | Self::Grow { actor, .. } | Self::Fork { actor, .. } => {
                *actor
            }
        }
    }
}

/// Result of a capacity request.
#[derive(Clone, Debug)]
pub enum Growth {
    /// Capacity already sufficed.
    Unchanged,
    /// The store reallocated in place.
    InPlace {
        /// Capacity before growth.
        old_capacity: usize,
        /// Capacity after growth.
        new_capacity: usize,
    },
    /// The store was forked; `store` holds the grown copy.
    Forked {
        /// The new store.
        store: SharedStore,
        /// Capacity of the original store.
        old_capacity: usize,
        /// Capacity of the fork.
        new_capacity: usize,
    },
}

impl Growth {
    /// The region `[old_capacity, new_capacity)` added by this growth, if any.
    pub fn grown_region(&self) -> Option<ByteRange> {
        match self {
            Self::Unchanged => None,
            Self::InPlace {
                old_capacity,
                new_capacity,
            }
            | Self::Forked {
                old_capacity,
                new_capacity,
                ..
            } => ByteRange::new(*old_capacity, *new_capacity),
        }
    }
}

/// Result of [`BackingStore::ensure_writable`].
#[derive(Clone, Debug)]
pub struct WriteOutcome {
    /// The store that received the write (a fork under copy-on-grow).
    pub store: SharedStore,
    /// Store-relative range written.
    pub range: ByteRange,
    /// What happened to capacity first.
    pub growth: Growth,
}

/// State shared by every store of one arena.
pub(crate) struct ArenaShared {
    pub(crate) clock: SharedClock,
    pub(crate) copy_on_grow: bool,
    next_store: AtomicU32,
    next_view: AtomicU64,
    pub(crate) views_issued: AtomicU64,
    pub(crate) bytes_copied: AtomicU64,
    pub(crate) in_place_growths: AtomicU32,
    pub(crate) forks: AtomicU32,
}

impl ArenaShared {
    pub(crate) fn new(clock: SharedClock, copy_on_grow: bool) -> Self {
        Self {
            clock,
            copy_on_grow,
            next_store: AtomicU32::new(0),
            next_view: AtomicU64::new(0),
            views_issued: AtomicU64::new(0),
            bytes_copied: AtomicU64::new(0),
            in_place_growths: AtomicU32::new(0),
            forks: AtomicU32::new(0),
        }
    }

    pub(crate) fn next_view_id(&self) -> ViewId {
        ViewId(self.next_view.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn stores_created(&self) -> u32 {
        self.next_store.load(Ordering::Relaxed)
    }

    pub(crate) fn record_copy(&self, bytes: usize) {
        self.bytes_copied.fetch_add(bytes as u64, Ordering::Relaxed);
    }
}

/// Shared mutable byte storage with a mutation journal.
pub struct BackingStore {
    id: StoreId,
    shared: Arc<ArenaShared>,
    data: RwLock<Vec<u8>>,
    journal: Mutex<Vec<StoreEvent>>,
    generation: AtomicU32,
    forked_from: Option<StoreId>,
}

// Compile-time assertion: BackingStore must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<BackingStore>();
};

impl BackingStore {
    /// Create a store owning `data`. Capacity equals `data.len()`.
    pub(crate) fn create(
        shared: &Arc<ArenaShared>,
        data: Vec<u8>,
        forked_from: Option<StoreId>,
    ) -> SharedStore {
        let id = StoreId(shared.next_store.fetch_add(1, Ordering::Relaxed));
        Arc::new(Self {
            id,
            shared: Arc::clone(shared),
            data: RwLock::new(data),
            journal: Mutex::new(Vec::new()),
            generation: AtomicU32::new(0),
            forked_from,
        })
    }

    pub(crate) fn shared(&self) -> &Arc<ArenaShared> {
        &self.shared
    }

    /// This store's ID.
    pub fn id(&self) -> StoreId {
        self.id
    }

    /// Current capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.read_guard().len()
    }

    /// Number of in-place growths so far. Views remember the generation
    /// they were issued at.
    pub fn generation(&self) -> u32 {
        self.generation.load(Ordering::Acquire)
    }

    /// The store this one was forked from, if any.
    pub fn forked_from(&self) -> Option<StoreId> {
        self.forked_from
    }

    /// A copy of the journal, oldest event first.
    pub fn journal(&self) -> Vec<StoreEvent> {
        self.journal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Copy the bytes in `range`. Returns `None` if the range is past capacity.
    pub fn read_range(&self, range: ByteRange) -> Option<Vec<u8>> {
        self.read_guard().get(range.as_range()).map(<[u8]>::to_vec)
    }

    pub(crate) fn read_guard(&self) -> RwLockReadGuard<'_, Vec<u8>> {
        self.data.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<u8>> {
        self.data.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append to the journal. Callers hold the data write lock so journal
    /// order matches mutation order.
    fn record(&self, make: impl FnOnce(Stamp) -> StoreEvent) -> Stamp {
        let mut journal = self.journal.lock().unwrap_or_else(PoisonError::into_inner);
        let at = self.shared.clock.tick();
        journal.push(make(at));
        at
    }

    /// Overwrite bytes starting at `offset`.
    ///
    /// Returns the store-relative range written. Fails with
    /// [`ArenaError::StoreOverflow`] if the write would run past capacity;
    /// writes never grow a store implicitly.
    pub fn write(
        &self,
        actor: Actor,
        offset: usize,
        bytes: &[u8],
        synchronized: bool,
    ) -> Result<ByteRange, ArenaError> {
        let range = ByteRange::from_len(offset, bytes.len()).ok_or(ArenaError::OutOfRange {
            start: offset,
            end: usize::MAX,
            len: self.capacity(),
        })?;

        let mut data = self.write_guard();
        if range.end > data.len() {
            return Err(ArenaError::StoreOverflow {
                store: self.id,
                end: range.end,
                capacity: data.len(),
            });
        }
        data[range.as_range()].copy_from_slice(bytes);
        let at = self.record(|at| StoreEvent::Write {
            actor,
            range,
            synchronized,
            at,
        });
        drop(data);

        tracing::trace!(store = %self.id, %actor, %range, %at, synchronized, "store write");
        Ok(range)
    }

    /// Make sure the store can hold at least `min_capacity` bytes.
    ///
    /// Growth doubles the capacity or jumps straight to `min_capacity`,
    /// whichever is larger. Under copy-on-grow the grown bytes go to a new
    /// store and this one is left untouched; otherwise this store
    /// reallocates in place and its generation advances.
    pub fn ensure_capacity(self: &Arc<Self>, actor: Actor, min_capacity: usize) -> Growth {
        let mut data = self.write_guard();
        let old_capacity = data.len();
        if min_capacity <= old_capacity {
            return Growth::Unchanged;
        }
        let new_capacity = min_capacity.max(old_capacity.saturating_mul(2));

        if self.shared.copy_on_grow {
            let mut copy = Vec::with_capacity(new_capacity);
            copy.extend_from_slice(&data);
            copy.resize(new_capacity, 0);
            let fork = BackingStore::create(&self.shared, copy, Some(self.id));
            let into = fork.id;
            let at = self.record(|at| StoreEvent::Fork { actor, into, at });
            drop(data);

            self.shared.record_copy(old_capacity);
            self.shared.forks.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(
                store = %self.id, %into, %actor, %at, old_capacity, new_capacity,
                "copy-on-grow fork"
            );
            return Growth::Forked {
                store: fork,
                old_capacity,
                new_capacity,
            };
        }

        data.resize(new_capacity, 0);
        self.generation.fetch_add(1, Ordering::AcqRel);
        let at = self.record(|at| StoreEvent::Grow {
            actor,
            old_capacity,
            new_capacity,
            at,
        });
        drop(data);

        self.shared.in_place_growths.fetch_add(1, Ordering::Relaxed);
        tracing::warn!(
            store = %self.id, %actor, %at, old_capacity, new_capacity,
            "backing store grew in place; earlier views are stale"
        );
        Growth::InPlace {
            old_capacity,
            new_capacity,
        }
    }

    /// Reserve `min_writable` bytes at `writer_index` and fill them with
    /// `filler`, growing first if needed.
    ///
    /// This is the lazy cursor mutation a transport performs on a buffer
    /// it believes it owns. When `writer_index` is the end of a slice that
    /// is not the end of the store, the write lands on the next slice's
    /// bytes.
    pub fn ensure_writable(
        self: &Arc<Self>,
        actor: Actor,
        writer_index: usize,
        min_writable: usize,
        filler: u8,
    ) -> Result<WriteOutcome, ArenaError> {
        let end = writer_index
            .checked_add(min_writable)
            .ok_or(ArenaError::OutOfRange {
                start: writer_index,
                end: usize::MAX,
                len: self.capacity(),
            })?;
        let growth = self.ensure_capacity(actor, end);
        let target = match &growth {
            Growth::Forked { store, .. } => Arc::clone(store),
            Growth::Unchanged | Growth::InPlace { .. } => Arc::clone(self),
        };
        let range = target.write(actor, writer_index, &vec![filler; min_writable], false)?;
        Ok(WriteOutcome {
            store: target,
            range,
            growth,
        })
    }
}

impl fmt::Debug for BackingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackingStore")
            .field("id", &self.id)
            .field("capacity", &self.capacity())
            .field("generation", &self.generation())
            .field("forked_from", &self.forked_from)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicewatch_core::LogicalClock;

    fn shared(copy_on_grow: bool) -> Arc<ArenaShared> {
        Arc::new(ArenaShared::new(LogicalClock::shared(), copy_on_grow))
    }

    #[test]
    fn write_is_journaled() {
        let s = shared(false);
        let store = BackingStore::create(&s, vec![0; 8], None);
        let range = store.write(Actor::Producer, 2, &[1, 2, 3], true).unwrap();
        assert_eq!(range, ByteRange::new(2, 5).unwrap());
        assert_eq!(store.read_range(range).unwrap(), vec![1, 2, 3]);

        let journal = store.journal();
        assert_eq!(journal.len(), 1);
        assert!(matches!(
            journal[0],
            StoreEvent::Write {
                actor: Actor::Producer,
                synchronized: true,
                ..
            }
        ));
    }

    #[test]
    fn write_past_capacity_is_rejected() {
        let s = shared(false);
        let store = BackingStore::create(&s, vec![0; 4], None);
        let err = store.write(Actor::Transport, 3, &[1, 2], false).unwrap_err();
        assert!(matches!(err, ArenaError::StoreOverflow { end: 5, capacity: 4, .. }));
        assert!(store.journal().is_empty());
    }

    #[test]
    fn in_place_growth_bumps_generation() {
        let s = shared(false);
        let store = BackingStore::create(&s, vec![9; 10], None);
        let growth = store.ensure_capacity(Actor::Transport, 11);
        match growth {
            Growth::InPlace {
                old_capacity,
                new_capacity,
            } => {
                assert_eq!(old_capacity, 10);
                assert_eq!(new_capacity, 20);
            }
            other => panic!("expected InPlace, got {other:?}"),
        }
        assert_eq!(store.generation(), 1);
        assert_eq!(store.capacity(), 20);
        // Existing bytes survive the reallocation.
        assert_eq!(store.read_range(ByteRange::new(0, 10).unwrap()).unwrap(), vec![9; 10]);
        assert!(matches!(store.journal()[0], StoreEvent::Grow { .. }));
    }

    #[test]
    fn sufficient_capacity_is_unchanged() {
        let s = shared(false);
        let store = BackingStore::create(&s, vec![0; 10], None);
        assert!(matches!(
            store.ensure_capacity(Actor::Transport, 10),
            Growth::Unchanged
        ));
        assert_eq!(store.generation(), 0);
        assert!(store.journal().is_empty());
    }

    #[test]
    fn copy_on_grow_forks() {
        let s = shared(true);
        let store = BackingStore::create(&s, vec![5; 4], None);
        let growth = store.ensure_capacity(Actor::Transport, 6);
        let fork = match growth {
            Growth::Forked { store: fork, .. } => fork,
            other => panic!("expected Forked, got {other:?}"),
        };
        assert_eq!(store.capacity(), 4);
        assert_eq!(store.generation(), 0);
        assert_eq!(fork.capacity(), 8);
        assert_eq!(fork.forked_from(), Some(store.id()));
        assert!(matches!(store.journal()[0], StoreEvent::Fork { .. }));
        assert!(fork.journal().is_empty());
    }

    #[test]
    fn ensure_writable_clobbers_following_bytes() {
        let s = shared(false);
        let store = BackingStore::create(&s, (0u8..16).collect(), None);
        // Writer index at the end of a slice [0, 8): the next slice starts at 8.
        let outcome = store.ensure_writable(Actor::Transport, 8, 2, 0xFF).unwrap();
        assert!(matches!(outcome.growth, Growth::Unchanged));
        assert_eq!(outcome.range, ByteRange::new(8, 10).unwrap());
        assert_eq!(
            store.read_range(ByteRange::new(7, 11).unwrap()).unwrap(),
            vec![7, 0xFF, 0xFF, 10]
        );
    }

    #[test]
    fn ensure_writable_at_tail_grows() {
        let s = shared(false);
        let store = BackingStore::create(&s, vec![1; 8], None);
        let outcome = store.ensure_writable(Actor::Transport, 8, 4, 0).unwrap();
        assert_eq!(outcome.growth.grown_region(), ByteRange::new(8, 16));
        assert_eq!(store.journal().len(), 2);
    }

    #[test]
    fn journal_stamps_are_ordered() {
        let s = shared(false);
        let store = BackingStore::create(&s, vec![0; 4], None);
        store.write(Actor::Producer, 0, &[1], false).unwrap();
        store.ensure_capacity(Actor::Transport, 5);
        store.write(Actor::Transport, 4, &[2], false).unwrap();
        let stamps: Vec<_> = store.journal().iter().map(StoreEvent::at).collect();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
    }
}
