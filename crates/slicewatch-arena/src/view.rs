//! Zero-copy views over backing stores.
//!
//! A [`View`] is an `Arc` to a store plus a store-relative range and an
//! access mode. Cloning a view clones the `Arc`, never the bytes.
//! [`View::read`] borrows the store's bytes under its read lock.

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::Ordering;
use std::sync::{Arc, RwLockReadGuard};

use slicewatch_core::{AccessMode, Actor, ByteRange, Stamp, StoreId, ViewId};

use crate::store::{BackingStore, SharedStore};

/// A reference to a sub-range of a backing store.
#[derive(Clone)]
pub struct View {
    id: ViewId,
    store: SharedStore,
    range: ByteRange,
    mode: AccessMode,
    generation: u32,
    issued_at: Stamp,
    issuer: Actor,
}

impl View {
    /// Issue a new view. The caller has already checked `range` against
    /// the store's capacity.
    pub(crate) fn issue(
        store: &SharedStore,
        range: ByteRange,
        mode: AccessMode,
        issuer: Actor,
    ) -> Self {
        let shared = store.shared();
        shared.views_issued.fetch_add(1, Ordering::Relaxed);
        Self {
            id: shared.next_view_id(),
            store: Arc::clone(store),
            range,
            mode,
            generation: store.generation(),
            issued_at: shared.clock.tick(),
            issuer,
        }
    }

    /// This view's ID.
    pub fn id(&self) -> ViewId {
        self.id
    }

    /// The backing store this view aliases.
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    /// Shorthand for `self.store().id()`.
    pub fn store_id(&self) -> StoreId {
        self.store.id()
    }

    /// Store-relative range of the referenced bytes.
    pub fn range(&self) -> ByteRange {
        self.range
    }

    /// Length in bytes.
    pub fn len(&self) -> usize {
        self.range.len()
    }

    /// Whether this view covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.range.is_empty()
    }

    /// Access mode the view was issued with.
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Actor that requested the view.
    pub fn issuer(&self) -> Actor {
        self.issuer
    }

    /// When the view was issued.
    pub fn issued_at(&self) -> Stamp {
        self.issued_at
    }

    /// Store generation at issue time.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Whether the store has grown in place since this view was issued.
    ///
    /// A stale view still reads whatever bytes now sit at its range;
    /// nothing stops it. That is the hazard.
    pub fn is_stale(&self) -> bool {
        self.store.generation() != self.generation
    }

    /// Where a writer that owns this view would append next.
    pub fn writer_index(&self) -> usize {
        self.range.end
    }

    /// Borrow the referenced bytes.
    pub fn read(&self) -> ViewBytes<'_> {
        ViewBytes {
            guard: self.store.read_guard(),
            range: self.range,
        }
    }

    /// Copy the referenced bytes out.
    pub fn to_vec(&self) -> Vec<u8> {
        self.read().to_vec()
    }

    /// Copy the referenced bytes into a private store and return a view
    /// over the copy with the same mode.
    pub fn detach(&self, actor: Actor) -> View {
        let bytes = self.to_vec();
        let shared = self.store.shared();
        shared.record_copy(bytes.len());
        let len = bytes.len();
        let private = BackingStore::create(shared, bytes, None);
        tracing::trace!(view = %self.id, from = %self.store.id(), to = %private.id(), %actor, len, "view detached");
        View::issue(&private, ByteRange { start: 0, end: len }, self.mode, actor)
    }
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("store", &self.store.id())
            .field("range", &self.range)
            .field("mode", &self.mode)
            .field("generation", &self.generation)
            .finish()
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({} {} {})",
            self.id,
            self.store.id(),
            self.range,
            self.mode
        )
    }
}

/// Borrowed bytes of a [`View`], held under the store's read lock.
///
/// Writers on the same store block while this guard is alive, so keep it
/// short-lived.
pub struct ViewBytes<'a> {
    guard: RwLockReadGuard<'a, Vec<u8>>,
    range: ByteRange,
}

impl Deref for ViewBytes<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        // Stores never shrink and views are bounds-checked at issue.
        self.guard.get(self.range.as_range()).unwrap_or(&[])
    }
}
