//! The ownership tracker.

use std::sync::{Mutex, MutexGuard, PoisonError};

use indexmap::IndexMap;
use smallvec::SmallVec;

use slicewatch_arena::{SharedStore, StoreEvent, View};
use slicewatch_core::{AccessMode, Actor, ByteRange, SharedClock, Stamp, StoreId};

use crate::claim::Claim;
use crate::violation::{ConcurrencyViolation, ViolationKind};

/// Claims over one backing store, in the order they were recorded.
struct StoreClaims {
    store: SharedStore,
    claims: SmallVec<[Claim; 8]>,
}

/// Records which actor holds which view and checks the store journals
/// against those claims.
///
/// All methods take `&self`; share the tracker between the producer and
/// consumer sides behind an `Arc`.
pub struct OwnershipTracker {
    clock: SharedClock,
    stores: Mutex<IndexMap<StoreId, StoreClaims>>,
}

// Compile-time assertion: OwnershipTracker must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<OwnershipTracker>();
};

impl OwnershipTracker {
    /// Create a tracker stamping claims on `clock`.
    ///
    /// `clock` must be the clock of the arena that issued the views;
    /// liveness is decided by comparing claim stamps with journal stamps.
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            stores: Mutex::new(IndexMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<StoreId, StoreClaims>> {
        self.stores.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a claim on `view` by the actor that requested it.
    pub fn tag(&self, view: &View, mode: AccessMode) -> Stamp {
        self.tag_as(view, view.issuer(), mode)
    }

    /// Record a claim on `view` by `actor`.
    pub fn tag_as(&self, view: &View, actor: Actor, mode: AccessMode) -> Stamp {
        let mut stores = self.lock();
        let claimed_at = self.clock.tick();
        stores
            .entry(view.store_id())
            .or_insert_with(|| StoreClaims {
                store: view.store().clone(),
                claims: SmallVec::new(),
            })
            .claims
            .push(Claim {
                view: view.clone(),
                actor,
                mode,
                claimed_at,
                released_at: None,
            });
        tracing::trace!(view = %view.id(), store = %view.store_id(), %actor, %mode, at = %claimed_at, "claim");
        claimed_at
    }

    /// End the oldest open claim `actor` holds on `view`.
    ///
    /// Returns the release stamp, or `None` if there was no open claim.
    pub fn release(&self, view: &View, actor: Actor) -> Option<Stamp> {
        let mut stores = self.lock();
        let claim = stores
            .get_mut(&view.store_id())?
            .claims
            .iter_mut()
            .find(|c| c.view.id() == view.id() && c.actor == actor && c.is_open())?;
        let at = self.clock.tick();
        claim.released_at = Some(at);
        tracing::trace!(view = %view.id(), %actor, %at, "release");
        Some(at)
    }

    /// Number of claims recorded, open or released.
    pub fn claim_count(&self) -> usize {
        self.lock().values().map(|s| s.claims.len()).sum()
    }

    /// Number of claims not yet released.
    pub fn open_claims(&self) -> usize {
        self.lock()
            .values()
            .flat_map(|s| s.claims.iter())
            .filter(|c| c.is_open())
            .count()
    }

    /// Snapshot of every claim, grouped by store in first-claim order.
    pub fn claims(&self) -> Vec<Claim> {
        self.lock()
            .values()
            .flat_map(|s| s.claims.iter().cloned())
            .collect()
    }

    /// Fail with the first violation found, scanning stores in the order
    /// they were first claimed and each journal oldest event first.
    pub fn check_invariant(&self) -> Result<(), ConcurrencyViolation> {
        match self.violations().into_iter().next() {
            Some(v) => Err(v),
            None => Ok(()),
        }
    }

    /// Every violation, in scan order.
    pub fn violations(&self) -> Vec<ConcurrencyViolation> {
        let stores = self.lock();
        let mut found = Vec::new();
        for (id, group) in stores.iter() {
            scan_store(*id, group, &mut found);
        }
        for v in &found {
            tracing::warn!(
                kind = %v.kind, store = %v.store, view = %v.view, actor = %v.actor,
                range = %v.range, at = %v.at, "ownership violation"
            );
        }
        found
    }
}

fn violation(
    kind: ViolationKind,
    store: StoreId,
    claim: &Claim,
    range: ByteRange,
    actor: Actor,
    at: Stamp,
) -> ConcurrencyViolation {
    ConcurrencyViolation {
        kind,
        store,
        view: claim.view.id(),
        view_range: claim.range(),
        claimant: claim.actor,
        range,
        actor,
        at,
    }
}

/// Replay one store's journal against its claims.
fn scan_store(store: StoreId, group: &StoreClaims, found: &mut Vec<ConcurrencyViolation>) {
    let claims = &group.claims;
    // First unsynchronized writer seen per MutableShared claim, and whether
    // the claim was already reported.
    let mut first_writer: Vec<Option<Actor>> = vec![None; claims.len()];
    let mut reported = vec![false; claims.len()];

    for event in group.store.journal() {
        match event {
            StoreEvent::Write {
                actor,
                range,
                synchronized,
                at,
            } => {
                for (i, claim) in claims.iter().enumerate() {
                    if !claim.live_at(at) {
                        continue;
                    }
                    let Some(hit) = range.intersection(&claim.range()) else {
                        continue;
                    };
                    match claim.mode {
                        AccessMode::ReadOnly => found.push(violation(
                            ViolationKind::ReadOnlyMutated,
                            store,
                            claim,
                            hit,
                            actor,
                            at,
                        )),
                        AccessMode::MutableShared if !synchronized => match first_writer[i] {
                            None => first_writer[i] = Some(actor),
                            Some(prev) if prev != actor && !reported[i] => {
                                reported[i] = true;
                                found.push(violation(
                                    ViolationKind::UnsynchronizedWriters,
                                    store,
                                    claim,
                                    hit,
                                    actor,
                                    at,
                                ));
                            }
                            Some(_) => {}
                        },
                        AccessMode::MutableShared => {}
                    }
                }
            }
            StoreEvent::Grow {
                actor,
                old_capacity,
                new_capacity,
                at,
            } => {
                let reader = claims
                    .iter()
                    .find(|c| c.mode.is_read_only() && c.live_at(at));
                if let Some(claim) = reader {
                    let grown = ByteRange {
                        start: old_capacity,
                        end: new_capacity,
                    };
                    found.push(violation(
                        ViolationKind::GrowthWithOutstandingReaders,
                        store,
                        claim,
                        grown,
                        actor,
                        at,
                    ));
                }
            }
            StoreEvent::Fork { .. } => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use slicewatch_arena::{ArenaConfig, BufferArena, Payload};
    use slicewatch_core::LogicalClock;

    fn setup(config: ArenaConfig, len: usize) -> (BufferArena, Payload, OwnershipTracker) {
        let clock = LogicalClock::shared();
        let mut arena = BufferArena::new(config, clock.clone());
        let payload = arena.allocate(len);
        (arena, payload, OwnershipTracker::new(clock))
    }

    #[test]
    fn no_claims_no_violations() {
        let (_arena, payload, tracker) = setup(ArenaConfig::new(1), 16);
        payload.chunks()[0]
            .store()
            .write(Actor::Transport, 0, &[1; 16], false)
            .unwrap();
        assert!(tracker.check_invariant().is_ok());
    }

    #[test]
    fn write_into_read_only_claim_is_reported() {
        let (arena, payload, tracker) = setup(ArenaConfig::new(1), 16);
        let a = arena.view(&payload, 0, 8, AccessMode::MutableShared).unwrap();
        let b = arena.view(&payload, 8, 16, AccessMode::MutableShared).unwrap();
        tracker.tag(&a, AccessMode::MutableShared);
        tracker.tag_as(&b, Actor::Consumer, AccessMode::ReadOnly);

        // Lazy cursor write at the end of `a` lands on `b`.
        a.store()
            .ensure_writable(Actor::Transport, a.writer_index(), 2, 0)
            .unwrap();

        let v = tracker.check_invariant().unwrap_err();
        assert_eq!(v.kind, ViolationKind::ReadOnlyMutated);
        assert_eq!(v.view, b.id());
        assert_eq!(v.claimant, Actor::Consumer);
        assert_eq!(v.actor, Actor::Transport);
        assert_eq!(v.range, ByteRange::new(8, 10).unwrap());
    }

    #[test]
    fn writes_before_claim_or_after_release_are_fine() {
        let (arena, payload, tracker) = setup(ArenaConfig::new(1), 16);
        let store = payload.chunks()[0].store().clone();
        let v = arena.view(&payload, 0, 8, AccessMode::ReadOnly).unwrap();

        store.write(Actor::Producer, 0, &[1], false).unwrap();
        tracker.tag_as(&v, Actor::Consumer, AccessMode::ReadOnly);
        assert!(tracker.release(&v, Actor::Consumer).is_some());
        store.write(Actor::Transport, 0, &[2], false).unwrap();

        assert!(tracker.violations().is_empty());
        assert_eq!(tracker.open_claims(), 0);
        assert_eq!(tracker.claim_count(), 1);
    }

    #[test]
    fn release_without_claim_is_none() {
        let (arena, payload, tracker) = setup(ArenaConfig::new(1), 4);
        let v = arena.view(&payload, 0, 4, AccessMode::ReadOnly).unwrap();
        assert!(tracker.release(&v, Actor::Consumer).is_none());
        tracker.tag_as(&v, Actor::Consumer, AccessMode::ReadOnly);
        assert!(tracker.release(&v, Actor::Producer).is_none());
    }

    #[test]
    fn unsynchronized_writers_need_two_actors() {
        let (arena, payload, tracker) = setup(ArenaConfig::new(1), 16);
        let store = payload.chunks()[0].store().clone();
        let v = arena.view(&payload, 0, 16, AccessMode::MutableShared).unwrap();
        tracker.tag(&v, AccessMode::MutableShared);

        store.write(Actor::Producer, 0, &[1, 2], false).unwrap();
        store.write(Actor::Producer, 2, &[3], false).unwrap();
        assert!(tracker.violations().is_empty());

        store.write(Actor::Transport, 4, &[4], true).unwrap();
        assert!(tracker.violations().is_empty());

        store.write(Actor::Transport, 5, &[5], false).unwrap();
        store.write(Actor::Consumer, 6, &[6], false).unwrap();
        let found = tracker.violations();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, ViolationKind::UnsynchronizedWriters);
        assert_eq!(found[0].actor, Actor::Transport);
        assert_eq!(found[0].range, ByteRange::new(5, 6).unwrap());
    }

    #[test]
    fn in_place_growth_with_reader_reports_grown_region() {
        let (arena, payload, tracker) = setup(ArenaConfig::new(1), 64);
        let v = arena.view(&payload, 0, 16, AccessMode::ReadOnly).unwrap();
        tracker.tag_as(&v, Actor::Consumer, AccessMode::ReadOnly);
        payload.chunks()[0]
            .store()
            .ensure_capacity(Actor::Transport, 65);

        let err = tracker.check_invariant().unwrap_err();
        assert_eq!(err.kind, ViolationKind::GrowthWithOutstandingReaders);
        assert_eq!(err.range, ByteRange::new(64, 128).unwrap());
        assert!(err.to_string().contains("store grew with outstanding readers"));
    }

    #[test]
    fn growth_without_readers_is_fine() {
        let (arena, payload, tracker) = setup(ArenaConfig::new(1), 64);
        let v = arena.view(&payload, 0, 16, AccessMode::MutableShared).unwrap();
        tracker.tag(&v, AccessMode::MutableShared);
        payload.chunks()[0]
            .store()
            .ensure_capacity(Actor::Transport, 65);
        assert!(tracker.check_invariant().is_ok());
    }

    #[test]
    fn copy_on_grow_fork_is_never_a_violation() {
        let mut config = ArenaConfig::new(1);
        config.copy_on_grow = true;
        let (arena, payload, tracker) = setup(config, 64);
        let v = arena.view(&payload, 48, 64, AccessMode::ReadOnly).unwrap();
        tracker.tag_as(&v, Actor::Consumer, AccessMode::ReadOnly);
        let outcome = v
            .store()
            .ensure_writable(Actor::Transport, v.writer_index(), 8, 0)
            .unwrap();
        assert_ne!(outcome.store.id(), v.store_id());
        assert!(tracker.check_invariant().is_ok());
    }

    #[test]
    fn stores_are_scanned_in_first_claim_order() {
        let clock = LogicalClock::shared();
        let mut arena = BufferArena::new(ArenaConfig::new(1), clock.clone());
        let payload = arena.allocate_chunked(2, 8);
        let tracker = OwnershipTracker::new(clock);

        let second = arena.view(&payload, 8, 16, AccessMode::ReadOnly).unwrap();
        let first = arena.view(&payload, 0, 8, AccessMode::ReadOnly).unwrap();
        tracker.tag_as(&second, Actor::Consumer, AccessMode::ReadOnly);
        tracker.tag_as(&first, Actor::Consumer, AccessMode::ReadOnly);

        first.store().write(Actor::Transport, 0, &[0], false).unwrap();
        second.store().write(Actor::Transport, 0, &[0], false).unwrap();

        let found = tracker.violations();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].store, second.store_id());
        assert_eq!(tracker.check_invariant().unwrap_err().store, second.store_id());
    }

    proptest! {
        #[test]
        fn read_only_write_reported_iff_overlapping(
            view_start in 0usize..255,
            view_len in 1usize..64,
            write_start in 0usize..255,
            write_len in 1usize..64,
        ) {
            let (arena, payload, tracker) = setup(ArenaConfig::new(1), 256);
            let view_end = (view_start + view_len).min(256);
            let write_end = (write_start + write_len).min(256);
            let v = arena.view(&payload, view_start, view_end, AccessMode::ReadOnly).unwrap();
            tracker.tag_as(&v, Actor::Consumer, AccessMode::ReadOnly);
            payload.chunks()[0]
                .store()
                .write(Actor::Transport, write_start, &vec![0xEE; write_end - write_start], false)
                .unwrap();

            let claimed = ByteRange::new(view_start, view_end).unwrap();
            let written = ByteRange::new(write_start, write_end).unwrap();
            let found = tracker.violations();
            match written.intersection(&claimed) {
                Some(hit) => {
                    prop_assert_eq!(found.len(), 1);
                    prop_assert_eq!(found[0].kind, ViolationKind::ReadOnlyMutated);
                    prop_assert_eq!(found[0].range, hit);
                }
                None => prop_assert!(found.is_empty()),
            }
        }
    }
}
