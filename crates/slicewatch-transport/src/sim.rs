//! Deterministic transport simulator with fault injection.
//!
//! Arrival time is `sent_at + delay`. Faults are keyed by sequence number
//! (or by a data byte budget, for stalls) so a scenario replays exactly.
//!
//! The store-mutating faults model a transport that treats a buffer it
//! was handed as its own: it grows it, or lazily writes past the end of
//! the slice it received. With `respect_read_only` set, a `ReadOnly` view
//! is copied first and the copy is mutated and relayed instead.

use std::time::Duration;

use smallvec::smallvec;

use slicewatch_arena::{Growth, View};
use slicewatch_core::{Actor, SeqNo};
use slicewatch_sched::Delivery;

use crate::arrival::{Arrival, Arrivals};
use crate::error::TransportError;
use crate::Transport;

/// A scripted misbehaviour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    /// On relaying delivery `at`, grow its view's store by `additional`
    /// bytes.
    GrowBacking {
        /// Target sequence number.
        at: SeqNo,
        /// Bytes to add to the store's capacity.
        additional: usize,
    },
    /// On relaying delivery `at`, reserve and fill `len` bytes at the
    /// view's writer index. When the view is not the tail of its store,
    /// this overwrites the next slice.
    WriteThrough {
        /// Target sequence number.
        at: SeqNo,
        /// Bytes to write.
        len: usize,
    },
    /// Once `after_bytes` data bytes have been relayed, nothing more
    /// arrives. A delivery that would cross the budget is the first to
    /// stall.
    Stall {
        /// Data bytes that still arrive.
        after_bytes: usize,
    },
    /// Deliver `at` twice.
    Duplicate {
        /// Target sequence number.
        at: SeqNo,
    },
    /// Never deliver `at`, but do not hold the stream open for it.
    Drop {
        /// Target sequence number.
        at: SeqNo,
    },
}

impl Fault {
    /// The sequence number this fault fires on, if it is keyed by one.
    pub fn target(&self) -> Option<SeqNo> {
        match *self {
            Self::GrowBacking { at, .. }
            | Self::WriteThrough { at, .. }
            | Self::Duplicate { at }
            | Self::Drop { at } => Some(at),
            Self::Stall { .. } => None,
        }
    }
}

/// Configuration for a [`SimTransport`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SimConfig {
    /// Virtual time between consecutive hand-offs.
    pub pacing: Duration,
    /// Copy `ReadOnly` views before mutating them.
    pub respect_read_only: bool,
    /// Byte written by [`Fault::WriteThrough`].
    pub filler: u8,
    /// Faults to inject.
    pub faults: Vec<Fault>,
}

impl SimConfig {
    /// Default hand-off interval in milliseconds.
    pub const DEFAULT_PACING_MS: u64 = 1;
    /// Default filler byte.
    pub const DEFAULT_FILLER: u8 = 0xEE;

    /// Add a fault.
    pub fn with_fault(mut self, fault: Fault) -> Self {
        self.faults.push(fault);
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            pacing: Duration::from_millis(Self::DEFAULT_PACING_MS),
            respect_read_only: true,
            filler: Self::DEFAULT_FILLER,
            faults: Vec::new(),
        }
    }
}

/// Counters describing what a [`SimTransport`] did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    /// Deliveries handed to `relay`.
    pub relayed: u64,
    /// Data bytes handed to `relay`.
    pub data_bytes: u64,
    /// Store mutations performed.
    pub mutations: u32,
    /// `ReadOnly` views copied before a mutation.
    pub copies_before_write: u32,
    /// Deliveries that will never arrive because of a stall.
    pub stalled: u32,
    /// Deliveries dropped.
    pub dropped: u32,
    /// Extra arrivals produced by duplication.
    pub duplicated: u32,
}

/// A deterministic [`Transport`].
#[derive(Debug)]
pub struct SimTransport {
    config: SimConfig,
    fired: Vec<bool>,
    stalled: bool,
    stats: TransportStats,
}

impl SimTransport {
    /// Create a simulator.
    pub fn new(config: SimConfig) -> Self {
        let fired = vec![false; config.faults.len()];
        Self {
            config,
            fired,
            stalled: false,
            stats: TransportStats::default(),
        }
    }

    /// The simulator's configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Counters so far.
    pub fn stats(&self) -> TransportStats {
        self.stats
    }

    /// Apply a store-mutating fault to `view`, copying first if the view is
    /// read-only and the transport respects that. Returns the view to relay.
    fn mutate(&mut self, view: View, fault: Fault) -> Result<View, TransportError> {
        let view = if self.config.respect_read_only && view.mode().is_read_only() {
            self.stats.copies_before_write += 1;
            view.detach(Actor::Transport)
        } else {
            view
        };
        let store = view.store();
        let growth = match fault {
            Fault::GrowBacking { additional, .. } => {
                let target = store.capacity().saturating_add(additional);
                store.ensure_capacity(Actor::Transport, target)
            }
            Fault::WriteThrough { len, .. } => {
                store
                    .ensure_writable(Actor::Transport, view.writer_index(), len, self.config.filler)?
                    .growth
            }
            Fault::Stall { .. } | Fault::Duplicate { .. } | Fault::Drop { .. } => Growth::Unchanged,
        };
        self.stats.mutations += 1;
        tracing::debug!(
            view = %view.id(), store = %store.id(), ?fault, grown = ?growth.grown_region(),
            "transport mutated store"
        );
        Ok(view)
    }
}

impl Transport for SimTransport {
    fn relay(&mut self, mut delivery: Delivery, sent_at: Duration) -> Result<Arrivals, TransportError> {
        self.stats.relayed += 1;
        let seq = delivery.seq;

        let mut drop = false;
        let mut duplicate = false;
        for i in 0..self.config.faults.len() {
            let fault = self.config.faults[i];
            if fault.target() != Some(seq) {
                continue;
            }
            self.fired[i] = true;
            match fault {
                Fault::GrowBacking { .. } | Fault::WriteThrough { .. } => {
                    delivery.view = self.mutate(delivery.view, fault)?;
                }
                Fault::Duplicate { .. } => duplicate = true,
                Fault::Drop { .. } => drop = true,
                Fault::Stall { .. } => {}
            }
        }

        if !delivery.is_marker() {
            let budget = self.config.faults.iter().find_map(|f| match *f {
                Fault::Stall { after_bytes } => Some(after_bytes as u64),
                _ => None,
            });
            let relayed_after = self.stats.data_bytes + delivery.len() as u64;
            if budget.is_some_and(|b| relayed_after > b) && !self.stalled {
                self.stalled = true;
                tracing::debug!(%seq, data_bytes = self.stats.data_bytes, "transport stalled");
            }
            self.stats.data_bytes = relayed_after;
        }

        if self.stalled {
            self.stats.stalled += 1;
            return Ok(smallvec![Arrival::never(delivery)]);
        }
        if drop {
            self.stats.dropped += 1;
            tracing::debug!(%seq, "transport dropped delivery");
            return Ok(Arrivals::new());
        }

        let at = sent_at.saturating_add(delivery.delay);
        if duplicate {
            self.stats.duplicated += 1;
            tracing::debug!(%seq, "transport duplicated delivery");
            return Ok(smallvec![
                Arrival::at(delivery.clone(), at),
                Arrival::at(delivery, at)
            ]);
        }
        Ok(smallvec![Arrival::at(delivery, at)])
    }

    fn pacing(&self) -> Duration {
        self.config.pacing
    }

    fn finish(&mut self) -> Result<(), TransportError> {
        let unfired = self
            .config
            .faults
            .iter()
            .zip(&self.fired)
            .find(|(f, fired)| f.target().is_some() && !**fired);
        match unfired {
            Some((fault, _)) => Err(TransportError::FaultOutOfRange {
                fault: *fault,
                relayed: self.stats.relayed,
            }),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slicewatch_arena::{ArenaConfig, BufferArena, Payload};
    use slicewatch_core::{AccessMode, ByteRange, LogicalClock};
    use slicewatch_sched::{schedule, JitterRange, ScheduleConfig};
    use slicewatch_tracker::{OwnershipTracker, ViolationKind};

    fn outbound(arena: &BufferArena, payload: &Payload, config: &ScheduleConfig) -> Vec<Delivery> {
        schedule(arena, payload, config)
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    }

    fn sched(slice_size: usize, mode: AccessMode) -> ScheduleConfig {
        let mut c = ScheduleConfig::new(11);
        c.slice_size = slice_size;
        c.view_mode = mode;
        c
    }

    #[test]
    fn arrival_is_send_time_plus_delay() {
        let mut arena = BufferArena::new(ArenaConfig::new(1), LogicalClock::shared());
        let payload = arena.allocate(40);
        let ds = outbound(&arena, &payload, &sched(10, AccessMode::MutableShared));
        let delays: Vec<_> = ds.iter().map(|d| d.delay).collect();

        let mut sim = SimTransport::new(SimConfig::default());
        let arrivals = sim.send(ds, Duration::ZERO).unwrap();
        assert_eq!(arrivals.len(), 4);
        for a in &arrivals {
            let i = a.delivery.seq.0 as usize;
            assert_eq!(a.at, Some(Duration::from_millis(i as u64) + delays[i]));
        }
        // Consumer order is by arrival time.
        assert!(arrivals.windows(2).all(|w| w[0].at <= w[1].at));
        assert_eq!(sim.stats().data_bytes, 40);
    }

    #[test]
    fn write_through_clobbers_next_slice() {
        let mut arena = BufferArena::new(ArenaConfig::new(1), LogicalClock::shared());
        let payload = arena.allocate(40);
        let ds = outbound(&arena, &payload, &sched(10, AccessMode::MutableShared));
        let next_view = ds[1].view.clone();

        let config = SimConfig::default().with_fault(Fault::WriteThrough { at: SeqNo(0), len: 3 });
        let mut sim = SimTransport::new(config);
        sim.send(ds, Duration::ZERO).unwrap();

        assert_eq!(&next_view.read()[..3], &[SimConfig::DEFAULT_FILLER; 3]);
        assert_eq!(&next_view.read()[3..], &payload.bytes()[13..20]);
        assert_eq!(sim.stats().mutations, 1);
        assert_eq!(sim.stats().copies_before_write, 0);
    }

    #[test]
    fn read_only_views_are_copied_before_write() {
        let mut arena = BufferArena::new(ArenaConfig::new(1), LogicalClock::shared());
        let payload = arena.allocate(40);
        let ds = outbound(&arena, &payload, &sched(10, AccessMode::ReadOnly));
        let original_store = ds[0].view.store_id();

        let config = SimConfig::default().with_fault(Fault::WriteThrough { at: SeqNo(0), len: 3 });
        let mut sim = SimTransport::new(config);
        let arrivals = sim.send(ds, Duration::ZERO).unwrap();

        let first = arrivals.iter().find(|a| a.delivery.seq == SeqNo(0)).unwrap();
        assert_ne!(first.delivery.view.store_id(), original_store);
        assert_eq!(&*first.delivery.view.read(), &payload.bytes()[..10]);
        let shared = payload.chunks()[0].store();
        assert_eq!(shared.read_range(ByteRange::new(0, 40).unwrap()).unwrap(), payload.bytes());
        assert_eq!(sim.stats().copies_before_write, 1);
    }

    #[test]
    fn ignoring_read_only_is_caught_by_tracker() {
        let clock = LogicalClock::shared();
        let mut arena = BufferArena::new(ArenaConfig::new(1), clock.clone());
        let payload = arena.allocate(40);
        let tracker = OwnershipTracker::new(clock);
        let ds: Vec<_> = schedule(&arena, &payload, &sched(10, AccessMode::ReadOnly))
            .unwrap()
            .with_tracker(&tracker)
            .collect::<Result<_, _>>()
            .unwrap();

        let config = SimConfig {
            respect_read_only: false,
            ..SimConfig::default()
        }
        .with_fault(Fault::WriteThrough { at: SeqNo(1), len: 2 });
        SimTransport::new(config).send(ds, Duration::ZERO).unwrap();

        let v = tracker.check_invariant().unwrap_err();
        assert_eq!(v.kind, ViolationKind::ReadOnlyMutated);
        assert_eq!(v.range, ByteRange::new(20, 22).unwrap());
    }

    #[test]
    fn grow_backing_grows_in_place() {
        let mut arena = BufferArena::new(ArenaConfig::new(1), LogicalClock::shared());
        let payload = arena.allocate(40);
        let ds = outbound(&arena, &payload, &sched(10, AccessMode::MutableShared));
        let config = SimConfig::default().with_fault(Fault::GrowBacking {
            at: SeqNo(2),
            additional: 1,
        });
        SimTransport::new(config).send(ds, Duration::ZERO).unwrap();
        assert_eq!(payload.chunks()[0].store().capacity(), 80);
        assert_eq!(arena.stats().in_place_growths, 1);
    }

    #[test]
    fn stall_withholds_everything_past_budget() {
        let mut arena = BufferArena::new(ArenaConfig::new(1), LogicalClock::shared());
        let payload = arena.allocate(100);
        let mut c = sched(10, AccessMode::MutableShared);
        c.interleave_markers = true;
        let ds = outbound(&arena, &payload, &c);
        let config = SimConfig::default().with_fault(Fault::Stall { after_bytes: 35 });
        let mut sim = SimTransport::new(config);
        let arrivals = sim.send(ds, Duration::ZERO).unwrap();

        let arrived: usize = arrivals
            .iter()
            .filter(|a| !a.is_never() && !a.delivery.is_marker())
            .map(|a| a.delivery.len())
            .sum();
        assert_eq!(arrived, 30);
        assert!(arrivals.last().unwrap().is_never());
        // 7 data slices and the 6 markers after the third slice.
        assert_eq!(sim.stats().stalled, 13);
    }

    #[test]
    fn duplicate_and_drop() {
        let mut arena = BufferArena::new(ArenaConfig::new(1), LogicalClock::shared());
        let payload = arena.allocate(30);
        let mut c = sched(10, AccessMode::MutableShared);
        c.jitter = JitterRange::none();
        let ds = outbound(&arena, &payload, &c);
        let config = SimConfig::default()
            .with_fault(Fault::Duplicate { at: SeqNo(0) })
            .with_fault(Fault::Drop { at: SeqNo(2) });
        let mut sim = SimTransport::new(config);
        let seqs: Vec<_> = sim
            .send(ds, Duration::ZERO)
            .unwrap()
            .iter()
            .map(|a| a.delivery.seq.0)
            .collect();
        assert_eq!(seqs, vec![0, 0, 1]);
        assert_eq!(sim.stats().dropped, 1);
        assert_eq!(sim.stats().duplicated, 1);
    }

    #[test]
    fn unfired_fault_is_reported() {
        let mut arena = BufferArena::new(ArenaConfig::new(1), LogicalClock::shared());
        let payload = arena.allocate(20);
        let ds = outbound(&arena, &payload, &sched(10, AccessMode::MutableShared));
        let fault = Fault::Drop { at: SeqNo(9) };
        let mut sim = SimTransport::new(SimConfig::default().with_fault(fault));
        assert_eq!(
            sim.send(ds, Duration::ZERO).unwrap_err(),
            TransportError::FaultOutOfRange { fault, relayed: 2 }
        );
    }
}
