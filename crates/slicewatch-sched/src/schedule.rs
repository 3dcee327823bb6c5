//! The lazy delivery sequence.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use slicewatch_arena::{BufferArena, Payload};
use slicewatch_core::{AccessMode, SeqNo};
use slicewatch_tracker::OwnershipTracker;

use crate::config::{JitterScope, ScheduleConfig};
use crate::delivery::{Delivery, DeliveryKind};
use crate::error::ScheduleError;

/// Number of slices a chunk of `len` bytes splits into.
///
/// An exact multiple of `slice_size` yields no zero-length trailing slice.
pub fn slice_count(len: usize, slice_size: usize) -> usize {
    if slice_size == 0 {
        return 0;
    }
    len.div_ceil(slice_size)
}

/// Slice `payload` into deliveries.
///
/// Validates `config` up front; the returned iterator issues views as it
/// is advanced.
pub fn schedule<'a>(
    arena: &'a BufferArena,
    payload: &'a Payload,
    config: &ScheduleConfig,
) -> Result<Schedule<'a>, ScheduleError> {
    config.validate()?;
    tracing::debug!(
        payload = %payload.id(), len = payload.len(), chunks = payload.chunk_count(),
        slice_size = config.slice_size, markers = config.interleave_markers,
        "schedule built"
    );
    Ok(Schedule {
        arena,
        payload,
        tracker: None,
        config: config.clone(),
        rng: ChaCha8Rng::seed_from_u64(config.seed ^ ScheduleConfig::JITTER_SEED_SALT),
        chunk: 0,
        pos: 0,
        chunk_delay: None,
        last_delay: Duration::ZERO,
        remaining: payload.len(),
        marker_due: false,
        next_seq: 0,
    })
}

/// Iterator of [`Delivery`] values in payload order.
///
/// Data slices are contiguous and non-overlapping within each chunk.
/// With markers enabled, a marker follows every data slice except the
/// last; it inherits that slice's delay and draws nothing from the RNG,
/// so data delays are the same with or without markers.
pub struct Schedule<'a> {
    arena: &'a BufferArena,
    payload: &'a Payload,
    tracker: Option<&'a OwnershipTracker>,
    config: ScheduleConfig,
    rng: ChaCha8Rng,
    chunk: usize,
    pos: usize,
    chunk_delay: Option<Duration>,
    last_delay: Duration,
    remaining: usize,
    marker_due: bool,
    next_seq: u64,
}

impl<'a> Schedule<'a> {
    /// Tag every issued view with the producer's claim on `tracker`.
    pub fn with_tracker(mut self, tracker: &'a OwnershipTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    fn next_seq(&mut self) -> SeqNo {
        let seq = SeqNo(self.next_seq);
        self.next_seq += 1;
        seq
    }

    fn draw(&mut self) -> Duration {
        let jitter = self.config.jitter;
        Duration::from_millis(self.rng.random_range(jitter.min_ms..=jitter.max_ms))
    }

    fn delay_for_slice(&mut self) -> Duration {
        match self.config.scope {
            JitterScope::PerSlice => self.draw(),
            JitterScope::PerChunk => match self.chunk_delay {
                Some(d) => d,
                None => {
                    let d = self.draw();
                    self.chunk_delay = Some(d);
                    d
                }
            },
        }
    }

    fn marker(&mut self) -> Delivery {
        let view = self.arena.marker_view();
        if let Some(tracker) = self.tracker {
            tracker.tag(&view, AccessMode::ReadOnly);
        }
        Delivery {
            seq: self.next_seq(),
            view,
            delay: self.last_delay,
            kind: DeliveryKind::Marker,
        }
    }
}

impl Iterator for Schedule<'_> {
    type Item = Result<Delivery, ScheduleError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.marker_due {
            self.marker_due = false;
            return Some(Ok(self.marker()));
        }
        loop {
            let chunk = self.payload.chunks().get(self.chunk)?;
            let (index, chunk_len, chunk_start) = (chunk.index(), chunk.len(), chunk.range().start);
            if self.pos >= chunk_len {
                self.chunk += 1;
                self.pos = 0;
                self.chunk_delay = None;
                continue;
            }

            let start = self.pos;
            let end = (start + self.config.slice_size).min(chunk_len);
            let view = match self.arena.view_chunk(
                self.payload,
                index,
                start,
                end,
                self.config.view_mode,
            ) {
                Ok(v) => v,
                Err(e) => return Some(Err(e.into())),
            };
            if let Some(tracker) = self.tracker {
                tracker.tag(&view, self.config.view_mode);
            }

            let delay = self.delay_for_slice();
            self.last_delay = delay;
            self.pos = end;
            self.remaining -= end - start;
            self.marker_due = self.config.interleave_markers && self.remaining > 0;

            let delivery = Delivery {
                seq: self.next_seq(),
                view,
                delay,
                kind: DeliveryKind::Data {
                    offset: chunk_start + start,
                },
            };
            tracing::trace!(seq = %delivery.seq, chunk = %index, offset = chunk_start + start, len = end - start, ?delay, "slice scheduled");
            return Some(Ok(delivery));
        }
    }
}
