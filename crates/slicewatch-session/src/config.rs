//! Session configuration, validation, and error types.
//!
//! Every toggle a run depends on lives in [`SessionConfig`], and the whole
//! config is copied into the [`SessionReport`](crate::SessionReport) so a
//! failure reproduces from the report alone.

use std::error::Error;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use slicewatch_arena::{ArenaConfig, FillMode};
use slicewatch_core::AccessMode;
use slicewatch_sched::{JitterRange, JitterScope, ScheduleConfig, ScheduleError};
use slicewatch_verify::ReassemblyOrder;

// ── ExecutionMode ──────────────────────────────────────────────────

/// How a session drives its actors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Virtual clock, single thread, fully deterministic.
    #[default]
    Lockstep,
    /// A producer thread sleeps until each event and hands arrivals to the
    /// calling thread over a bounded channel.
    Realtime,
}

// ── PayloadSource ──────────────────────────────────────────────────

/// Where the payload bytes come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadSource {
    /// `chunk_count` chunks of `chunk_len` generated bytes, each in its
    /// own backing store.
    Generated {
        /// Number of source buffers.
        chunk_count: usize,
        /// Bytes per source buffer.
        chunk_len: usize,
    },
    /// Every byte of a fixture file, as one chunk.
    Fixture(PathBuf),
}

impl PayloadSource {
    /// Length in bytes, if known without I/O.
    pub fn len_hint(&self) -> Option<usize> {
        match self {
            Self::Generated {
                chunk_count,
                chunk_len,
            } => chunk_count.checked_mul(*chunk_len),
            Self::Fixture(_) => None,
        }
    }
}

impl Default for PayloadSource {
    fn default() -> Self {
        Self::Generated {
            chunk_count: SessionConfig::DEFAULT_CHUNK_COUNT,
            chunk_len: SessionConfig::DEFAULT_CHUNK_LEN,
        }
    }
}

// ── SessionConfig ──────────────────────────────────────────────────

/// Everything one session run depends on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seed for payload bytes and delays. Same seed, same outcome.
    pub seed: u64,
    /// Payload to stream.
    pub payload: PayloadSource,
    /// Fill for generated payloads.
    pub fill: FillMode,
    /// Maximum bytes per data slice. Default: 4000.
    pub slice_size: usize,
    /// Injected delay range. Default: 100..=300 ms.
    pub jitter: JitterRange,
    /// Draw one delay per slice or per chunk.
    pub jitter_scope: JitterScope,
    /// Interleave 1-byte markers between data slices.
    pub interleave_markers: bool,
    /// Mode data views are issued with. `ReadOnly` is the read-only
    /// wrapping fix.
    pub view_mode: AccessMode,
    /// Copy bytes into a private store for every view.
    pub copy_on_view: bool,
    /// Fork stores on growth instead of reallocating in place.
    pub copy_on_grow: bool,
    /// How received data is reassembled.
    pub reassembly: ReassemblyOrder,
    /// The stream must complete within this much (virtual or wall) time.
    /// Default: 120 s.
    pub deadline: Duration,
    /// Lockstep or realtime.
    pub mode: ExecutionMode,
    /// Capacity of the realtime arrival channel. Default: 64.
    pub channel_capacity: usize,
    /// Write received data bytes here, in the order received.
    pub record_to: Option<PathBuf>,
}

impl SessionConfig {
    /// Default number of source buffers.
    pub const DEFAULT_CHUNK_COUNT: usize = 3;
    /// Default bytes per source buffer.
    pub const DEFAULT_CHUNK_LEN: usize = 64_000;
    /// Default stream deadline in seconds.
    pub const DEFAULT_DEADLINE_SECS: u64 = 120;
    /// Default realtime channel capacity.
    pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

    /// Defaults with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            payload: PayloadSource::default(),
            fill: FillMode::Random,
            slice_size: ScheduleConfig::DEFAULT_SLICE_SIZE,
            jitter: JitterRange::default(),
            jitter_scope: JitterScope::PerSlice,
            interleave_markers: false,
            view_mode: AccessMode::MutableShared,
            copy_on_view: false,
            copy_on_grow: false,
            reassembly: ReassemblyOrder::ByOffset,
            deadline: Duration::from_secs(Self::DEFAULT_DEADLINE_SECS),
            mode: ExecutionMode::Lockstep,
            channel_capacity: Self::DEFAULT_CHANNEL_CAPACITY,
            record_to: None,
        }
    }

    /// Set a generated payload of `chunk_count × chunk_len` bytes.
    pub fn with_chunks(mut self, chunk_count: usize, chunk_len: usize) -> Self {
        self.payload = PayloadSource::Generated {
            chunk_count,
            chunk_len,
        };
        self
    }

    /// Set the slice size.
    pub fn with_slice_size(mut self, slice_size: usize) -> Self {
        self.slice_size = slice_size;
        self
    }

    /// Set the jitter range.
    pub fn with_jitter(mut self, jitter: JitterRange) -> Self {
        self.jitter = jitter;
        self
    }

    /// Set the execution mode.
    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule_config().validate()?;
        if self.deadline.is_zero() {
            return Err(ConfigError::ZeroDeadline);
        }
        if self.channel_capacity == 0 {
            return Err(ConfigError::ZeroChannelCapacity);
        }
        if let PayloadSource::Generated {
            chunk_count,
            chunk_len,
        } = self.payload
        {
            if chunk_count.checked_mul(chunk_len).is_none() {
                return Err(ConfigError::PayloadTooLarge {
                    chunk_count,
                    chunk_len,
                });
            }
        }
        Ok(())
    }

    /// The arena half of this config.
    pub fn arena_config(&self) -> ArenaConfig {
        ArenaConfig {
            seed: self.seed,
            fill: self.fill,
            copy_on_view: self.copy_on_view,
            copy_on_grow: self.copy_on_grow,
        }
    }

    /// The scheduler half of this config.
    pub fn schedule_config(&self) -> ScheduleConfig {
        ScheduleConfig {
            slice_size: self.slice_size,
            jitter: self.jitter,
            scope: self.jitter_scope,
            interleave_markers: self.interleave_markers,
            view_mode: self.view_mode,
            seed: self.seed,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`SessionConfig::validate()`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Slice size or jitter bounds are invalid.
    Schedule(ScheduleError),
    /// The deadline is zero.
    ZeroDeadline,
    /// The realtime channel capacity is zero.
    ZeroChannelCapacity,
    /// `chunk_count × chunk_len` overflows.
    PayloadTooLarge {
        /// Configured chunk count.
        chunk_count: usize,
        /// Configured chunk length.
        chunk_len: usize,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Schedule(e) => write!(f, "schedule: {e}"),
            Self::ZeroDeadline => write!(f, "deadline must be non-zero"),
            Self::ZeroChannelCapacity => write!(f, "channel capacity must be non-zero"),
            Self::PayloadTooLarge {
                chunk_count,
                chunk_len,
            } => write!(f, "payload of {chunk_count} x {chunk_len} bytes overflows"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schedule(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ScheduleError> for ConfigError {
    fn from(e: ScheduleError) -> Self {
        Self::Schedule(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reproduction_case() {
        let c = SessionConfig::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.payload.len_hint(), Some(192_000));
        assert_eq!(c.slice_size, 4000);
        assert_eq!(c.deadline, Duration::from_secs(120));
        assert_eq!(c.mode, ExecutionMode::Lockstep);
        assert!(!c.copy_on_view && !c.copy_on_grow);
    }

    #[test]
    fn zero_slice_size_rejected() {
        let c = SessionConfig::new(1).with_slice_size(0);
        assert_eq!(
            c.validate(),
            Err(ConfigError::Schedule(ScheduleError::ZeroSliceSize))
        );
    }

    #[test]
    fn inverted_jitter_rejected() {
        let c = SessionConfig::new(1).with_jitter(JitterRange::new(5, 1));
        assert!(matches!(
            c.validate(),
            Err(ConfigError::Schedule(ScheduleError::InvalidJitter { .. }))
        ));
    }

    #[test]
    fn zero_deadline_and_capacity_rejected() {
        let mut c = SessionConfig::new(1);
        c.deadline = Duration::ZERO;
        assert_eq!(c.validate(), Err(ConfigError::ZeroDeadline));
        let mut c = SessionConfig::new(1);
        c.channel_capacity = 0;
        assert_eq!(c.validate(), Err(ConfigError::ZeroChannelCapacity));
    }

    #[test]
    fn overflowing_payload_rejected() {
        let c = SessionConfig::new(1).with_chunks(usize::MAX, 2);
        assert!(matches!(
            c.validate(),
            Err(ConfigError::PayloadTooLarge { .. })
        ));
    }

    #[test]
    fn halves_carry_the_seed() {
        let mut c = SessionConfig::new(77);
        c.copy_on_view = true;
        c.view_mode = AccessMode::ReadOnly;
        assert_eq!(c.arena_config().seed, 77);
        assert!(c.arena_config().copy_on_view);
        assert_eq!(c.schedule_config().seed, 77);
        assert_eq!(c.schedule_config().view_mode, AccessMode::ReadOnly);
    }
}
