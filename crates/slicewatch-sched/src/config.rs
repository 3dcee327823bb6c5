//! Scheduler configuration.

use std::time::Duration;

use slicewatch_core::AccessMode;

use crate::error::ScheduleError;

/// Inclusive range `[min, max]` of injected delays, in milliseconds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JitterRange {
    /// Smallest delay.
    pub min_ms: u64,
    /// Largest delay.
    pub max_ms: u64,
}

impl JitterRange {
    /// Create a range. Not validated until the schedule is built.
    pub const fn new(min_ms: u64, max_ms: u64) -> Self {
        Self { min_ms, max_ms }
    }

    /// Every delivery gets exactly `ms` milliseconds.
    pub const fn fixed(ms: u64) -> Self {
        Self::new(ms, ms)
    }

    /// Zero delay.
    pub const fn none() -> Self {
        Self::fixed(0)
    }

    /// The smallest delay as a `Duration`.
    pub fn min(&self) -> Duration {
        Duration::from_millis(self.min_ms)
    }

    /// The largest delay as a `Duration`.
    pub fn max(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }
}

impl Default for JitterRange {
    fn default() -> Self {
        Self::new(
            ScheduleConfig::DEFAULT_JITTER_MIN_MS,
            ScheduleConfig::DEFAULT_JITTER_MAX_MS,
        )
    }
}

/// How often a delay is drawn.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterScope {
    /// One draw per data slice.
    #[default]
    PerSlice,
    /// One draw per source chunk, shared by every slice of the chunk.
    PerChunk,
}

/// Configuration for [`schedule`](crate::schedule).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// Maximum bytes per data slice. Must be non-zero.
    pub slice_size: usize,
    /// Delay range.
    pub jitter: JitterRange,
    /// Draw granularity.
    pub scope: JitterScope,
    /// Emit a 1-byte marker between every pair of data slices.
    pub interleave_markers: bool,
    /// Mode data views are issued with.
    pub view_mode: AccessMode,
    /// Seed for the delay stream.
    pub seed: u64,
}

impl ScheduleConfig {
    /// Default slice size in bytes.
    pub const DEFAULT_SLICE_SIZE: usize = 4000;
    /// Default lower jitter bound in milliseconds.
    pub const DEFAULT_JITTER_MIN_MS: u64 = 100;
    /// Default upper jitter bound in milliseconds.
    pub const DEFAULT_JITTER_MAX_MS: u64 = 300;
    /// Salt mixed into the session seed for the delay stream.
    pub const JITTER_SEED_SALT: u64 = 0x5C4E_D11E_0000_0002;

    /// Defaults with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            slice_size: Self::DEFAULT_SLICE_SIZE,
            jitter: JitterRange::default(),
            scope: JitterScope::PerSlice,
            interleave_markers: false,
            view_mode: AccessMode::MutableShared,
            seed,
        }
    }

    /// Check the slice size and jitter bounds.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.slice_size == 0 {
            return Err(ScheduleError::ZeroSliceSize);
        }
        if self.jitter.min_ms > self.jitter.max_ms {
            return Err(ScheduleError::InvalidJitter {
                min_ms: self.jitter.min_ms,
                max_ms: self.jitter.max_ms,
            });
        }
        Ok(())
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ScheduleConfig::default().validate().is_ok());
        assert_eq!(JitterRange::default().min(), Duration::from_millis(100));
    }

    #[test]
    fn zero_slice_size_rejected() {
        let mut c = ScheduleConfig::new(1);
        c.slice_size = 0;
        assert_eq!(c.validate(), Err(ScheduleError::ZeroSliceSize));
    }

    #[test]
    fn inverted_jitter_rejected() {
        let mut c = ScheduleConfig::new(1);
        c.jitter = JitterRange::new(10, 5);
        assert_eq!(
            c.validate(),
            Err(ScheduleError::InvalidJitter {
                min_ms: 10,
                max_ms: 5
            })
        );
    }
}
