//! Half-open byte ranges.

use std::fmt;

/// A half-open range `[start, end)` of byte offsets.
///
/// Unlike `std::ops::Range<usize>` this type is `Copy` and carries the
/// overlap arithmetic the tracker needs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ByteRange {
    /// First byte offset (inclusive).
    pub start: usize,
    /// One past the last byte offset (exclusive).
    pub end: usize,
}

impl ByteRange {
    /// Create a range. Returns `None` if `start > end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Create a range from a start offset and a length.
    ///
    /// Returns `None` if `start + len` overflows.
    pub fn from_len(start: usize, len: usize) -> Option<Self> {
        let end = start.checked_add(len)?;
        Some(Self { start, end })
    }

    /// Number of bytes covered.
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Whether the range covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether the two ranges share at least one byte.
    ///
    /// Empty ranges never overlap anything.
    pub fn overlaps(&self, other: &ByteRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// The shared sub-range, if any.
    pub fn intersection(&self, other: &ByteRange) -> Option<ByteRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(ByteRange {
            start: self.start.max(other.start),
            end: self.end.min(other.end),
        })
    }

    /// Whether `other` lies entirely inside `self`.
    pub fn contains(&self, other: &ByteRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Shift both ends by `delta`. Returns `None` on overflow.
    pub fn shifted(&self, delta: usize) -> Option<ByteRange> {
        Some(ByteRange {
            start: self.start.checked_add(delta)?,
            end: self.end.checked_add(delta)?,
        })
    }

    /// Convert to a `std::ops::Range` for slicing.
    pub fn as_range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}
