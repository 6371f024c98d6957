//! Inclusive content ranges.

use std::fmt;

/// An inclusive range of content offsets, `[start, end]`.
///
/// A single character occupies a range of length 1 (`start == end`). Node ranges include the
/// node's own tag markers, so an element with no content spans exactly two cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentRange {
    /// First offset in the range.
    pub start: usize,
    /// Last offset in the range (inclusive).
    pub end: usize,
}

impl ContentRange {
    /// Create a range. `start` must not be greater than `end`.
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(start <= end, "range start {start} is after end {end}");
        Self { start, end }
    }

    /// Create a range from a start offset and a non-zero length.
    pub fn with_length(start: usize, length: usize) -> Self {
        Self::new(start, start + length.max(1) - 1)
    }

    /// Number of offsets in the range.
    pub fn length(&self) -> usize {
        self.end - self.start + 1
    }

    /// Returns `true` if `offset` lies in the range.
    pub fn contains_offset(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Returns `true` if `other` lies completely inside this range.
    pub fn contains(&self, other: &ContentRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns `true` if the ranges share at least one offset.
    pub fn intersects(&self, other: &ContentRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// The offsets both ranges share, if any.
    pub fn intersection(&self, other: &ContentRange) -> Option<ContentRange> {
        if self.intersects(other) {
            Some(ContentRange::new(
                self.start.max(other.start),
                self.end.min(other.end),
            ))
        } else {
            None
        }
    }

    /// The smallest range covering both ranges.
    pub fn union(&self, other: &ContentRange) -> ContentRange {
        ContentRange::new(self.start.min(other.start), self.end.max(other.end))
    }

    /// Shift both ends by `delta`. Returns `None` if the result would be negative.
    pub fn move_by(&self, delta: isize) -> Option<ContentRange> {
        Some(ContentRange::new(
            self.start.checked_add_signed(delta)?,
            self.end.checked_add_signed(delta)?,
        ))
    }

    /// Move the start by `delta_start` and the end by `delta_end`.
    ///
    /// Returns `None` if either end would become negative or the range would invert.
    pub fn resize_by(&self, delta_start: isize, delta_end: isize) -> Option<ContentRange> {
        let start = self.start.checked_add_signed(delta_start)?;
        let end = self.end.checked_add_signed(delta_end)?;
        (start <= end).then(|| ContentRange::new(start, end))
    }
}

impl fmt::Display for ContentRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.start, self.end)
    }
}
