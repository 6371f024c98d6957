//! Gap-buffer content storage.
//!
//! [`Content`] is the single source of truth for a document's characters. Besides ordinary
//! characters it stores [`TAG_MARKER`] cells, which mark the start and end boundaries of
//! structural nodes. Plain-text reads skip markers; raw reads keep them.
//!
//! The buffer keeps a free region (the gap) and moves it to each edit point, so a run of edits
//! near the same place costs little more than the characters it touches. When the gap is too
//! small the buffer grows: it doubles below [`ContentConfig::growth_threshold`] and grows by a
//! tenth above it.
//!
//! The content also owns the table behind every [`Position`] created from it and adjusts that
//! table on each insert and remove.

use crate::config::ContentConfig;
use crate::error::DocumentError;
use crate::position::{Position, PositionSlot};
use crate::range::ContentRange;
use log::trace;
use std::fmt;
use std::rc::Rc;

/// The reserved character that marks a node boundary in the content.
///
/// Text inserted through the document layer never contains it, because control characters
/// other than newline are replaced with spaces.
pub const TAG_MARKER: char = '\0';

/// A character buffer with tag markers and live positions.
pub struct Content {
    buffer: Vec<char>,
    gap_start: usize,
    gap_end: usize,
    /// Sorted by offset. A slot whose only owner is this table is dead.
    positions: Vec<Rc<PositionSlot>>,
    config: ContentConfig,
}

impl Content {
    /// Create an empty content buffer with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ContentConfig::default())
    }

    /// Create an empty content buffer reserving `capacity` cells.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(ContentConfig::with_capacity(capacity))
    }

    /// Create an empty content buffer with explicit tuning.
    pub fn with_config(config: ContentConfig) -> Self {
        let capacity = config.initial_capacity;
        Self {
            buffer: vec![TAG_MARKER; capacity],
            gap_start: 0,
            gap_end: capacity,
            positions: Vec::new(),
            config,
        }
    }

    fn from_chars(chars: &[char], config: ContentConfig) -> Self {
        let mut content = Self::with_config(ContentConfig {
            initial_capacity: chars.len(),
            ..config
        });
        content.buffer[..chars.len()].copy_from_slice(chars);
        content.gap_start = chars.len();
        content
    }

    /// Number of cells (characters and tag markers).
    pub fn len(&self) -> usize {
        self.buffer.len() - self.gap_len()
    }

    /// Returns `true` if the buffer holds no cells.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Allocated cells, including the gap.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// The range covering the whole buffer, or `None` when it is empty.
    pub fn range(&self) -> Option<ContentRange> {
        (!self.is_empty()).then(|| ContentRange::new(0, self.len() - 1))
    }

    /// The tuning this buffer was created with.
    pub fn config(&self) -> ContentConfig {
        self.config
    }

    /// Insert `text` before the cell at `offset` (`0..=len`).
    pub fn insert_text(&mut self, offset: usize, text: &str) -> Result<(), DocumentError> {
        let chars: Vec<char> = text.chars().collect();
        self.insert_chars(offset, &chars)
    }

    /// Insert a single tag marker before the cell at `offset` (`0..=len`).
    pub fn insert_tag_marker(&mut self, offset: usize) -> Result<(), DocumentError> {
        self.insert_chars(offset, &[TAG_MARKER])
    }

    /// Splice all cells of `other`, markers included, in before `offset`.
    pub fn insert_content(&mut self, offset: usize, other: &Content) -> Result<(), DocumentError> {
        let chars: Vec<char> = match other.range() {
            Some(range) => other.cells(range).collect(),
            None => Vec::new(),
        };
        self.insert_chars(offset, &chars)
    }

    /// Remove the cells in `range`.
    pub fn remove(&mut self, range: ContentRange) -> Result<(), DocumentError> {
        self.check_range(range)?;

        self.move_gap(range.start);
        self.gap_end += range.length();

        let removed = range.length();
        let first = self.positions.partition_point(|slot| slot.offset() <= range.start);
        for slot in &self.positions[first..] {
            let offset = slot.offset();
            if offset > range.end {
                slot.set_offset(offset - removed);
            } else {
                slot.set_offset(range.start);
            }
        }
        self.prune_positions();
        Ok(())
    }

    /// Characters in `range` with tag markers left out.
    pub fn text(&self, range: ContentRange) -> Result<String, DocumentError> {
        self.check_range(range)?;
        Ok(self.cells(range).filter(|c| *c != TAG_MARKER).collect())
    }

    /// Cells in `range`, tag markers included.
    pub fn raw_text(&self, range: ContentRange) -> Result<String, DocumentError> {
        self.check_range(range)?;
        Ok(self.cells(range).collect())
    }

    /// The cell at `offset`.
    pub fn char_at(&self, offset: usize) -> Result<char, DocumentError> {
        if offset >= self.len() {
            return Err(DocumentError::offset(
                offset,
                0,
                self.len().saturating_sub(1),
            ));
        }
        let index = if offset < self.gap_start {
            offset
        } else {
            offset + self.gap_len()
        };
        Ok(self.buffer[index])
    }

    /// Returns `true` if the cell at `offset` is a tag marker.
    pub fn is_tag_marker(&self, offset: usize) -> Result<bool, DocumentError> {
        Ok(self.char_at(offset)? == TAG_MARKER)
    }

    /// Copy the cells in `range` into a new, independent buffer without positions.
    pub fn content(&self, range: ContentRange) -> Result<Content, DocumentError> {
        self.check_range(range)?;
        let chars: Vec<char> = self.cells(range).collect();
        Ok(Content::from_chars(&chars, self.config))
    }

    /// Create a position tracking `offset` (`0..=len`).
    pub fn create_position(&mut self, offset: usize) -> Result<Position, DocumentError> {
        self.check_insertion_offset(offset)?;

        let index = self.positions.partition_point(|slot| slot.offset() < offset);
        if let Some(slot) = self.positions.get(index)
            && slot.offset() == offset
        {
            return Ok(Position::new(Rc::clone(slot)));
        }

        let slot = PositionSlot::new(offset);
        self.positions.insert(index, Rc::clone(&slot));
        Ok(Position::new(slot))
    }

    /// Stop tracking `position`.
    ///
    /// The underlying slot stays tracked while other handles at the same place still use it.
    pub fn remove_position(&mut self, position: &mut Position) {
        let offset = position.offset();
        let first = self.positions.partition_point(|slot| slot.offset() < offset);
        let found = self.positions[first..]
            .iter()
            .take_while(|slot| slot.offset() == offset)
            .position(|slot| position.shares_slot(slot))
            .map(|i| first + i);

        position.release();

        if let Some(index) = found
            && Rc::strong_count(&self.positions[index]) == 1
        {
            self.positions.remove(index);
        }
    }

    /// Number of tracked slots that still have at least one live handle.
    pub fn position_count(&self) -> usize {
        self.positions
            .iter()
            .filter(|slot| Rc::strong_count(slot) > 1)
            .count()
    }

    /// Number of live position handles across all slots.
    pub fn position_handle_count(&self) -> usize {
        self.positions
            .iter()
            .map(|slot| Rc::strong_count(slot) - 1)
            .sum()
    }

    pub(crate) fn cells(&self, range: ContentRange) -> impl Iterator<Item = char> + '_ {
        let (start, end) = (range.start, range.end + 1);
        let gap = self.gap_len();
        let before = &self.buffer[start.min(self.gap_start)..end.min(self.gap_start)];
        let after =
            &self.buffer[start.max(self.gap_start) + gap..end.max(self.gap_start) + gap];
        before.iter().chain(after.iter()).copied()
    }

    fn insert_chars(&mut self, offset: usize, chars: &[char]) -> Result<(), DocumentError> {
        self.check_insertion_offset(offset)?;
        if chars.is_empty() {
            return Ok(());
        }

        self.ensure_gap(chars.len());
        self.move_gap(offset);
        self.buffer[self.gap_start..self.gap_start + chars.len()].copy_from_slice(chars);
        self.gap_start += chars.len();

        let first = self.positions.partition_point(|slot| slot.offset() < offset);
        for slot in &self.positions[first..] {
            slot.set_offset(slot.offset() + chars.len());
        }
        self.prune_positions();
        Ok(())
    }

    fn gap_len(&self) -> usize {
        self.gap_end - self.gap_start
    }

    fn move_gap(&mut self, offset: usize) {
        if offset < self.gap_start {
            let count = self.gap_start - offset;
            self.buffer
                .copy_within(offset..self.gap_start, self.gap_end - count);
            self.gap_start = offset;
            self.gap_end -= count;
        } else if offset > self.gap_start {
            let count = offset - self.gap_start;
            self.buffer
                .copy_within(self.gap_end..self.gap_end + count, self.gap_start);
            self.gap_start += count;
            self.gap_end += count;
        }
    }

    fn ensure_gap(&mut self, needed: usize) {
        if self.gap_len() >= needed {
            return;
        }

        let capacity = self
            .config
            .grown_capacity(self.buffer.len(), self.len() + needed);
        let tail = self.buffer.len() - self.gap_end;
        trace!(
            "growing content buffer from {} to {} cells",
            self.buffer.len(),
            capacity
        );

        let mut buffer = vec![TAG_MARKER; capacity];
        buffer[..self.gap_start].copy_from_slice(&self.buffer[..self.gap_start]);
        buffer[capacity - tail..].copy_from_slice(&self.buffer[self.gap_end..]);
        self.buffer = buffer;
        self.gap_end = capacity - tail;
    }

    fn prune_positions(&mut self) {
        self.positions.retain(|slot| Rc::strong_count(slot) > 1);
    }

    fn check_insertion_offset(&self, offset: usize) -> Result<(), DocumentError> {
        if offset > self.len() {
            return Err(DocumentError::offset(offset, 0, self.len()));
        }
        Ok(())
    }

    fn check_range(&self, range: ContentRange) -> Result<(), DocumentError> {
        if range.start > range.end {
            return Err(DocumentError::InvalidRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.end >= self.len() {
            return Err(DocumentError::RangeOutOfBounds {
                range,
                length: self.len(),
            });
        }
        Ok(())
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let raw: String = match self.range() {
            Some(range) => self
                .cells(range)
                .map(|c| if c == TAG_MARKER { '|' } else { c })
                .collect(),
            None => String::new(),
        };
        f.debug_struct("Content")
            .field("len", &self.len())
            .field("raw", &raw)
            .field("positions", &self.position_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_text(content: &Content) -> String {
        content
            .range()
            .map(|range| content.raw_text(range).unwrap())
            .unwrap_or_default()
    }

    #[test]
    fn test_inserts_around_gap() {
        let mut content = Content::with_capacity(2);
        content.insert_text(0, "a").unwrap();
        content.insert_text(1, "d").unwrap();
        content.insert_text(1, "c").unwrap();
        content.insert_text(1, "b").unwrap();
        assert_eq!(all_text(&content), "abcd");
        assert_eq!(content.len(), 4);
    }

    #[test]
    fn test_growth_keeps_tail() {
        let mut content = Content::with_capacity(1);
        content.insert_text(0, "hello").unwrap();
        content.insert_text(2, "XYZ").unwrap();
        content.insert_text(0, "<").unwrap();
        assert_eq!(all_text(&content), "<heXYZllo");
        assert!(content.capacity() >= content.len());
    }

    #[test]
    fn test_markers_hidden_from_plain_text() {
        let mut content = Content::new();
        content.insert_text(0, "ab").unwrap();
        content.insert_tag_marker(1).unwrap();
        let range = content.range().unwrap();
        assert_eq!(content.text(range).unwrap(), "ab");
        assert_eq!(content.raw_text(range).unwrap(), "a\0b");
        assert!(content.is_tag_marker(1).unwrap());
        assert!(!content.is_tag_marker(0).unwrap());
    }

    #[test]
    fn test_out_of_range_arguments() {
        let mut content = Content::new();
        content.insert_text(0, "abc").unwrap();
        assert!(matches!(
            content.insert_text(4, "x"),
            Err(DocumentError::OffsetOutOfRange { offset: 4, .. })
        ));
        assert!(matches!(
            content.text(ContentRange::new(1, 3)),
            Err(DocumentError::RangeOutOfBounds { .. })
        ));
        assert!(content.create_position(4).is_err());
        assert!(content.char_at(3).is_err());
    }

    #[test]
    fn test_positions_shift_on_insert() {
        let mut content = Content::new();
        content.insert_text(0, "abcdef").unwrap();
        let before = content.create_position(1).unwrap();
        let at = content.create_position(3).unwrap();
        let after = content.create_position(5).unwrap();

        content.insert_text(3, "XY").unwrap();
        assert_eq!(before.offset(), 1);
        assert_eq!(at.offset(), 5);
        assert_eq!(after.offset(), 7);
    }

    #[test]
    fn test_positions_collapse_on_remove() {
        let mut content = Content::new();
        content.insert_text(0, "abcd").unwrap();
        let p0 = content.create_position(0).unwrap();
        let p1 = content.create_position(1).unwrap();
        let p2 = content.create_position(2).unwrap();
        let p3 = content.create_position(3).unwrap();
        let p4 = content.create_position(4).unwrap();

        content.remove(ContentRange::new(1, 2)).unwrap();
        assert_eq!(all_text(&content), "ad");
        assert_eq!(p0.offset(), 0);
        assert_eq!(p1.offset(), 1);
        assert_eq!(p2.offset(), 1);
        assert_eq!(p3.offset(), 1);
        assert_eq!(p4.offset(), 2);
    }

    #[test]
    fn test_positions_share_slots_and_release_on_drop() {
        let mut content = Content::new();
        content.insert_text(0, "abc").unwrap();
        let a = content.create_position(1).unwrap();
        let b = content.create_position(1).unwrap();
        assert_eq!(content.position_count(), 1);
        assert_eq!(content.position_handle_count(), 2);

        drop(a);
        assert_eq!(content.position_count(), 1);
        content.insert_text(0, "x").unwrap();
        assert_eq!(b.offset(), 2);

        drop(b);
        assert_eq!(content.position_count(), 0);
    }

    #[test]
    fn test_removed_position_stops_tracking() {
        let mut content = Content::new();
        content.insert_text(0, "abc").unwrap();
        let mut released = content.create_position(2).unwrap();
        let shared = content.create_position(2).unwrap();

        content.remove_position(&mut released);
        assert!(!released.is_valid());
        assert!(shared.is_valid());

        content.insert_text(0, "xx").unwrap();
        assert_eq!(released.offset(), 2);
        assert_eq!(shared.offset(), 4);
        assert_eq!(content.position_handle_count(), 1);
    }

    #[test]
    fn test_sub_content_is_independent() {
        let mut content = Content::new();
        content.insert_text(0, "hello world").unwrap();
        let mut copy = content.content(ContentRange::new(6, 10)).unwrap();
        content.remove(ContentRange::new(0, 5)).unwrap();
        copy.insert_text(0, ">").unwrap();
        assert_eq!(all_text(&copy), ">world");
        assert_eq!(all_text(&content), "world");
    }

    #[test]
    fn test_insert_content_keeps_markers() {
        let mut source = Content::new();
        source.insert_text(0, "ab").unwrap();
        source.insert_tag_marker(0).unwrap();
        source.insert_tag_marker(3).unwrap();

        let mut target = Content::new();
        target.insert_text(0, "[]").unwrap();
        target.insert_content(1, &source).unwrap();
        assert_eq!(all_text(&target), "[\0ab\0]");
    }
}
