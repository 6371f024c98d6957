//! Live offset handles.
//!
//! A [`Position`] denotes "the same logical place" in a [`crate::Content`] across edits. The
//! content keeps a sorted table of reference-counted slots; every handle holds one reference.
//! Handles created at the same offset share a slot, because two places at the same offset
//! receive identical adjustments from then on. Dropping a handle releases its reference; a
//! slot with no handles left is pruned by the content on its next edit.

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

/// A tracked slot in the content's position table.
#[derive(Debug)]
pub(crate) struct PositionSlot {
    offset: Cell<usize>,
}

impl PositionSlot {
    pub(crate) fn new(offset: usize) -> Rc<Self> {
        Rc::new(Self {
            offset: Cell::new(offset),
        })
    }

    pub(crate) fn offset(&self) -> usize {
        self.offset.get()
    }

    pub(crate) fn set_offset(&self, offset: usize) {
        self.offset.set(offset);
    }
}

/// A live offset into a content buffer.
///
/// While valid, the offset is adjusted by every insert and remove on the owning content:
/// positions at or after an insertion point move forward by the inserted length; positions
/// after a removed range move back by its length; positions inside a removed range collapse
/// to the range start.
///
/// Once released (explicitly via [`Position::release`] or
/// [`Content::remove_position`](crate::Content::remove_position)) the handle stops tracking
/// and keeps reporting the last offset it saw.
pub struct Position {
    slot: Option<Rc<PositionSlot>>,
    frozen_offset: usize,
}

impl Position {
    pub(crate) fn new(slot: Rc<PositionSlot>) -> Self {
        let frozen_offset = slot.offset();
        Self {
            slot: Some(slot),
            frozen_offset,
        }
    }

    /// Current offset.
    pub fn offset(&self) -> usize {
        self.slot
            .as_ref()
            .map_or(self.frozen_offset, |slot| slot.offset())
    }

    /// Returns `true` while the position is still tracking edits.
    pub fn is_valid(&self) -> bool {
        self.slot.is_some()
    }

    /// Stop tracking. Idempotent.
    pub fn release(&mut self) {
        if let Some(slot) = self.slot.take() {
            self.frozen_offset = slot.offset();
        }
    }

    pub(crate) fn shares_slot(&self, slot: &Rc<PositionSlot>) -> bool {
        self.slot.as_ref().is_some_and(|own| Rc::ptr_eq(own, slot))
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Position")
            .field("offset", &self.offset())
            .field("valid", &self.is_valid())
            .finish()
    }
}
