//! Gapped segment iterators.
//!
//! A gapped iterator covers a block of consecutive segments whose
//! breakpoints are colinear: same orientation, adjacent partners, and any
//! inserted or deleted run in between no longer than the gap threshold.
//! Blocks are stored as an inclusive array range `lo..=hi`; orientation
//! decides which end is `left()` in reading order.

use std::fmt;

use crate::alignment::Alignment;
use crate::core::types::{GenomeId, SegmentSide};
use crate::traversal::cursor::{BottomCursor, CursorError, LinkKind, TopCursor};
use crate::traversal::rearrangement::Rearrangement;

fn step(index: usize, forward: bool, count: usize) -> Option<usize> {
    if forward {
        Some(index + 1).filter(|&i| i < count)
    } else {
        index.checked_sub(1)
    }
}

/// Block of colinear top segments
#[derive(Clone, Copy)]
pub struct GappedTopIterator<'a> {
    alignment: &'a Alignment,
    genome: GenomeId,
    lo: usize,
    hi: usize,
    reversed: bool,
    classifier: Rearrangement,
}

impl<'a> GappedTopIterator<'a> {
    /// Block containing top segment `index`, forward strand
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` if `index` is not a top segment of `genome`.
    pub fn new(
        alignment: &'a Alignment,
        genome: GenomeId,
        index: usize,
        classifier: Rearrangement,
    ) -> Result<Self, CursorError> {
        TopCursor::new(alignment, genome, index)?;
        let mut block = Self {
            alignment,
            genome,
            lo: index,
            hi: index,
            reversed: false,
            classifier,
        };
        block.extend(true);
        block.extend(false);
        Ok(block)
    }

    /// Grow the block along (`forward`) or against array order
    fn extend(&mut self, forward: bool) {
        let from = if forward { self.hi } else { self.lo };
        let Ok(mut cursor) = TopCursor::new(self.alignment, self.genome, from) else {
            return;
        };
        if !forward {
            cursor.to_reverse();
        }
        loop {
            let breakpoint = self.classifier.identify_from_left_breakpoint(&cursor);
            let Some(next) = breakpoint.right_flank.filter(|_| breakpoint.is_colinear()) else {
                break;
            };
            if forward {
                self.hi = next;
            } else {
                self.lo = next;
            }
            let Ok(moved) = TopCursor::new(self.alignment, self.genome, next) else {
                break;
            };
            cursor = moved;
            if !forward {
                cursor.to_reverse();
            }
        }
    }

    /// Move to the next block in reading direction
    ///
    /// # Errors
    ///
    /// Returns `AtBoundary` if this is the last block.
    pub fn to_right(&mut self) -> Result<(), CursorError> {
        self.move_block(!self.reversed, "right")
    }

    /// Move to the previous block in reading direction
    ///
    /// # Errors
    ///
    /// Returns `AtBoundary` if this is the first block.
    pub fn to_left(&mut self) -> Result<(), CursorError> {
        self.move_block(self.reversed, "left")
    }

    fn move_block(&mut self, forward: bool, direction: &'static str) -> Result<(), CursorError> {
        let count = self.alignment.genome(self.genome).top_segments.len();
        let from = if forward { self.hi } else { self.lo };
        let next = step(from, forward, count).ok_or_else(|| CursorError::AtBoundary {
            genome: self.alignment.genome(self.genome).name.clone(),
            side: SegmentSide::Top,
            direction,
        })?;
        self.lo = next;
        self.hi = next;
        self.extend(forward);
        Ok(())
    }

    pub fn to_reverse(&mut self) {
        self.reversed = !self.reversed;
    }

    /// Top block aligned to `bottom` in the bottom block's child slot
    ///
    /// # Errors
    ///
    /// Returns `NullLink` if no segment of `bottom` has a child in its slot.
    pub fn to_child(&mut self, bottom: &GappedBottomIterator<'a>) -> Result<(), CursorError> {
        let parent = self.alignment.genome(bottom.genome);
        let mut first_link = None;
        let (mut lo, mut hi) = (usize::MAX, 0);
        for index in bottom.lo..=bottom.hi {
            if let Some(link) = parent.bottom_segments[index].child(bottom.child_slot) {
                let Some(child_index) = link.index else { continue };
                first_link.get_or_insert(link);
                lo = lo.min(child_index);
                hi = hi.max(child_index);
            }
        }
        let (Some(link), Some(child)) = (first_link, parent.child(bottom.child_slot)) else {
            return Err(CursorError::NullLink {
                genome: parent.name.clone(),
                side: SegmentSide::Bottom,
                index: bottom.lo,
                link: LinkKind::Child,
            });
        };
        self.genome = child;
        self.lo = lo;
        self.hi = hi;
        self.reversed = bottom.reversed != link.reversed;
        Ok(())
    }

    /// First unit segment in reading order
    #[must_use]
    pub fn left(&self) -> TopCursor<'a> {
        self.unit(if self.reversed { self.hi } else { self.lo })
    }

    /// Last unit segment in reading order
    #[must_use]
    pub fn right(&self) -> TopCursor<'a> {
        self.unit(if self.reversed { self.lo } else { self.hi })
    }

    /// Unit segments of the block in reading order
    #[must_use]
    pub fn segments(&self) -> Vec<TopCursor<'a>> {
        let mut units: Vec<_> = (self.lo..=self.hi).map(|i| self.unit(i)).collect();
        if self.reversed {
            units.reverse();
        }
        units
    }

    fn unit(&self, index: usize) -> TopCursor<'a> {
        let mut cursor = match TopCursor::new(self.alignment, self.genome, index) {
            Ok(cursor) => cursor,
            Err(e) => panic!("gapped block outside its genome: {e}"),
        };
        if self.reversed {
            cursor.to_reverse();
        }
        cursor
    }

    #[must_use]
    pub fn genome_id(&self) -> GenomeId {
        self.genome
    }

    #[must_use]
    pub fn reversed(&self) -> bool {
        self.reversed
    }

    /// Array index range of the block's unit segments
    #[must_use]
    pub fn array_range(&self) -> std::ops::RangeInclusive<usize> {
        self.lo..=self.hi
    }

    #[must_use]
    pub fn start_position(&self) -> u64 {
        self.left().start_position()
    }

    #[must_use]
    pub fn end_position(&self) -> u64 {
        self.right().end_position()
    }

    /// Bases spanned by the block, gaps included
    #[must_use]
    pub fn length(&self) -> u64 {
        let genome = self.alignment.genome(self.genome);
        genome.top_segments[self.hi].end() - genome.top_segments[self.lo].start + 1
    }
}

impl PartialEq for GappedTopIterator<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.alignment, other.alignment)
            && self.genome == other.genome
            && self.lo == other.lo
            && self.hi == other.hi
            && self.reversed == other.reversed
    }
}

impl fmt::Debug for GappedTopIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GappedTopIterator")
            .field("genome", &self.alignment.genome(self.genome).name)
            .field("lo", &self.lo)
            .field("hi", &self.hi)
            .field("reversed", &self.reversed)
            .finish()
    }
}

/// Block of colinear bottom segments, seen through one child slot
#[derive(Clone, Copy)]
pub struct GappedBottomIterator<'a> {
    alignment: &'a Alignment,
    genome: GenomeId,
    child_slot: usize,
    lo: usize,
    hi: usize,
    reversed: bool,
    classifier: Rearrangement,
}

impl<'a> GappedBottomIterator<'a> {
    /// Block containing bottom segment `index` for child `child_slot`
    ///
    /// # Errors
    ///
    /// Returns `OutOfBounds` for an unknown segment and `NotAChild` for a
    /// slot the genome does not have.
    pub fn new(
        alignment: &'a Alignment,
        genome: GenomeId,
        child_slot: usize,
        index: usize,
        classifier: Rearrangement,
    ) -> Result<Self, CursorError> {
        BottomCursor::new(alignment, genome, index)?;
        let g = alignment.genome(genome);
        if child_slot >= g.num_children() {
            return Err(CursorError::NotAChild {
                parent: g.name.clone(),
                child: format!("slot {child_slot}"),
            });
        }
        let mut block = Self {
            alignment,
            genome,
            child_slot,
            lo: index,
            hi: index,
            reversed: false,
            classifier,
        };
        block.extend(true);
        block.extend(false);
        Ok(block)
    }

    /// Next bottom segment colinear with `from` in array direction `forward`
    fn right_flank(&self, from: usize, forward: bool) -> Option<usize> {
        let threshold = self.classifier.threshold();
        let genome = self.alignment.genome(self.genome);
        let segments = &genome.bottom_segments;
        let left = &segments[from];
        let left_link = left.child(self.child_slot)?;

        let mut deleted = 0;
        let mut j = from;
        let right = loop {
            j = step(j, forward, segments.len())?;
            let seg = &segments[j];
            if seg.sequence != left.sequence {
                return None;
            }
            if seg.child(self.child_slot).is_some() {
                break j;
            }
            deleted += seg.length;
            if deleted > threshold {
                return None;
            }
        };
        let right_link = segments[right].child(self.child_slot)?;
        if right_link.reversed != left_link.reversed {
            return None;
        }

        let child = self.alignment.genome(genome.child(self.child_slot)?);
        let (left_top, right_top) = (left_link.index?, right_link.index?);
        let (lt, rt) = (&child.top_segments[left_top], &child.top_segments[right_top]);
        if lt.next_paralogy_index.is_some()
            || rt.next_paralogy_index.is_some()
            || lt.sequence != rt.sequence
        {
            return None;
        }

        let child_forward = forward != left_link.reversed;
        let mut inserted = 0;
        let mut c = left_top;
        loop {
            c = step(c, child_forward, child.top_segments.len())?;
            if c == right_top {
                return Some(right);
            }
            let seg = &child.top_segments[c];
            if seg.parent_index.is_some() || seg.sequence != lt.sequence {
                return None;
            }
            inserted += seg.length;
            if inserted > threshold {
                return None;
            }
        }
    }

    fn extend(&mut self, forward: bool) {
        loop {
            let from = if forward { self.hi } else { self.lo };
            let Some(next) = self.right_flank(from, forward) else {
                break;
            };
            if forward {
                self.hi = next;
            } else {
                self.lo = next;
            }
        }
    }

    /// Move to the next block in reading direction
    ///
    /// # Errors
    ///
    /// Returns `AtBoundary` if this is the last block.
    pub fn to_right(&mut self) -> Result<(), CursorError> {
        self.move_block(!self.reversed, "right")
    }

    /// Move to the previous block in reading direction
    ///
    /// # Errors
    ///
    /// Returns `AtBoundary` if this is the first block.
    pub fn to_left(&mut self) -> Result<(), CursorError> {
        self.move_block(self.reversed, "left")
    }

    fn move_block(&mut self, forward: bool, direction: &'static str) -> Result<(), CursorError> {
        let genome = self.alignment.genome(self.genome);
        let from = if forward { self.hi } else { self.lo };
        let next = step(from, forward, genome.bottom_segments.len()).ok_or_else(|| {
            CursorError::AtBoundary {
                genome: genome.name.clone(),
                side: SegmentSide::Bottom,
                direction,
            }
        })?;
        self.lo = next;
        self.hi = next;
        self.extend(forward);
        Ok(())
    }

    pub fn to_reverse(&mut self) {
        self.reversed = !self.reversed;
    }

    /// Bottom block holding the parents of `top`
    ///
    /// # Errors
    ///
    /// Returns `NullLink` if no segment of `top` has a parent.
    pub fn to_parent(&mut self, top: &GappedTopIterator<'a>) -> Result<(), CursorError> {
        let child = self.alignment.genome(top.genome);
        let null = || CursorError::NullLink {
            genome: child.name.clone(),
            side: SegmentSide::Top,
            index: top.lo,
            link: LinkKind::Parent,
        };
        let parent_id = child.parent().ok_or_else(null)?;
        let slot = self
            .alignment
            .genome(parent_id)
            .child_index(child.id())
            .ok_or_else(null)?;

        let mut first_reversed = None;
        let (mut lo, mut hi) = (usize::MAX, 0);
        for seg in &child.top_segments[top.lo..=top.hi] {
            if let Some(parent_index) = seg.parent_index {
                first_reversed.get_or_insert(seg.parent_reversed);
                lo = lo.min(parent_index);
                hi = hi.max(parent_index);
            }
        }
        let parent_reversed = first_reversed.ok_or_else(null)?;
        self.genome = parent_id;
        self.child_slot = slot;
        self.lo = lo;
        self.hi = hi;
        self.reversed = top.reversed != parent_reversed;
        Ok(())
    }

    /// First unit segment in reading order
    #[must_use]
    pub fn left(&self) -> BottomCursor<'a> {
        self.unit(if self.reversed { self.hi } else { self.lo })
    }

    /// Last unit segment in reading order
    #[must_use]
    pub fn right(&self) -> BottomCursor<'a> {
        self.unit(if self.reversed { self.lo } else { self.hi })
    }

    /// Unit segments of the block in reading order
    #[must_use]
    pub fn segments(&self) -> Vec<BottomCursor<'a>> {
        let mut units: Vec<_> = (self.lo..=self.hi).map(|i| self.unit(i)).collect();
        if self.reversed {
            units.reverse();
        }
        units
    }

    fn unit(&self, index: usize) -> BottomCursor<'a> {
        let mut cursor = match BottomCursor::new(self.alignment, self.genome, index) {
            Ok(cursor) => cursor,
            Err(e) => panic!("gapped block outside its genome: {e}"),
        };
        if self.reversed {
            cursor.to_reverse();
        }
        cursor
    }

    #[must_use]
    pub fn genome_id(&self) -> GenomeId {
        self.genome
    }

    #[must_use]
    pub fn child_slot(&self) -> usize {
        self.child_slot
    }

    #[must_use]
    pub fn reversed(&self) -> bool {
        self.reversed
    }

    #[must_use]
    pub fn array_range(&self) -> std::ops::RangeInclusive<usize> {
        self.lo..=self.hi
    }

    #[must_use]
    pub fn start_position(&self) -> u64 {
        self.left().start_position()
    }

    #[must_use]
    pub fn end_position(&self) -> u64 {
        self.right().end_position()
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        let genome = self.alignment.genome(self.genome);
        genome.bottom_segments[self.hi].end() - genome.bottom_segments[self.lo].start + 1
    }
}

impl PartialEq for GappedBottomIterator<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.alignment, other.alignment)
            && self.genome == other.genome
            && self.child_slot == other.child_slot
            && self.lo == other.lo
            && self.hi == other.hi
            && self.reversed == other.reversed
    }
}

impl fmt::Debug for GappedBottomIterator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GappedBottomIterator")
            .field("genome", &self.alignment.genome(self.genome).name)
            .field("child_slot", &self.child_slot)
            .field("lo", &self.lo)
            .field("hi", &self.hi)
            .field("reversed", &self.reversed)
            .finish()
    }
}
