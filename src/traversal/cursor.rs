//! Segment cursors.
//!
//! A cursor is a position in one genome's top or bottom segment array,
//! optionally sliced to a sub-interval of the segment and optionally reading
//! the reverse strand. Offsets are measured from the cursor's reading
//! direction: `start_offset` bases are trimmed from where reading starts and
//! `end_offset` from where it ends.
//!
//! Cursors are `Copy` values borrowing the [`Alignment`]; every navigation
//! either succeeds and leaves a valid cursor or fails and leaves it unchanged.

use std::fmt;

use thiserror::Error;

use crate::alignment::Alignment;
use crate::core::genome::Genome;
use crate::core::segment::{BottomSegment, TopSegment};
use crate::core::types::{GenomeId, SegmentSide, SequenceId};

/// Kind of segment link followed by a navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Parent,
    Child,
    ParseUp,
    ParseDown,
    Paralogy,
}

impl fmt::Display for LinkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parent => write!(f, "parent"),
            Self::Child => write!(f, "child"),
            Self::ParseUp => write!(f, "parse-up"),
            Self::ParseDown => write!(f, "parse-down"),
            Self::Paralogy => write!(f, "paralogy"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CursorError {
    #[error("{side} segment {index} out of range for genome '{genome}' ({count} segments)")]
    OutOfBounds {
        genome: String,
        side: SegmentSide,
        index: usize,
        count: usize,
    },

    #[error("Cannot step {direction} past the {side} segment array boundary of genome '{genome}'")]
    AtBoundary {
        genome: String,
        side: SegmentSide,
        direction: &'static str,
    },

    #[error("Slice offsets {start_offset} + {end_offset} leave nothing of a segment of length {length}")]
    InvalidSlice {
        start_offset: u64,
        end_offset: u64,
        length: u64,
    },

    #[error("{side} segment {index} of genome '{genome}' has no {link} link")]
    NullLink {
        genome: String,
        side: SegmentSide,
        index: usize,
        link: LinkKind,
    },

    #[error("Position {position} is not covered by the {side} segments of genome '{genome}'")]
    PositionOutOfRange {
        genome: String,
        side: SegmentSide,
        position: u64,
    },

    #[error("Genome '{child}' is not a child of '{parent}'")]
    NotAChild { parent: String, child: String },

    #[error("Genome '{ancestor}' is not an ancestor of '{genome}'")]
    NotAnAncestor { ancestor: String, genome: String },
}

/// Orientation-relative cursor state shared by top and bottom cursors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CursorState {
    genome: GenomeId,
    index: usize,
    start_offset: u64,
    end_offset: u64,
    reversed: bool,
}

impl CursorState {
    fn whole(genome: GenomeId, index: usize) -> Self {
        Self {
            genome,
            index,
            start_offset: 0,
            end_offset: 0,
            reversed: false,
        }
    }

    /// Single-base slice at `position` of the segment `(start, length)`
    fn base(genome: GenomeId, index: usize, start: u64, length: u64, position: u64) -> Self {
        let start_offset = position - start;
        Self {
            genome,
            index,
            start_offset,
            end_offset: length - start_offset - 1,
            reversed: false,
        }
    }

    fn start_position(&self, start: u64, length: u64) -> u64 {
        if self.reversed {
            start + length - 1 - self.start_offset
        } else {
            start + self.start_offset
        }
    }

    fn end_position(&self, start: u64, length: u64) -> u64 {
        if self.reversed {
            start + self.end_offset
        } else {
            start + length - 1 - self.end_offset
        }
    }

    fn reverse(&mut self) {
        std::mem::swap(&mut self.start_offset, &mut self.end_offset);
        self.reversed = !self.reversed;
    }

    /// Index one segment further along the reading direction, if in range
    fn neighbor(&self, forward: bool, count: usize) -> Option<usize> {
        if forward != self.reversed {
            Some(self.index + 1).filter(|&i| i < count)
        } else {
            self.index.checked_sub(1)
        }
    }

    fn step_right(&mut self, length: u64, count: usize) -> bool {
        if self.end_offset > 0 {
            self.start_offset = length - self.end_offset;
            self.end_offset = 0;
            return true;
        }
        match self.neighbor(true, count) {
            Some(next) => {
                self.index = next;
                self.start_offset = 0;
                true
            }
            None => false,
        }
    }

    fn step_left(&mut self, length: u64, count: usize) -> bool {
        if self.start_offset > 0 {
            self.end_offset = length - self.start_offset;
            self.start_offset = 0;
            return true;
        }
        match self.neighbor(false, count) {
            Some(next) => {
                self.index = next;
                self.end_offset = 0;
                true
            }
            None => false,
        }
    }
}

/// Slice of the segment `(start, length)` at `index` covering the part of
/// the interval `from -> to` (in reading order) that starts at `from`.
fn parse_state(
    genome: GenomeId,
    index: usize,
    start: u64,
    length: u64,
    from: u64,
    to: u64,
    reversed: bool,
) -> CursorState {
    let last = start + length - 1;
    let (start_offset, end_offset) = if reversed {
        (last - from, to.saturating_sub(start))
    } else {
        (from - start, last.saturating_sub(to))
    };
    CursorState {
        genome,
        index,
        start_offset,
        end_offset,
        reversed,
    }
}

macro_rules! cursor_common {
    ($cursor:ident, $segment:ty, $array:ident, $side:expr) => {
        impl<'a> $cursor<'a> {
            /// Cursor over a whole segment, forward strand
            ///
            /// # Errors
            ///
            /// Returns `OutOfBounds` if `index` is not a segment of `genome`.
            pub fn new(
                alignment: &'a Alignment,
                genome: GenomeId,
                index: usize,
            ) -> Result<Self, CursorError> {
                let g = alignment.genome(genome);
                if index >= g.$array.len() {
                    return Err(CursorError::OutOfBounds {
                        genome: g.name.clone(),
                        side: $side,
                        index,
                        count: g.$array.len(),
                    });
                }
                Ok(Self {
                    alignment,
                    state: CursorState::whole(genome, index),
                })
            }

            /// Forward cursor on the single base at a genome coordinate
            ///
            /// # Errors
            ///
            /// Returns `PositionOutOfRange` if no segment covers `position`.
            pub fn at_position(
                alignment: &'a Alignment,
                genome: GenomeId,
                position: u64,
            ) -> Result<Self, CursorError> {
                let mut cursor = Self::new(alignment, genome, 0).map_err(|_| {
                    CursorError::PositionOutOfRange {
                        genome: alignment.genome(genome).name.clone(),
                        side: $side,
                        position,
                    }
                })?;
                cursor.to_site(position)?;
                Ok(cursor)
            }

            #[must_use]
            pub fn alignment(&self) -> &'a Alignment {
                self.alignment
            }

            #[must_use]
            pub fn genome(&self) -> &'a Genome {
                self.alignment.genome(self.state.genome)
            }

            #[must_use]
            pub fn genome_id(&self) -> GenomeId {
                self.state.genome
            }

            #[must_use]
            pub fn array_index(&self) -> usize {
                self.state.index
            }

            #[must_use]
            pub fn segment(&self) -> &'a $segment {
                &self.genome().$array[self.state.index]
            }

            #[must_use]
            pub fn start_offset(&self) -> u64 {
                self.state.start_offset
            }

            #[must_use]
            pub fn end_offset(&self) -> u64 {
                self.state.end_offset
            }

            #[must_use]
            pub fn reversed(&self) -> bool {
                self.state.reversed
            }

            /// Bases covered by the (possibly sliced) cursor
            #[must_use]
            pub fn length(&self) -> u64 {
                self.segment().length - self.state.start_offset - self.state.end_offset
            }

            /// First base in reading order
            #[must_use]
            pub fn start_position(&self) -> u64 {
                let seg = self.segment();
                self.state.start_position(seg.start, seg.length)
            }

            /// Last base in reading order
            #[must_use]
            pub fn end_position(&self) -> u64 {
                let seg = self.segment();
                self.state.end_position(seg.start, seg.length)
            }

            /// Lowest genome coordinate covered, regardless of orientation
            #[must_use]
            pub fn left_position(&self) -> u64 {
                self.start_position().min(self.end_position())
            }

            #[must_use]
            pub fn overlaps(&self, position: u64) -> bool {
                let lo = self.left_position();
                position >= lo && position < lo + self.length()
            }

            #[must_use]
            pub fn sequence_id(&self) -> SequenceId {
                SequenceId::new(self.state.genome, self.segment().sequence)
            }

            /// True when the cursor ends on the last base of its segment in
            /// reading order
            #[must_use]
            pub fn at_segment_end(&self) -> bool {
                self.state.end_offset == 0
            }

            /// Index of the adjacent segment along (`forward`) or against the
            /// reading direction
            #[must_use]
            pub fn neighbor_index(&self, forward: bool) -> Option<usize> {
                self.state.neighbor(forward, self.genome().$array.len())
            }

            /// Restrict the cursor to a sub-range of its segment
            ///
            /// # Errors
            ///
            /// Returns `InvalidSlice` if the offsets would leave no bases.
            pub fn slice(&mut self, start_offset: u64, end_offset: u64) -> Result<(), CursorError> {
                let length = self.segment().length;
                if start_offset + end_offset >= length {
                    return Err(CursorError::InvalidSlice {
                        start_offset,
                        end_offset,
                        length,
                    });
                }
                self.state.start_offset = start_offset;
                self.state.end_offset = end_offset;
                Ok(())
            }

            /// Flip the reading direction in place; the interval is unchanged
            pub fn to_reverse(&mut self) {
                self.state.reverse();
            }

            /// Move one step in reading direction
            ///
            /// # Errors
            ///
            /// Returns `AtBoundary` at the end of the segment array.
            pub fn to_right(&mut self) -> Result<(), CursorError> {
                let count = self.genome().$array.len();
                if self.state.step_right(self.segment().length, count) {
                    Ok(())
                } else {
                    Err(self.boundary_error("right"))
                }
            }

            /// Move one step against reading direction
            ///
            /// # Errors
            ///
            /// Returns `AtBoundary` at the start of the segment array.
            pub fn to_left(&mut self) -> Result<(), CursorError> {
                let count = self.genome().$array.len();
                if self.state.step_left(self.segment().length, count) {
                    Ok(())
                } else {
                    Err(self.boundary_error("left"))
                }
            }

            /// Jump to the segment covering `position` and slice to that
            /// single base, keeping the orientation
            ///
            /// # Errors
            ///
            /// Returns `PositionOutOfRange` if no segment covers `position`.
            pub fn to_site(&mut self, position: u64) -> Result<(), CursorError> {
                let genome = self.genome();
                let index = genome
                    .$array
                    .partition_point(|seg| seg.start + seg.length <= position);
                let seg = genome
                    .$array
                    .get(index)
                    .filter(|seg| seg.contains(position))
                    .ok_or_else(|| CursorError::PositionOutOfRange {
                        genome: genome.name.clone(),
                        side: $side,
                        position,
                    })?;
                let reversed = self.state.reversed;
                self.state =
                    CursorState::base(self.state.genome, index, seg.start, seg.length, position);
                if reversed {
                    self.state.reverse();
                }
                Ok(())
            }

            fn boundary_error(&self, direction: &'static str) -> CursorError {
                CursorError::AtBoundary {
                    genome: self.genome().name.clone(),
                    side: $side,
                    direction,
                }
            }

            fn null_link(&self, link: LinkKind) -> CursorError {
                CursorError::NullLink {
                    genome: self.genome().name.clone(),
                    side: $side,
                    index: self.state.index,
                    link,
                }
            }
        }

        impl PartialEq for $cursor<'_> {
            fn eq(&self, other: &Self) -> bool {
                std::ptr::eq(self.alignment, other.alignment) && self.state == other.state
            }
        }

        impl Eq for $cursor<'_> {}

        impl fmt::Debug for $cursor<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($cursor))
                    .field("genome", &self.genome().name)
                    .field("index", &self.state.index)
                    .field("start_offset", &self.state.start_offset)
                    .field("end_offset", &self.state.end_offset)
                    .field("reversed", &self.state.reversed)
                    .finish()
            }
        }
    };
}

/// Cursor over a genome's top segments
#[derive(Clone, Copy)]
pub struct TopCursor<'a> {
    alignment: &'a Alignment,
    state: CursorState,
}

/// Cursor over a genome's bottom segments
#[derive(Clone, Copy)]
pub struct BottomCursor<'a> {
    alignment: &'a Alignment,
    state: CursorState,
}

cursor_common!(TopCursor, TopSegment, top_segments, SegmentSide::Top);
cursor_common!(BottomCursor, BottomSegment, bottom_segments, SegmentSide::Bottom);

impl<'a> TopCursor<'a> {
    #[must_use]
    pub fn has_parent(&self) -> bool {
        self.segment().parent_index.is_some()
    }

    #[must_use]
    pub fn has_parse_down(&self) -> bool {
        self.segment().bottom_parse_index.is_some()
    }

    #[must_use]
    pub fn has_next_paralogy(&self) -> bool {
        self.segment().next_paralogy_index.is_some()
    }

    /// Cursor on the child segment linked from `bottom` at `slot`
    ///
    /// # Errors
    ///
    /// Returns `NullLink` if the slot is empty, `NotAChild` if the genome has
    /// no such slot.
    pub fn child_of(bottom: &BottomCursor<'a>, slot: usize) -> Result<Self, CursorError> {
        let parent = bottom.genome();
        let child = parent.child(slot).ok_or_else(|| CursorError::NotAChild {
            parent: parent.name.clone(),
            child: format!("slot {slot}"),
        })?;
        let link = bottom
            .segment()
            .child(slot)
            .ok_or_else(|| bottom.null_link(LinkKind::Child))?;
        let index = link.index.ok_or_else(|| bottom.null_link(LinkKind::Child))?;
        Ok(Self {
            alignment: bottom.alignment,
            state: CursorState {
                genome: child,
                index,
                start_offset: bottom.state.start_offset,
                end_offset: bottom.state.end_offset,
                reversed: bottom.state.reversed != link.reversed,
            },
        })
    }

    /// Cross the edge from `bottom` down to its child slot `slot`
    ///
    /// # Errors
    ///
    /// See [`TopCursor::child_of`]; the cursor is unchanged on error.
    pub fn to_child(&mut self, bottom: &BottomCursor<'a>, slot: usize) -> Result<(), CursorError> {
        *self = Self::child_of(bottom, slot)?;
        Ok(())
    }

    /// Cross the edge from `bottom` down to the child genome `genome`
    ///
    /// # Errors
    ///
    /// Returns `NotAChild` if `genome` is not a child of the bottom cursor's
    /// genome, or `NullLink` if the segment is not aligned to it.
    pub fn to_child_genome(
        &mut self,
        bottom: &BottomCursor<'a>,
        genome: GenomeId,
    ) -> Result<(), CursorError> {
        let parent = bottom.genome();
        let slot = parent
            .child_index(genome)
            .ok_or_else(|| CursorError::NotAChild {
                parent: parent.name.clone(),
                child: bottom.alignment.genome(genome).name.clone(),
            })?;
        self.to_child(bottom, slot)
    }

    /// Cursor on the top segment of the same genome holding `bottom`'s
    /// start, sliced to the overlap with `bottom`
    ///
    /// # Errors
    ///
    /// Returns `NullLink` if the genome has no top segments.
    pub fn parse_up_of(bottom: &BottomCursor<'a>) -> Result<Self, CursorError> {
        if bottom.segment().top_parse_index.is_none() {
            return Err(bottom.null_link(LinkKind::ParseUp));
        }
        let genome = bottom.genome();
        let from = bottom.start_position();
        let index = genome
            .top_segment_index_at(from)
            .ok_or_else(|| bottom.null_link(LinkKind::ParseUp))?;
        let seg = &genome.top_segments[index];
        Ok(Self {
            alignment: bottom.alignment,
            state: parse_state(
                bottom.state.genome,
                index,
                seg.start,
                seg.length,
                from,
                bottom.end_position(),
                bottom.state.reversed,
            ),
        })
    }

    /// # Errors
    ///
    /// See [`TopCursor::parse_up_of`]; the cursor is unchanged on error.
    pub fn to_parse_up(&mut self, bottom: &BottomCursor<'a>) -> Result<(), CursorError> {
        *self = Self::parse_up_of(bottom)?;
        Ok(())
    }

    /// Move to the next member of the paralogy ring. The orientation flips
    /// when the two members align to their shared parent on opposite strands.
    ///
    /// # Errors
    ///
    /// Returns `NullLink` if the segment has no paralog.
    pub fn to_next_paralogy(&mut self) -> Result<(), CursorError> {
        let seg = self.segment();
        let next = seg
            .next_paralogy_index
            .ok_or_else(|| self.null_link(LinkKind::Paralogy))?;
        let next_seg = &self.genome().top_segments[next];
        self.state.index = next;
        self.state.reversed ^= seg.parent_reversed != next_seg.parent_reversed;
        Ok(())
    }
}

impl<'a> BottomCursor<'a> {
    #[must_use]
    pub fn num_children(&self) -> usize {
        self.genome().num_children()
    }

    #[must_use]
    pub fn has_child(&self, slot: usize) -> bool {
        self.segment().child(slot).is_some()
    }

    #[must_use]
    pub fn has_parse_up(&self) -> bool {
        self.segment().top_parse_index.is_some()
    }

    /// Cursor on the parent segment of `top`
    ///
    /// # Errors
    ///
    /// Returns `NullLink` if `top` has no parent.
    pub fn parent_of(top: &TopCursor<'a>) -> Result<Self, CursorError> {
        let seg = top.segment();
        let index = seg
            .parent_index
            .ok_or_else(|| top.null_link(LinkKind::Parent))?;
        let parent = top
            .genome()
            .parent()
            .ok_or_else(|| top.null_link(LinkKind::Parent))?;
        Ok(Self {
            alignment: top.alignment,
            state: CursorState {
                genome: parent,
                index,
                start_offset: top.state.start_offset,
                end_offset: top.state.end_offset,
                reversed: top.state.reversed != seg.parent_reversed,
            },
        })
    }

    /// Cross the edge from `top` up to its parent
    ///
    /// # Errors
    ///
    /// See [`BottomCursor::parent_of`]; the cursor is unchanged on error.
    pub fn to_parent(&mut self, top: &TopCursor<'a>) -> Result<(), CursorError> {
        *self = Self::parent_of(top)?;
        Ok(())
    }

    /// Cursor on the bottom segment of the same genome holding `top`'s
    /// start, sliced to the overlap with `top`
    ///
    /// # Errors
    ///
    /// Returns `NullLink` if the genome has no bottom segments.
    pub fn parse_down_of(top: &TopCursor<'a>) -> Result<Self, CursorError> {
        if top.segment().bottom_parse_index.is_none() {
            return Err(top.null_link(LinkKind::ParseDown));
        }
        let genome = top.genome();
        let from = top.start_position();
        let index = genome
            .bottom_segment_index_at(from)
            .ok_or_else(|| top.null_link(LinkKind::ParseDown))?;
        let seg = &genome.bottom_segments[index];
        Ok(Self {
            alignment: top.alignment,
            state: parse_state(
                top.state.genome,
                index,
                seg.start,
                seg.length,
                from,
                top.end_position(),
                top.state.reversed,
            ),
        })
    }

    /// # Errors
    ///
    /// See [`BottomCursor::parse_down_of`]; the cursor is unchanged on error.
    pub fn to_parse_down(&mut self, top: &TopCursor<'a>) -> Result<(), CursorError> {
        *self = Self::parse_down_of(top)?;
        Ok(())
    }
}
