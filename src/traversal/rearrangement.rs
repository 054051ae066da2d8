//! Single-breakpoint rearrangement classification.
//!
//! The breakpoint examined is the boundary right after a top cursor, in the
//! cursor's reading direction; the cursor must end on the last base of its
//! segment. The segment under the cursor is the *left flank*, the next
//! segment the *right flank*.

use serde::{Deserialize, Serialize};

use crate::core::genome::Genome;
use crate::core::types::GenomeId;
use crate::traversal::cursor::TopCursor;

/// Default largest indel absorbed into a colinear block
pub const DEFAULT_GAP_THRESHOLD: u64 = 10;

/// Classification of one breakpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RearrangementKind {
    /// Flanks are colinear and adjacent in the parent
    None,
    /// Flanks are colinear after absorbing indels within the gap threshold
    Gap,
    Insertion,
    Deletion,
    Inversion,
    Duplication,
    /// Right flank's parent is not reachable along the parent sequence
    Transposition,
    /// Insertion and deletion at the same breakpoint, beyond the threshold
    Complex,
    /// Cursor does not end at a segment boundary
    Invalid,
}

/// Interval of one genome with endpoints in reading order: `first > second`
/// when read on the reverse strand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GapRange {
    pub genome: GenomeId,
    pub first: u64,
    pub second: u64,
}

impl GapRange {
    /// Range over `[lo, hi]`, swapped when `reversed`
    #[must_use]
    pub fn oriented(genome: GenomeId, lo: u64, hi: u64, reversed: bool) -> Self {
        if reversed {
            Self {
                genome,
                first: hi,
                second: lo,
            }
        } else {
            Self {
                genome,
                first: lo,
                second: hi,
            }
        }
    }

    #[must_use]
    pub fn length(&self) -> u64 {
        self.first.abs_diff(self.second) + 1
    }

    #[must_use]
    pub fn reversed(&self) -> bool {
        self.first > self.second
    }

    /// Same bases, endpoints ordered for the given strand
    #[must_use]
    pub fn with_orientation(self, reversed: bool) -> Self {
        let (lo, hi) = (self.first.min(self.second), self.first.max(self.second));
        Self::oriented(self.genome, lo, hi, reversed)
    }
}

/// Result of the general breakpoint classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Breakpoint {
    pub kind: RearrangementKind,
    /// Unaligned bases skipped in this genome before the right flank
    pub inserted: u64,
    /// Unaligned parent bases between the flanks' parents
    pub deleted: u64,
    /// Index of the right flank, if one was reached in the same sequence
    pub right_flank: Option<usize>,
}

impl Breakpoint {
    fn new(kind: RearrangementKind, right_flank: Option<usize>) -> Self {
        Self {
            kind,
            inserted: 0,
            deleted: 0,
            right_flank,
        }
    }

    /// True if the flanks can be merged into one colinear block
    #[must_use]
    pub fn is_colinear(&self) -> bool {
        matches!(self.kind, RearrangementKind::None | RearrangementKind::Gap)
    }
}

/// Outcome of walking the parent between the flanks' parents
enum ParentWalk {
    Adjacent,
    Gap { lo: u64, hi: u64, length: u64 },
    Blocked,
}

/// Breakpoint classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rearrangement {
    pub gap_threshold: u64,
    pub atomic: bool,
}

impl Default for Rearrangement {
    fn default() -> Self {
        Self {
            gap_threshold: DEFAULT_GAP_THRESHOLD,
            atomic: false,
        }
    }
}

impl Rearrangement {
    #[must_use]
    pub fn new(gap_threshold: u64, atomic: bool) -> Self {
        Self {
            gap_threshold,
            atomic,
        }
    }

    /// Classifier that treats every indel as a breakpoint
    #[must_use]
    pub fn atomic() -> Self {
        Self::new(0, true)
    }

    #[must_use]
    pub fn with_gap_threshold(mut self, gap_threshold: u64) -> Self {
        self.gap_threshold = gap_threshold;
        self
    }

    /// Largest gap absorbed into a colinear breakpoint
    pub(crate) fn threshold(&self) -> u64 {
        if self.atomic {
            0
        } else {
            self.gap_threshold
        }
    }

    /// Parent bases deleted between the left flank and the next segment.
    ///
    /// Both flanks must be aligned with the same parent orientation, and the
    /// parent segments strictly between their parents (walking in the
    /// parent's reading direction) must lie in one parent sequence and have
    /// no child in this genome.
    #[must_use]
    pub fn identify_deletion_from_left_breakpoint(&self, cursor: &TopCursor<'_>) -> Option<GapRange> {
        if !cursor.at_segment_end() {
            return None;
        }
        let genome = cursor.genome();
        let left = cursor.segment();
        let left_parent = left.parent_index?;
        let right = &genome.top_segments[cursor.neighbor_index(true)?];
        if right.sequence != left.sequence || left.parent_reversed != right.parent_reversed {
            return None;
        }
        let right_parent = right.parent_index?;

        let parent_id = genome.parent()?;
        let parent = cursor.alignment().genome(parent_id);
        let slot = parent.child_index(genome.id())?;
        let forward = cursor.reversed() == left.parent_reversed;
        match walk_parent(parent, slot, left_parent, right_parent, forward) {
            ParentWalk::Gap { lo, hi, .. } => {
                Some(GapRange::oriented(parent_id, lo, hi, cursor.reversed()))
            }
            ParentWalk::Adjacent | ParentWalk::Blocked => None,
        }
    }

    /// Bases of this genome inserted right after the left flank: the next
    /// segment in the same sequence when it has no parent.
    #[must_use]
    pub fn identify_insertion_from_left_breakpoint(
        &self,
        cursor: &TopCursor<'_>,
    ) -> Option<GapRange> {
        if !cursor.at_segment_end() || !cursor.has_parent() {
            return None;
        }
        let genome = cursor.genome();
        let right = &genome.top_segments[cursor.neighbor_index(true)?];
        if right.sequence != cursor.segment().sequence || right.parent_index.is_some() {
            return None;
        }
        Some(GapRange::oriented(
            genome.id(),
            right.start,
            right.end(),
            cursor.reversed(),
        ))
    }

    /// Classify the breakpoint after `cursor`, absorbing insertion and
    /// deletion runs up to the gap threshold.
    #[must_use]
    pub fn identify_from_left_breakpoint(&self, cursor: &TopCursor<'_>) -> Breakpoint {
        if !cursor.at_segment_end() {
            return Breakpoint::new(RearrangementKind::Invalid, None);
        }
        let genome = cursor.genome();
        let left = cursor.segment();
        let threshold = self.threshold();

        let mut next = cursor.neighbor_index(true);
        let Some(left_parent) = left.parent_index else {
            return Breakpoint::new(RearrangementKind::Insertion, next);
        };

        let forward = !cursor.reversed();
        let mut inserted = 0;
        let right_idx = loop {
            let Some(j) = next.filter(|&j| genome.top_segments[j].sequence == left.sequence) else {
                // Sequence ends before another aligned segment
                let kind = if inserted > 0 {
                    RearrangementKind::Insertion
                } else {
                    RearrangementKind::None
                };
                return Breakpoint {
                    inserted,
                    ..Breakpoint::new(kind, None)
                };
            };
            let seg = &genome.top_segments[j];
            if seg.parent_index.is_some() {
                break j;
            }
            inserted += seg.length;
            if inserted > threshold {
                return Breakpoint {
                    inserted,
                    ..Breakpoint::new(RearrangementKind::Insertion, Some(j))
                };
            }
            next = if forward {
                Some(j + 1).filter(|&k| k < genome.top_segments.len())
            } else {
                j.checked_sub(1)
            };
        };

        let right = &genome.top_segments[right_idx];
        let flanked = |kind| Breakpoint {
            inserted,
            ..Breakpoint::new(kind, Some(right_idx))
        };
        if left.next_paralogy_index.is_some() || right.next_paralogy_index.is_some() {
            return flanked(RearrangementKind::Duplication);
        }
        if left.parent_reversed != right.parent_reversed {
            return flanked(RearrangementKind::Inversion);
        }

        let (Some(parent_id), Some(right_parent)) = (genome.parent(), right.parent_index) else {
            return flanked(RearrangementKind::Transposition);
        };
        let parent = cursor.alignment().genome(parent_id);
        let Some(slot) = parent.child_index(genome.id()) else {
            return flanked(RearrangementKind::Transposition);
        };
        let parent_forward = cursor.reversed() == left.parent_reversed;
        let deleted = match walk_parent(parent, slot, left_parent, right_parent, parent_forward) {
            ParentWalk::Blocked => return flanked(RearrangementKind::Transposition),
            ParentWalk::Adjacent => 0,
            ParentWalk::Gap { length, .. } => length,
        };

        let kind = if deleted > threshold {
            if inserted > 0 {
                RearrangementKind::Complex
            } else {
                RearrangementKind::Deletion
            }
        } else if inserted > 0 || deleted > 0 {
            RearrangementKind::Gap
        } else {
            RearrangementKind::None
        };
        Breakpoint {
            deleted,
            ..flanked(kind)
        }
    }
}

/// Step through `parent`'s bottom segments from `from` toward `to`. Every
/// segment strictly between them must share `from`'s sequence and have no
/// child in `slot`.
fn walk_parent(parent: &Genome, slot: usize, from: usize, to: usize, forward: bool) -> ParentWalk {
    let segments = &parent.bottom_segments;
    let sequence = segments[from].sequence;
    let (mut lo, mut hi, mut length) = (u64::MAX, 0, 0);
    let mut j = from;
    loop {
        let step = if forward {
            j.checked_add(1)
        } else {
            j.checked_sub(1)
        };
        j = match step {
            Some(k) if k < segments.len() => k,
            _ => return ParentWalk::Blocked,
        };
        let seg = &segments[j];
        if seg.sequence != sequence {
            return ParentWalk::Blocked;
        }
        if j == to {
            break;
        }
        if seg.child(slot).is_some() {
            return ParentWalk::Blocked;
        }
        lo = lo.min(seg.start);
        hi = hi.max(seg.end());
        length += seg.length;
    }
    if length == 0 {
        ParentWalk::Adjacent
    } else {
        ParentWalk::Gap { lo, hi, length }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::{Alignment, AlignmentBuilder};

    /// Parent and child share 4 segments of 5 bases; parent segment 1 is
    /// deleted in the child and child segment 2 is inserted.
    fn indel_alignment() -> Alignment {
        let mut builder = AlignmentBuilder::identical_parent_child(1, 20, 5);
        // child: 0->0, 1->2, 2 unaligned, 3->3 ; parent 1 unaligned
        builder.unlink_top("parent", "child", 1).unwrap();
        builder.unlink_top("parent", "child", 2).unwrap();
        builder.link("parent", 2, "child", 1, false).unwrap();
        builder.build().unwrap()
    }

    fn at_end<'a>(alignment: &'a Alignment, index: usize, reversed: bool) -> TopCursor<'a> {
        let child = alignment.genome_id("child").unwrap();
        let mut cursor = TopCursor::new(alignment, child, index).unwrap();
        if reversed {
            cursor.to_reverse();
        }
        cursor
    }

    #[test]
    fn test_deletion_forward_and_reversed() {
        let alignment = indel_alignment();
        let rearrangement = Rearrangement::atomic();
        let parent = alignment.root();

        let del = rearrangement
            .identify_deletion_from_left_breakpoint(&at_end(&alignment, 0, false))
            .unwrap();
        assert_eq!(del, GapRange { genome: parent, first: 5, second: 9 });
        assert_eq!(del.length(), 5);

        let del = rearrangement
            .identify_deletion_from_left_breakpoint(&at_end(&alignment, 1, true))
            .unwrap();
        assert_eq!(del, GapRange { genome: parent, first: 9, second: 5 });
        assert!(del.reversed());

        assert!(rearrangement
            .identify_deletion_from_left_breakpoint(&at_end(&alignment, 1, false))
            .is_none());
    }

    #[test]
    fn test_insertion() {
        let alignment = indel_alignment();
        let rearrangement = Rearrangement::atomic();
        let child = alignment.genome_id("child").unwrap();

        let ins = rearrangement
            .identify_insertion_from_left_breakpoint(&at_end(&alignment, 1, false))
            .unwrap();
        assert_eq!(ins, GapRange { genome: child, first: 10, second: 14 });

        let ins = rearrangement
            .identify_insertion_from_left_breakpoint(&at_end(&alignment, 3, true))
            .unwrap();
        assert_eq!(ins, GapRange { genome: child, first: 14, second: 10 });

        assert!(rearrangement
            .identify_insertion_from_left_breakpoint(&at_end(&alignment, 0, false))
            .is_none());
    }

    #[test]
    fn test_sliced_cursor_is_not_a_breakpoint() {
        let alignment = indel_alignment();
        let mut cursor = at_end(&alignment, 0, false);
        cursor.slice(0, 2).unwrap();
        let rearrangement = Rearrangement::default();
        assert!(rearrangement.identify_deletion_from_left_breakpoint(&cursor).is_none());
        assert_eq!(
            rearrangement.identify_from_left_breakpoint(&cursor).kind,
            RearrangementKind::Invalid
        );
    }

    #[test]
    fn test_general_classification_respects_threshold() {
        let alignment = indel_alignment();
        let strict = Rearrangement::atomic();
        let loose = Rearrangement::new(5, false);

        let bp = strict.identify_from_left_breakpoint(&at_end(&alignment, 0, false));
        assert_eq!(bp.kind, RearrangementKind::Deletion);
        assert_eq!(bp.deleted, 5);
        assert_eq!(bp.right_flank, Some(1));

        let bp = loose.identify_from_left_breakpoint(&at_end(&alignment, 0, false));
        assert_eq!(bp.kind, RearrangementKind::Gap);
        assert!(bp.is_colinear());

        let bp = strict.identify_from_left_breakpoint(&at_end(&alignment, 1, false));
        assert_eq!(bp.kind, RearrangementKind::Insertion);

        let bp = loose.identify_from_left_breakpoint(&at_end(&alignment, 1, false));
        assert_eq!(bp.kind, RearrangementKind::Gap);
        assert_eq!(bp.inserted, 5);
        assert_eq!(bp.right_flank, Some(3));

        let bp = loose.identify_from_left_breakpoint(&at_end(&alignment, 3, false));
        assert_eq!(bp.kind, RearrangementKind::None);
        assert_eq!(bp.right_flank, None);
    }

    #[test]
    fn test_inversion_and_transposition() {
        let mut builder = AlignmentBuilder::identical_parent_child(1, 20, 5);
        builder.invert_run("parent", "child", 2, 2).unwrap();
        let alignment = builder.build().unwrap();
        let rearrangement = Rearrangement::default();

        let bp = rearrangement.identify_from_left_breakpoint(&at_end(&alignment, 1, false));
        assert_eq!(bp.kind, RearrangementKind::Inversion);
        let bp = rearrangement.identify_from_left_breakpoint(&at_end(&alignment, 2, false));
        assert!(bp.is_colinear());

        let mut builder = AlignmentBuilder::identical_parent_child(1, 20, 5);
        builder.link("parent", 1, "child", 2, false).unwrap();
        builder.link("parent", 2, "child", 1, false).unwrap();
        let alignment = builder.build().unwrap();
        let bp = rearrangement.identify_from_left_breakpoint(&at_end(&alignment, 0, false));
        assert_eq!(bp.kind, RearrangementKind::Transposition);
    }
}
