//! Interval mapping between genomes.
//!
//! [`map_span`] carries an oriented interval of one genome along the tree
//! path to another genome: up through top segments to the most recent
//! common ancestor, then down through bottom segments. Each edge splits the
//! interval at segment boundaries and drops pieces without a partner, so the
//! result is a list of homologous pieces, each remembering which part of the
//! source interval it came from. Paralogy rings met on the way down add
//! their other members as further homologs.

use serde::{Deserialize, Serialize};

use crate::alignment::Alignment;
use crate::core::genome::SegmentedSequence;
use crate::core::types::{GenomeId, SegmentSide};
use crate::traversal::cursor::{BottomCursor, CursorError, TopCursor};

/// Oriented genome interval. `start` is the first base in reading order, so
/// a reversed span covers `start - length + 1..=start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub genome: GenomeId,
    pub start: u64,
    pub length: u64,
    pub reversed: bool,
}

impl Span {
    #[must_use]
    pub fn new(genome: GenomeId, start: u64, length: u64, reversed: bool) -> Self {
        Self {
            genome,
            start,
            length,
            reversed,
        }
    }

    #[must_use]
    pub fn from_top(cursor: &TopCursor<'_>) -> Self {
        Self::new(
            cursor.genome_id(),
            cursor.start_position(),
            cursor.length(),
            cursor.reversed(),
        )
    }

    #[must_use]
    pub fn from_bottom(cursor: &BottomCursor<'_>) -> Self {
        Self::new(
            cursor.genome_id(),
            cursor.start_position(),
            cursor.length(),
            cursor.reversed(),
        )
    }

    /// Lowest genome coordinate covered
    #[must_use]
    pub fn lo(&self) -> u64 {
        if self.reversed {
            self.start + 1 - self.length
        } else {
            self.start
        }
    }

    /// Highest genome coordinate covered
    #[must_use]
    pub fn hi(&self) -> u64 {
        if self.reversed {
            self.start
        } else {
            self.start + self.length - 1
        }
    }

    /// Reading-order offset of a covered coordinate
    fn offset_of(&self, position: u64) -> u64 {
        if self.reversed {
            self.start - position
        } else {
            position - self.start
        }
    }

    /// `length` bases starting `offset` bases into the span, same orientation
    fn sub_span(&self, offset: u64, length: u64) -> Self {
        let start = if self.reversed {
            self.start - offset
        } else {
            self.start + offset
        };
        Self::new(self.genome, start, length, self.reversed)
    }
}

/// A piece of the source interval and its homolog in the target genome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedSegment {
    pub source: Span,
    pub target: Span,
}

/// Mapping settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    /// Do not follow paralogy rings on the way down
    pub no_dupes: bool,

    /// Climb to this ancestor of the common ancestor before descending, so
    /// duplications below it show up as extra homologs. Ignored with
    /// `no_dupes`.
    pub coalescence_limit: Option<GenomeId>,
}

impl MapOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_no_dupes(mut self, no_dupes: bool) -> Self {
        self.no_dupes = no_dupes;
        self
    }

    #[must_use]
    pub fn with_coalescence_limit(mut self, limit: Option<GenomeId>) -> Self {
        self.coalescence_limit = limit;
        self
    }
}

/// Map `span` onto `target`, returning pieces in the source's reading order.
/// Paralogs found while descending follow the piece they duplicate.
///
/// # Errors
///
/// Returns `PositionOutOfRange` if the span is empty or leaves its genome,
/// and `NotAnAncestor` if the coalescence limit is below the common
/// ancestor of the two genomes.
pub fn map_span(
    alignment: &Alignment,
    span: Span,
    target: GenomeId,
    options: &MapOptions,
) -> Result<Vec<MappedSegment>, CursorError> {
    let genome = alignment.genome(span.genome);
    if span.length == 0
        || (span.reversed && span.start + 1 < span.length)
        || span.hi() >= genome.sequence_length()
    {
        return Err(CursorError::PositionOutOfRange {
            genome: genome.name.clone(),
            side: SegmentSide::Top,
            position: span.start,
        });
    }

    let mrca = alignment.common_ancestor(span.genome, target);
    let expand = !options.no_dupes;
    let limit = match options.coalescence_limit {
        Some(limit) if expand => {
            if !alignment.ancestors(mrca).contains(&limit) {
                return Err(CursorError::NotAnAncestor {
                    ancestor: alignment.genome(limit).name.clone(),
                    genome: alignment.genome(mrca).name.clone(),
                });
            }
            limit
        }
        _ => mrca,
    };

    let mut pieces = vec![MappedSegment {
        source: span,
        target: span,
    }];
    for &genome in alignment.ancestors(span.genome).iter().take_while(|&&g| g != limit) {
        pieces = pieces
            .iter()
            .map(|piece| map_up(alignment, genome, piece))
            .collect::<Result<Vec<_>, _>>()?
            .concat();
    }

    // back down the source's own path first, then on to the target
    for path in [descent(alignment, limit, mrca), descent(alignment, mrca, target)] {
        for pair in path.windows(2) {
            let (parent, child) = (pair[0], pair[1]);
            let Some(slot) = alignment.genome(parent).child_index(child) else {
                unreachable!("genome path from an ancestor is not a tree path");
            };
            pieces = pieces
                .iter()
                .map(|piece| map_down(alignment, parent, slot, piece, expand))
                .collect::<Result<Vec<_>, _>>()?
                .concat();
        }
    }
    Ok(pieces)
}

/// Genomes from `ancestor` down to `genome`, inclusive
fn descent(alignment: &Alignment, ancestor: GenomeId, genome: GenomeId) -> Vec<GenomeId> {
    let mut path: Vec<GenomeId> = alignment
        .ancestors(genome)
        .into_iter()
        .take_while(|&g| g != ancestor)
        .collect();
    path.push(ancestor);
    path.reverse();
    path
}

/// Segment indices overlapping `span`, in the span's reading order, with
/// the overlapping coordinate range of each
fn overlaps<S>(
    segments: &[S],
    bounds: impl Fn(&S) -> (u64, u64),
    span: &Span,
) -> Vec<(usize, u64, u64)> {
    let (lo, hi) = (span.lo(), span.hi());
    let first = segments.partition_point(|seg| {
        let (start, length) = bounds(seg);
        start + length <= lo
    });
    let last = segments.partition_point(|seg| bounds(seg).0 <= hi);
    let mut hits: Vec<_> = (first..last.max(first))
        .map(|i| {
            let (start, length) = bounds(&segments[i]);
            (i, lo.max(start), hi.min(start + length - 1))
        })
        .collect();
    if span.reversed {
        hits.reverse();
    }
    hits
}

/// Reading-order offsets of `[a, b]` inside a segment of `length` starting at
/// `start`, oriented like `reversed`
fn slice_offsets(start: u64, length: u64, a: u64, b: u64, reversed: bool) -> (u64, u64) {
    let (head, tail) = (a - start, start + length - 1 - b);
    if reversed {
        (tail, head)
    } else {
        (head, tail)
    }
}

fn carry(piece: &MappedSegment, a: u64, b: u64, mapped: Span) -> MappedSegment {
    let current = &piece.target;
    let first = if current.reversed { b } else { a };
    let offset = current.offset_of(first);
    MappedSegment {
        source: piece.source.sub_span(offset, b - a + 1),
        target: mapped,
    }
}

fn map_up(
    alignment: &Alignment,
    genome: GenomeId,
    piece: &MappedSegment,
) -> Result<Vec<MappedSegment>, CursorError> {
    let g = alignment.genome(genome);
    let span = &piece.target;
    let mut out = Vec::new();
    for (index, a, b) in overlaps(&g.top_segments, |s| (s.start, s.length), span) {
        let seg = &g.top_segments[index];
        if seg.parent_index.is_none() {
            continue;
        }
        let mut cursor = TopCursor::new(alignment, genome, index)?;
        let (head, tail) = slice_offsets(seg.start, seg.length, a, b, span.reversed);
        if span.reversed {
            cursor.to_reverse();
        }
        cursor.slice(head, tail)?;
        let parent = BottomCursor::parent_of(&cursor)?;
        out.push(carry(piece, a, b, Span::from_bottom(&parent)));
    }
    Ok(out)
}

fn map_down(
    alignment: &Alignment,
    genome: GenomeId,
    slot: usize,
    piece: &MappedSegment,
    expand: bool,
) -> Result<Vec<MappedSegment>, CursorError> {
    let g = alignment.genome(genome);
    let span = &piece.target;
    let mut out = Vec::new();
    for (index, a, b) in overlaps(&g.bottom_segments, |s| (s.start, s.length), span) {
        let seg = &g.bottom_segments[index];
        if seg.child(slot).is_none() {
            continue;
        }
        let mut cursor = BottomCursor::new(alignment, genome, index)?;
        let (head, tail) = slice_offsets(seg.start, seg.length, a, b, span.reversed);
        if span.reversed {
            cursor.to_reverse();
        }
        cursor.slice(head, tail)?;
        let child = TopCursor::child_of(&cursor, slot)?;
        out.push(carry(piece, a, b, Span::from_top(&child)));
        if expand && child.has_next_paralogy() {
            let mut paralog = child;
            loop {
                paralog.to_next_paralogy()?;
                if paralog.array_index() == child.array_index() {
                    break;
                }
                out.push(carry(piece, a, b, Span::from_top(&paralog)));
            }
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alignment::AlignmentBuilder;
    use crate::core::genome::Genome;
    use crate::core::segment::{BottomSegment, TopSegment};

    fn genome_id(alignment: &Alignment, name: &str) -> GenomeId {
        alignment.genome_id(name).unwrap()
    }

    fn map(alignment: &Alignment, span: Span, target: GenomeId) -> Vec<MappedSegment> {
        map_span(alignment, span, target, &MapOptions::default()).unwrap()
    }

    #[test]
    fn test_span_bounds() {
        let span = Span::new(GenomeId(0), 9, 4, true);
        assert_eq!((span.lo(), span.hi()), (6, 9));
        assert_eq!(span.sub_span(1, 2), Span::new(GenomeId(0), 8, 2, true));
        let span = Span::new(GenomeId(0), 6, 4, false);
        assert_eq!((span.lo(), span.hi()), (6, 9));
    }

    #[test]
    fn test_map_up_and_down_through_inversion() {
        let mut builder = AlignmentBuilder::identical_parent_child(1, 20, 5);
        builder.invert_run("parent", "child", 1, 2).unwrap();
        let alignment = builder.build().unwrap();
        let child = genome_id(&alignment, "child");
        let parent = genome_id(&alignment, "parent");

        // child 3..=7 spans segments 0 (forward) and 1 (inverted onto parent 2)
        let mapped = map(&alignment, Span::new(child, 3, 5, false), parent);
        assert_eq!(
            mapped,
            vec![
                MappedSegment {
                    source: Span::new(child, 3, 2, false),
                    target: Span::new(parent, 3, 2, false),
                },
                MappedSegment {
                    source: Span::new(child, 5, 3, false),
                    target: Span::new(parent, 14, 3, true),
                },
            ]
        );

        let back = map(&alignment, mapped[1].target, child);
        assert_eq!(back.len(), 1);
        assert_eq!(back[0].target, Span::new(child, 5, 3, false));

        let cursor = TopCursor::new(&alignment, child, 1).unwrap();
        let parent_cursor = BottomCursor::parent_of(&cursor).unwrap();
        let via_map = map(&alignment, Span::from_top(&cursor), parent);
        assert_eq!(via_map[0].target, Span::from_bottom(&parent_cursor));
    }

    #[test]
    fn test_unaligned_pieces_are_dropped() {
        let mut builder = AlignmentBuilder::identical_parent_child(1, 20, 5);
        builder.unlink_top("parent", "child", 1).unwrap();
        let alignment = builder.build().unwrap();
        let child = genome_id(&alignment, "child");
        let parent = genome_id(&alignment, "parent");

        let mapped = map(&alignment, Span::new(child, 12, 10, true), parent);
        let sources: Vec<_> = mapped.iter().map(|m| m.source).collect();
        assert_eq!(
            sources,
            vec![Span::new(child, 12, 3, true), Span::new(child, 4, 2, true)]
        );
        assert!(mapped.iter().all(|m| m.target.reversed));
    }

    #[test]
    fn test_map_across_siblings_splits_on_both_segmentations() {
        // both children follow the ancestor's two segments
        let alignment = AlignmentBuilder::new()
            .with_genome(
                Genome::new("anc")
                    .with_children(["left", "right"])
                    .with_sequence("s", 12)
                    .with_bottom_segments(vec![
                        BottomSegment::new(0, 6, 2).with_child(0, 0, false).with_child(1, 0, false),
                        BottomSegment::new(6, 6, 2).with_child(0, 1, false).with_child(1, 1, false),
                    ]),
            )
            .with_genome(
                Genome::new("left")
                    .with_sequence("s", 12)
                    .with_top_segments(vec![
                        TopSegment::new(0, 6).with_parent(0, false),
                        TopSegment::new(6, 6).with_parent(1, false),
                    ]),
            )
            .with_genome(
                Genome::new("right")
                    .with_sequence("s", 12)
                    .with_top_segments(vec![
                        TopSegment::new(0, 6).with_parent(0, false),
                        TopSegment::new(6, 6).with_parent(1, false),
                    ]),
            )
            .build()
            .unwrap();
        let left = genome_id(&alignment, "left");
        let right = genome_id(&alignment, "right");

        let mapped = map(&alignment, Span::new(left, 2, 8, false), right);
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[0].target, Span::new(right, 2, 4, false));
        assert_eq!(mapped[1].target, Span::new(right, 6, 4, false));
        let covered: u64 = mapped.iter().map(|m| m.source.length).sum();
        assert_eq!(covered, 8);
    }

    #[test]
    fn test_parse_splits_between_segmentations() {
        // mid has one top segment but splits its bottom side 4 + 8
        let alignment = AlignmentBuilder::new()
            .with_genome(
                Genome::new("root")
                    .with_children(["mid"])
                    .with_sequence("s", 12)
                    .with_bottom_segments(vec![BottomSegment::new(0, 12, 1).with_child(0, 0, false)]),
            )
            .with_genome(
                Genome::new("mid")
                    .with_children(["leaf"])
                    .with_sequence("s", 12)
                    .with_top_segments(vec![TopSegment::new(0, 12).with_parent(0, false)])
                    .with_bottom_segments(vec![
                        BottomSegment::new(0, 4, 1).with_child(0, 0, false),
                        BottomSegment::new(4, 8, 1).with_child(0, 1, false),
                    ]),
            )
            .with_genome(
                Genome::new("leaf")
                    .with_sequence("s", 12)
                    .with_top_segments(vec![
                        TopSegment::new(0, 4).with_parent(0, false),
                        TopSegment::new(4, 8).with_parent(1, false),
                    ]),
            )
            .build()
            .unwrap();
        let root = genome_id(&alignment, "root");
        let leaf = genome_id(&alignment, "leaf");

        let mapped = map(&alignment, Span::new(root, 0, 12, false), leaf);
        let targets: Vec<_> = mapped.iter().map(|m| m.target).collect();
        assert_eq!(
            targets,
            vec![Span::new(leaf, 0, 4, false), Span::new(leaf, 4, 8, false)]
        );
        assert_eq!(mapped[1].source, Span::new(root, 4, 8, false));

        let mapped = map(&alignment, Span::new(leaf, 9, 8, true), root);
        let targets: Vec<_> = mapped.iter().map(|m| m.target).collect();
        assert_eq!(
            targets,
            vec![Span::new(root, 9, 6, true), Span::new(root, 3, 2, true)]
        );
    }

    #[test]
    fn test_overlaps_only_touches_covering_segments() {
        let segments = [(0, 5), (5, 5), (10, 5), (15, 5)];
        let span = Span::new(GenomeId(0), 12, 6, true);
        assert_eq!(overlaps(&segments, |s| *s, &span), vec![(2, 10, 12), (1, 7, 9)]);
        let span = Span::new(GenomeId(0), 19, 1, false);
        assert_eq!(overlaps(&segments, |s| *s, &span), vec![(3, 19, 19)]);
    }

    /// child1 holds three copies of the parent's only segment, all inverted
    fn sister_paralogs() -> Alignment {
        AlignmentBuilder::new()
            .with_genome(
                Genome::new("parent")
                    .with_children(["child1", "child2"])
                    .with_sequence("s", 3)
                    .with_bottom_segments(vec![BottomSegment::new(0, 3, 2)
                        .with_child(0, 0, true)
                        .with_child(1, 0, false)]),
            )
            .with_genome(
                Genome::new("child1")
                    .with_sequence("s", 9)
                    .with_top_segments(vec![
                        TopSegment::new(0, 3).with_parent(0, true).with_next_paralogy(1),
                        TopSegment::new(3, 3).with_parent(0, true).with_next_paralogy(2),
                        TopSegment::new(6, 3).with_parent(0, true).with_next_paralogy(0),
                    ]),
            )
            .with_genome(
                Genome::new("child2")
                    .with_sequence("s", 9)
                    .with_top_segments(vec![
                        TopSegment::new(0, 3).with_parent(0, false),
                        TopSegment::new(3, 3),
                        TopSegment::new(6, 3),
                    ]),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_paralogy_ring_expands_on_the_way_down() {
        let alignment = sister_paralogs();
        let child1 = genome_id(&alignment, "child1");
        let child2 = genome_id(&alignment, "child2");
        let source = Span::new(child2, 0, 3, false);

        let mapped = map(&alignment, source, child1);
        let targets: Vec<_> = mapped.iter().map(|m| m.target).collect();
        assert_eq!(
            targets,
            vec![
                Span::new(child1, 2, 3, true),
                Span::new(child1, 5, 3, true),
                Span::new(child1, 8, 3, true),
            ]
        );
        assert!(mapped.iter().all(|m| m.source == source));

        let options = MapOptions::new().with_no_dupes(true);
        let mapped = map_span(&alignment, source, child1, &options).unwrap();
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].target, Span::new(child1, 2, 3, true));

        // copies in the source genome are not homologs of the source
        let mapped = map(&alignment, Span::new(child1, 0, 3, false), child2);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].target, Span::new(child2, 2, 3, true));
    }

    /// parent duplicated root's only segment three times; grandChild1 kept
    /// all three copies, grandChild2 only the first
    fn duplication_above_common_ancestor() -> Alignment {
        AlignmentBuilder::new()
            .with_genome(
                Genome::new("root")
                    .with_children(["parent"])
                    .with_sequence("s", 3)
                    .with_bottom_segments(vec![BottomSegment::new(0, 3, 1).with_child(0, 0, false)]),
            )
            .with_genome(
                Genome::new("parent")
                    .with_children(["grandChild1", "grandChild2"])
                    .with_sequence("s", 9)
                    .with_top_segments(vec![
                        TopSegment::new(0, 3).with_parent(0, false).with_next_paralogy(1),
                        TopSegment::new(3, 3).with_parent(0, false).with_next_paralogy(2),
                        TopSegment::new(6, 3).with_parent(0, false).with_next_paralogy(0),
                    ])
                    .with_bottom_segments(vec![
                        BottomSegment::new(0, 3, 2).with_child(0, 0, true).with_child(1, 0, false),
                        BottomSegment::new(3, 3, 2).with_child(0, 1, true),
                        BottomSegment::new(6, 3, 2).with_child(0, 2, true),
                    ]),
            )
            .with_genome(
                Genome::new("grandChild1")
                    .with_sequence("s", 9)
                    .with_top_segments(vec![
                        TopSegment::new(0, 3).with_parent(0, true),
                        TopSegment::new(3, 3).with_parent(1, true),
                        TopSegment::new(6, 3).with_parent(2, true),
                    ]),
            )
            .with_genome(
                Genome::new("grandChild2")
                    .with_sequence("s", 9)
                    .with_top_segments(vec![
                        TopSegment::new(0, 3).with_parent(0, false),
                        TopSegment::new(3, 3),
                        TopSegment::new(6, 3),
                    ]),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn test_coalescence_limit_reaches_older_paralogs() {
        let alignment = duplication_above_common_ancestor();
        let root = genome_id(&alignment, "root");
        let parent = genome_id(&alignment, "parent");
        let gc1 = genome_id(&alignment, "grandChild1");
        let gc2 = genome_id(&alignment, "grandChild2");
        let source = Span::new(gc2, 0, 3, false);

        let mapped = map(&alignment, source, gc1);
        assert_eq!(
            mapped,
            vec![MappedSegment {
                source,
                target: Span::new(gc1, 2, 3, true),
            }]
        );
        let at_mrca = MapOptions::new().with_coalescence_limit(Some(parent));
        assert_eq!(map_span(&alignment, source, gc1, &at_mrca).unwrap(), mapped);

        let options = MapOptions::new().with_coalescence_limit(Some(root));
        let mapped = map_span(&alignment, source, gc1, &options).unwrap();
        let targets: Vec<_> = mapped.iter().map(|m| m.target).collect();
        assert_eq!(
            targets,
            vec![
                Span::new(gc1, 2, 3, true),
                Span::new(gc1, 5, 3, true),
                Span::new(gc1, 8, 3, true),
            ]
        );
        assert!(mapped.iter().all(|m| m.source == source));

        let options = options.with_no_dupes(true);
        assert_eq!(map_span(&alignment, source, gc1, &options).unwrap().len(), 1);
    }

    #[test]
    fn test_coalescence_limit_must_be_an_ancestor() {
        let alignment = duplication_above_common_ancestor();
        let gc1 = genome_id(&alignment, "grandChild1");
        let gc2 = genome_id(&alignment, "grandChild2");

        let options = MapOptions::new().with_coalescence_limit(Some(gc1));
        let err = map_span(&alignment, Span::new(gc2, 0, 3, false), gc1, &options).unwrap_err();
        assert!(matches!(err, CursorError::NotAnAncestor { .. }));
        assert_eq!(
            err.to_string(),
            "Genome 'grandChild1' is not an ancestor of 'parent'"
        );
    }

    #[test]
    fn test_rejects_span_outside_genome() {
        let alignment = AlignmentBuilder::identical_parent_child(1, 20, 5)
            .build()
            .unwrap();
        let child = genome_id(&alignment, "child");
        let options = MapOptions::default();
        assert!(map_span(&alignment, Span::new(child, 18, 5, false), child, &options).is_err());
        assert!(map_span(&alignment, Span::new(child, 2, 5, true), child, &options).is_err());
        assert!(map_span(&alignment, Span::new(child, 2, 0, false), child, &options).is_err());
    }
}
