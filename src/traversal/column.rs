//! Alignment column iteration.
//!
//! A [`ColumnIterator`] walks a range of one reference sequence and, for each
//! reference base, gathers every homologous base in the genome tree into a
//! column map keyed by sequence. Columns are built by following parent,
//! child, parse and paralogy edges outward from the reference base through
//! a [`LinkedGraph`] that is reused from column to column.
//!
//! Inserted and deleted regions are not part of any reference column. When
//! diving is enabled (`max_insertion_length > 0`), the iterator detects such
//! a gap right after the current column and pushes a frame that walks the
//! gap's bases as temporary reference positions before resuming. A visited
//! cache guarantees that no base is reported in two columns.
//!
//! ```rust,no_run
//! use hal_column::{Alignment, ColumnIterator, ColumnOptions};
//!
//! let alignment = Alignment::load_from_file("alignment.json".as_ref())?;
//! let sequence = alignment.sequence_by_name("human", "chr1")?.id();
//! let mut columns = ColumnIterator::new(&alignment, sequence, 0, None, ColumnOptions::default())?;
//! while !columns.last_column() {
//!     for (seq, positions) in columns.column_map() {
//!         println!("{}: {} bases", alignment.sequence_label(*seq), positions.len());
//!     }
//!     columns.advance()?;
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use thiserror::Error;
use tracing::{debug, trace};

use crate::alignment::Alignment;
use crate::core::genome::{Genome, SegmentedSequence, SequenceRef};
use crate::core::types::{ColumnPosition, GenomeId, SequenceId};
use crate::traversal::cursor::{BottomCursor, CursorError, TopCursor};
use crate::traversal::linked::{BottomNodeId, LinkedGraph, TopNodeId};
use crate::traversal::rearrangement::{GapRange, Rearrangement};

/// Default cap on the total length of gaps walked inside one dive
pub const DEFAULT_MAX_INSERTION_LENGTH: u64 = 50;

/// Default number of advances between automatic defragmentations
pub const DEFAULT_DEFRAGMENT_INTERVAL: usize = 1000;

/// Homologous bases of one column, grouped by sequence
pub type ColumnMap = BTreeMap<SequenceId, Vec<ColumnPosition>>;

#[derive(Error, Debug)]
pub enum ColumnError {
    #[error("Range {first}..={last} is outside sequence '{sequence}' of length {length}")]
    OutOfRange {
        sequence: String,
        first: u64,
        last: u64,
        length: u64,
    },

    #[error("Target genome '{0}' not found in alignment")]
    UnknownTarget(String),

    #[error("Invalid column options: {0}")]
    InvalidOptions(String),

    #[error("Column iterator is past its last column")]
    Exhausted,
}

/// Column iteration settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnOptions {
    /// Genomes to report; empty means every genome. The reference genome is
    /// always reported and traversal is limited to the tree connecting the
    /// targets with the reference.
    pub targets: Vec<String>,

    /// Largest total gap length walked by nested dives; 0 disables diving
    pub max_insertion_length: u64,

    /// Do not follow paralogy rings
    pub no_dupes: bool,

    /// Do not report internal (ancestral) genomes other than the reference
    pub no_ancestors: bool,

    /// Walk the reference range from its last base down to its first
    pub reverse_strand: bool,

    /// Report at most one base per non-reference genome in each column
    pub unique: bool,

    /// Follow paralogy rings only in the reference genome
    pub only_orthologs: bool,

    /// Compact the linked graph every this many advances; 0 never does
    pub defragment_interval: usize,
}

impl Default for ColumnOptions {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            max_insertion_length: DEFAULT_MAX_INSERTION_LENGTH,
            no_dupes: false,
            no_ancestors: false,
            reverse_strand: false,
            unique: false,
            only_orthologs: false,
            defragment_interval: DEFAULT_DEFRAGMENT_INTERVAL,
        }
    }
}

impl ColumnOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_targets<S: Into<String>>(mut self, targets: impl IntoIterator<Item = S>) -> Self {
        self.targets = targets.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_max_insertion_length(mut self, length: u64) -> Self {
        self.max_insertion_length = length;
        self
    }

    #[must_use]
    pub fn with_no_dupes(mut self, no_dupes: bool) -> Self {
        self.no_dupes = no_dupes;
        self
    }

    #[must_use]
    pub fn with_no_ancestors(mut self, no_ancestors: bool) -> Self {
        self.no_ancestors = no_ancestors;
        self
    }

    #[must_use]
    pub fn with_reverse_strand(mut self, reverse_strand: bool) -> Self {
        self.reverse_strand = reverse_strand;
        self
    }

    #[must_use]
    pub fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    #[must_use]
    pub fn with_only_orthologs(mut self, only_orthologs: bool) -> Self {
        self.only_orthologs = only_orthologs;
        self
    }

    #[must_use]
    pub fn with_defragment_interval(mut self, interval: usize) -> Self {
        self.defragment_interval = interval;
        self
    }
}

/// One level of the traversal stack. Frame 0 walks the caller's range; each
/// deeper frame walks a gap found next to its parent frame's position.
#[derive(Debug, Clone, Copy)]
struct Frame {
    sequence: SequenceId,
    /// Current reference base (genome coordinate)
    index: i64,
    /// Last base to visit (genome coordinate)
    last_index: i64,
    /// Gap length walked by this frame and every frame below it
    cumulative_inserted: u64,
    reversed: bool,
    anchor_top: TopNodeId,
    anchor_bottom: BottomNodeId,
    classifier: Rearrangement,
}

impl Frame {
    fn exhausted(&self) -> bool {
        if self.reversed {
            self.index <= self.last_index
        } else {
            self.index >= self.last_index
        }
    }

    fn passed(&self) -> bool {
        if self.reversed {
            self.index < self.last_index
        } else {
            self.index > self.last_index
        }
    }
}

/// Edge work queued while building a column
#[derive(Debug, Clone, Copy)]
enum Task {
    Parent(TopNodeId),
    Child(BottomNodeId, usize),
    NextDup(TopNodeId),
    ParseUp(BottomNodeId),
    ParseDown(TopNodeId),
}

/// Edge along which the gap search reached a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arrival {
    Anchor,
    Parent,
    Child(usize),
}

/// Navigation that validated topology guarantees to succeed
fn guaranteed<T>(result: Result<T, CursorError>, context: &str) -> T {
    match result {
        Ok(value) => value,
        Err(e) => panic!("{context}: {e}"),
    }
}

#[allow(clippy::cast_possible_wrap)]
fn to_index(position: u64) -> i64 {
    position as i64
}

/// Iterator over the alignment columns of a reference range
#[derive(Debug)]
pub struct ColumnIterator<'a> {
    alignment: &'a Alignment,
    options: ColumnOptions,
    reference_genome: GenomeId,
    /// Genomes the traversal may enter; `None` means all
    traversal: Option<HashSet<GenomeId>>,
    /// Genomes reported in columns; `None` means all
    reported: Option<HashSet<GenomeId>>,
    frames: Vec<Frame>,
    graph: LinkedGraph<'a>,
    column: ColumnMap,
    visited: HashMap<GenomeId, HashSet<u64>>,
    advances: usize,
}

impl<'a> ColumnIterator<'a> {
    /// Start iterating `reference` from `first` to `last` (sequence-relative,
    /// inclusive; `None` means the end of the sequence). The first column is
    /// available immediately.
    ///
    /// # Errors
    ///
    /// Returns `OutOfRange` for an empty or out-of-bounds range,
    /// `UnknownTarget` for a target name not in the alignment, and
    /// `InvalidOptions` when the options leave nothing to report.
    pub fn new(
        alignment: &'a Alignment,
        reference: SequenceId,
        first: u64,
        last: Option<u64>,
        options: ColumnOptions,
    ) -> Result<Self, ColumnError> {
        let sequence = alignment.sequence(reference);
        let length = sequence.sequence_length();
        let last = last.unwrap_or_else(|| length.saturating_sub(1));
        if first > last || last >= length {
            return Err(ColumnError::OutOfRange {
                sequence: alignment.sequence_label(reference),
                first,
                last,
                length,
            });
        }

        let mut targets = Vec::with_capacity(options.targets.len());
        for name in &options.targets {
            let id = alignment
                .genome_id(name)
                .ok_or_else(|| ColumnError::UnknownTarget(name.clone()))?;
            targets.push(id);
        }
        if options.no_ancestors
            && !targets.is_empty()
            && targets.iter().all(|&t| !alignment.genome(t).is_leaf())
        {
            return Err(ColumnError::InvalidOptions(
                "no_ancestors excludes every target genome".to_string(),
            ));
        }

        let reference_genome = reference.genome;
        let (traversal, reported) = if targets.is_empty() {
            (None, None)
        } else {
            let mut members = targets.clone();
            members.push(reference_genome);
            let tree = alignment.spanning_tree(&members);
            (Some(tree), Some(members.into_iter().collect()))
        };

        let start = sequence.start();
        let (index, last_index) = if options.reverse_strand {
            (start + last, start + first)
        } else {
            (start + first, start + last)
        };

        debug!(
            sequence = %alignment.sequence_label(reference),
            first,
            last,
            reverse = options.reverse_strand,
            max_insertion = options.max_insertion_length,
            "Starting column iteration"
        );

        let mut iter = Self {
            alignment,
            reference_genome,
            traversal,
            reported,
            frames: Vec::new(),
            graph: LinkedGraph::new(),
            column: ColumnMap::new(),
            visited: HashMap::new(),
            advances: 0,
            options,
        };
        let reversed = iter.options.reverse_strand;
        iter.push_frame(reference, to_index(index), to_index(last_index), reversed, 0);
        iter.check_column();
        Ok(iter)
    }

    /// Move to the next column.
    ///
    /// # Errors
    ///
    /// Returns `Exhausted` if the iterator is already past its last column;
    /// the iterator is unchanged in that case.
    pub fn advance(&mut self) -> Result<(), ColumnError> {
        if self.last_column() {
            return Err(ColumnError::Exhausted);
        }

        if !self.seek_gap() {
            loop {
                while self.frames.len() > 1 && self.top_frame().exhausted() {
                    self.frames.pop();
                    debug!(depth = self.frames.len(), "Leaving gap frame");
                    self.recompute();
                }
                self.step_index();
                if self.frames.len() > 1 && self.top_frame().passed() {
                    continue;
                }
                break;
            }
            self.recompute();
        }

        self.advances += 1;
        let interval = self.options.defragment_interval;
        if interval > 0 && self.advances % interval == 0 {
            self.defragment();
        }
        self.check_column();
        Ok(())
    }

    /// True once the root frame has moved past its last base; the column map
    /// is empty from then on.
    #[must_use]
    pub fn last_column(&self) -> bool {
        self.frames.len() == 1 && self.top_frame().passed()
    }

    #[must_use]
    pub fn column_map(&self) -> &ColumnMap {
        &self.column
    }

    /// Genome coordinate of the current reference base
    #[must_use]
    pub fn array_index(&self) -> i64 {
        self.top_frame().index
    }

    /// Sequence currently acting as the reference (a gap's sequence while
    /// diving)
    #[must_use]
    pub fn reference_sequence(&self) -> SequenceRef<'a> {
        self.alignment.sequence(self.top_frame().sequence)
    }

    #[must_use]
    pub fn reference_genome(&self) -> &'a Genome {
        self.alignment.genome(self.top_frame().sequence.genome)
    }

    /// Number of frames on the traversal stack; 1 outside dives
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn options(&self) -> &ColumnOptions {
        &self.options
    }

    /// Nodes currently held by the linked graph
    #[must_use]
    pub fn graph_size(&self) -> usize {
        self.graph.node_count()
    }

    /// Release graph nodes that only served earlier columns. The visited
    /// cache and the current column are kept.
    pub fn defragment(&mut self) {
        self.column.retain(|_, positions| !positions.is_empty());
        let anchors: Vec<_> = self
            .frames
            .iter()
            .map(|f| (f.anchor_top, f.anchor_bottom))
            .collect();
        let before = self.graph.node_count();
        let remapped = self.graph.compact(&anchors);
        for (frame, (top, bottom)) in self.frames.iter_mut().zip(remapped) {
            frame.anchor_top = top;
            frame.anchor_bottom = bottom;
        }
        // Links are rebuilt for the current column so the next gap search
        // sees a complete graph.
        self.recompute();
        debug!(
            before,
            after = self.graph.node_count(),
            "Defragmented column graph"
        );
    }

    fn top_frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn push_frame(
        &mut self,
        sequence: SequenceId,
        index: i64,
        last_index: i64,
        reversed: bool,
        cumulative_inserted: u64,
    ) {
        let genome = self.alignment.genome(sequence.genome);
        let anchor_top = self.graph.add_top();
        let anchor_bottom = self.graph.add_bottom(genome.num_children());
        self.frames.push(Frame {
            sequence,
            index,
            last_index,
            cumulative_inserted,
            reversed,
            anchor_top,
            anchor_bottom,
            classifier: Rearrangement::atomic(),
        });
        self.recompute();
    }

    fn traverses(&self, genome: GenomeId) -> bool {
        self.traversal.as_ref().map_or(true, |t| t.contains(&genome))
    }

    fn reports(&self, genome: GenomeId) -> bool {
        if self.reported.as_ref().is_some_and(|r| !r.contains(&genome)) {
            return false;
        }
        !(self.options.no_ancestors
            && genome != self.reference_genome
            && !self.alignment.genome(genome).is_leaf())
    }

    fn is_visited(&self, genome: GenomeId, position: u64) -> bool {
        self.visited
            .get(&genome)
            .is_some_and(|positions| positions.contains(&position))
    }

    /// Bases of the current reference sequence behind the current index were
    /// expanded by earlier columns; their edges are not followed again.
    fn in_range(&self, sequence: SequenceId, position: u64) -> bool {
        let frame = self.top_frame();
        if sequence != frame.sequence {
            return true;
        }
        let position = to_index(position);
        if frame.reversed {
            position <= frame.index
        } else {
            position >= frame.index
        }
    }

    fn top_in_range(&self, cursor: &TopCursor<'_>) -> bool {
        self.in_range(cursor.sequence_id(), cursor.start_position())
    }

    fn bottom_in_range(&self, cursor: &BottomCursor<'_>) -> bool {
        self.in_range(cursor.sequence_id(), cursor.start_position())
    }

    fn insert(&mut self, genome: GenomeId, position: u64, reversed: bool) {
        let frame_genome = self.top_frame().sequence.genome;
        if self.options.max_insertion_length > 0 || genome == frame_genome {
            self.visited.entry(genome).or_default().insert(position);
        }
        if !self.reports(genome) {
            return;
        }
        if self.options.unique && genome != self.reference_genome && self.column_has(genome) {
            return;
        }
        let g = self.alignment.genome(genome);
        let Some(sequence) = g.sequence_id_at(position) else {
            panic!("position {position} outside genome '{}'", g.name);
        };
        self.column.entry(sequence).or_default().push(ColumnPosition {
            genome,
            position,
            reversed,
        });
    }

    fn column_has(&self, genome: GenomeId) -> bool {
        self.column
            .range(SequenceId::new(genome, 0)..=SequenceId::new(genome, usize::MAX))
            .any(|(_, positions)| !positions.is_empty())
    }

    /// Rebuild the column at the top frame's index
    fn recompute(&mut self) {
        self.column.clear();
        self.graph.begin_epoch();

        let frame = *self.top_frame();
        let sequence = self.alignment.sequence(frame.sequence);
        let Ok(position) = u64::try_from(frame.index) else {
            return;
        };
        if frame.passed() || !sequence.sequence().contains(position) {
            return;
        }

        let genome = sequence.genome();
        let mut tasks = VecDeque::new();
        if genome.num_top_segments() > 0 {
            let mut cursor = guaranteed(
                TopCursor::at_position(self.alignment, genome.id(), position),
                "reference position",
            );
            if frame.reversed {
                cursor.to_reverse();
            }
            self.graph.place_top(frame.anchor_top, cursor);
            self.insert(genome.id(), position, frame.reversed);
            tasks.push_back(Task::Parent(frame.anchor_top));
            tasks.push_back(Task::ParseDown(frame.anchor_top));
            tasks.push_back(Task::NextDup(frame.anchor_top));
        } else if genome.num_bottom_segments() > 0 {
            let mut cursor = guaranteed(
                BottomCursor::at_position(self.alignment, genome.id(), position),
                "reference position",
            );
            if frame.reversed {
                cursor.to_reverse();
            }
            self.graph.place_bottom(frame.anchor_bottom, cursor);
            self.insert(genome.id(), position, frame.reversed);
            for slot in 0..genome.num_children() {
                tasks.push_back(Task::Child(frame.anchor_bottom, slot));
            }
        } else {
            self.insert(genome.id(), position, frame.reversed);
        }

        while let Some(task) = tasks.pop_front() {
            match task {
                Task::Parent(top) => self.update_parent(top, &mut tasks),
                Task::Child(bottom, slot) => self.update_child(bottom, slot, &mut tasks),
                Task::NextDup(top) => self.update_next_dup(top, &mut tasks),
                Task::ParseUp(bottom) => self.update_parse_up(bottom, &mut tasks),
                Task::ParseDown(top) => self.update_parse_down(top, &mut tasks),
            }
        }

        trace!(
            index = frame.index,
            depth = self.frames.len(),
            sequences = self.column.len(),
            "Computed column"
        );
    }

    fn update_parent(&mut self, top: TopNodeId, tasks: &mut VecDeque<Task>) {
        let Some(cursor) = self.graph.current_top(top) else {
            return;
        };
        let genome = cursor.genome();
        let Some(parent_id) = genome.parent() else {
            return;
        };
        if !cursor.has_parent() || !self.top_in_range(&cursor) || !self.traverses(parent_id) {
            return;
        }
        let parent = self.alignment.genome(parent_id);
        let Some(slot) = parent.child_index(genome.id()) else {
            unreachable!("'{}' missing from its parent's children", genome.name);
        };

        let node = self.graph.parent_of(top, slot, parent.num_children());
        let bottom = guaranteed(BottomCursor::parent_of(&cursor), "parent link");
        self.graph.place_bottom(node, bottom);
        self.insert(parent_id, bottom.start_position(), bottom.reversed());

        tasks.push_back(Task::ParseUp(node));
        for sibling in (0..parent.num_children()).filter(|&s| s != slot) {
            tasks.push_back(Task::Child(node, sibling));
        }
    }

    fn update_child(&mut self, bottom: BottomNodeId, slot: usize, tasks: &mut VecDeque<Task>) {
        let Some(cursor) = self.graph.current_bottom(bottom) else {
            return;
        };
        if !cursor.has_child(slot) || !self.bottom_in_range(&cursor) {
            return;
        }
        let Some(child_id) = cursor.genome().child(slot) else {
            return;
        };
        if !self.traverses(child_id) {
            return;
        }

        let node = self.graph.child_of(bottom, slot);
        let top = guaranteed(TopCursor::child_of(&cursor, slot), "child link");
        self.graph.place_top(node, top);
        self.insert(child_id, top.start_position(), top.reversed());

        tasks.push_back(Task::NextDup(node));
        tasks.push_back(Task::ParseDown(node));
    }

    fn update_next_dup(&mut self, top: TopNodeId, tasks: &mut VecDeque<Task>) {
        let Some(cursor) = self.graph.current_top(top) else {
            return;
        };
        if self.options.no_dupes
            || !cursor.has_next_paralogy()
            || (self.options.only_orthologs && cursor.genome_id() != self.reference_genome)
            || !self.top_in_range(&cursor)
        {
            return;
        }

        let first = cursor.array_index();
        let limit = cursor.genome().num_top_segments();
        let mut node = top;
        let mut current = cursor;
        for _ in 0..limit {
            guaranteed(current.to_next_paralogy(), "paralogy ring");
            if current.array_index() == first {
                return;
            }
            node = self.graph.next_dup_of(node);
            self.graph.place_top(node, current);
            self.insert(current.genome_id(), current.start_position(), current.reversed());
            tasks.push_back(Task::ParseDown(node));
        }
        panic!(
            "paralogy ring through top segment {first} of '{}' does not close",
            cursor.genome().name
        );
    }

    fn update_parse_up(&mut self, bottom: BottomNodeId, tasks: &mut VecDeque<Task>) {
        let Some(cursor) = self.graph.current_bottom(bottom) else {
            return;
        };
        if !cursor.has_parse_up() || !self.bottom_in_range(&cursor) {
            return;
        }
        let node = self.graph.top_parse_of(bottom);
        let top = guaranteed(TopCursor::parse_up_of(&cursor), "parse-up link");
        self.graph.place_top(node, top);
        tasks.push_back(Task::Parent(node));
        tasks.push_back(Task::NextDup(node));
    }

    fn update_parse_down(&mut self, top: TopNodeId, tasks: &mut VecDeque<Task>) {
        let Some(cursor) = self.graph.current_top(top) else {
            return;
        };
        if !cursor.has_parse_down() || !self.top_in_range(&cursor) {
            return;
        }
        let num_children = cursor.genome().num_children();
        let node = self.graph.bottom_parse_of(top, num_children);
        let bottom = guaranteed(BottomCursor::parse_down_of(&cursor), "parse-down link");
        self.graph.place_bottom(node, bottom);
        for slot in 0..num_children {
            tasks.push_back(Task::Child(node, slot));
        }
    }

    /// Look for a gap on either side of the current column and dive into the
    /// first acceptable one. Deletions are tested walking toward the root,
    /// insertions walking toward the leaves.
    fn seek_gap(&mut self) -> bool {
        if self.options.max_insertion_length == 0 {
            return false;
        }
        let frame = *self.top_frame();
        let mut stack: Vec<(TopNodeId, Arrival)> = Vec::new();
        if self.alignment.genome(frame.sequence.genome).num_top_segments() > 0 {
            stack.push((frame.anchor_top, Arrival::Anchor));
        } else if self.graph.is_current_bottom(frame.anchor_bottom) {
            self.push_gap_children(frame.anchor_bottom, None, &mut stack);
        }

        let mut seen = HashSet::new();
        while let Some((node, arrival)) = stack.pop() {
            if !seen.insert(node) {
                continue;
            }
            let Some(cursor) = self.graph.current_top(node) else {
                continue;
            };

            // Test the breakpoint ahead of the cursor, then the one behind it
            // through the mirrored cursor. Gaps behind are walked in the
            // cursor's own orientation.
            let mut behind = cursor;
            behind.to_reverse();
            for flank in [cursor, behind] {
                let gap = if arrival == Arrival::Parent {
                    frame.classifier.identify_insertion_from_left_breakpoint(&flank)
                } else {
                    frame.classifier.identify_deletion_from_left_breakpoint(&flank)
                };
                let Some(range) = gap else { continue };
                if self.try_dive(range.with_orientation(cursor.reversed())) {
                    return true;
                }
            }

            let links = self.graph.top(node).clone();
            if let Some(bottom) = links.bottom_parse.filter(|&b| self.graph.is_current_bottom(b)) {
                let skip = match arrival {
                    Arrival::Child(slot) => Some(slot),
                    _ => None,
                };
                self.push_gap_children(bottom, skip, &mut stack);
            }
            if arrival == Arrival::Parent {
                let mut dup = links.next_dup;
                while let Some(d) = dup.filter(|&d| self.graph.is_current_top(d)) {
                    stack.push((d, Arrival::Parent));
                    dup = self.graph.top(d).next_dup;
                }
            } else if let Some(parent) = links.parent.filter(|&p| self.graph.is_current_bottom(p)) {
                if let Some(up) = self
                    .graph
                    .bottom(parent)
                    .top_parse
                    .filter(|&t| self.graph.is_current_top(t))
                {
                    let slot = cursor
                        .genome()
                        .parent()
                        .and_then(|p| self.alignment.genome(p).child_index(cursor.genome_id()));
                    if let Some(slot) = slot {
                        stack.push((up, Arrival::Child(slot)));
                    }
                }
            }
        }
        false
    }

    fn push_gap_children(
        &self,
        bottom: BottomNodeId,
        skip: Option<usize>,
        stack: &mut Vec<(TopNodeId, Arrival)>,
    ) {
        for (slot, child) in self.graph.bottom(bottom).children.iter().enumerate() {
            if Some(slot) == skip {
                continue;
            }
            if let Some(child) = child.filter(|&c| self.graph.is_current_top(c)) {
                stack.push((child, Arrival::Parent));
            }
        }
    }

    fn try_dive(&mut self, range: GapRange) -> bool {
        let frame = *self.top_frame();
        let cumulative = frame.cumulative_inserted + range.length();
        if cumulative > self.options.max_insertion_length
            || !self.traverses(range.genome)
            || self.is_visited(range.genome, range.first)
            || self.is_visited(range.genome, range.second)
        {
            return false;
        }
        let Some(sequence) = self.alignment.genome(range.genome).sequence_id_at(range.first) else {
            return false;
        };
        debug!(
            sequence = %self.alignment.sequence_label(sequence),
            first = range.first,
            second = range.second,
            depth = self.frames.len() + 1,
            "Entering gap frame"
        );
        self.push_frame(
            sequence,
            to_index(range.first),
            to_index(range.second),
            range.reversed(),
            cumulative,
        );
        true
    }

    /// Advance the top frame one base, skipping bases already reported
    fn step_index(&mut self) {
        let frame_idx = self.frames.len() - 1;
        let frame = &mut self.frames[frame_idx];
        let step = if frame.reversed { -1 } else { 1 };
        let visited = self.visited.get(&frame.sequence.genome);
        frame.index += step;
        while let (Some(positions), Ok(position)) = (visited, u64::try_from(frame.index)) {
            if !positions.contains(&position) {
                break;
            }
            frame.index += step;
        }
    }

    /// # Panics
    ///
    /// Panics if a base appears twice in the current column.
    fn check_column(&self) {
        for (sequence, positions) in &self.column {
            let mut seen = HashSet::with_capacity(positions.len());
            for p in positions {
                assert!(
                    seen.insert(p.position),
                    "base {} of {} appears twice in the column at reference index {}",
                    p.position,
                    self.alignment.sequence_label(*sequence),
                    self.top_frame().index
                );
            }
        }
    }
}
