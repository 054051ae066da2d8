use serde::{Deserialize, Serialize};

use crate::core::segment::{BottomSegment, TopSegment};
use crate::core::types::{GenomeId, SequenceId};

/// Read access shared by genomes and their sequences
pub trait SegmentedSequence {
    /// Number of bases
    fn sequence_length(&self) -> u64;

    /// Number of top segments lying in this range
    fn num_top_segments(&self) -> usize;

    /// Number of bottom segments lying in this range
    fn num_bottom_segments(&self) -> usize;

    /// Bases `[start, start + length)` relative to this range, or `None` if
    /// the bases are unknown or the range is out of bounds
    fn sub_string(&self, start: u64, length: u64) -> Option<String>;
}

/// A named, contiguous range of a genome's coordinate space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sequence {
    pub name: String,

    pub length: u64,

    /// Genome coordinate of the first base, derived from sequence order
    #[serde(skip)]
    pub start: u64,

    #[serde(skip)]
    pub(crate) genome: GenomeId,

    /// Index range of the top segments inside this sequence
    #[serde(skip)]
    pub(crate) top_range: (usize, usize),

    /// Index range of the bottom segments inside this sequence
    #[serde(skip)]
    pub(crate) bottom_range: (usize, usize),
}

impl Sequence {
    #[must_use]
    pub fn new(name: impl Into<String>, length: u64) -> Self {
        Self {
            name: name.into(),
            length,
            start: 0,
            genome: GenomeId(0),
            top_range: (0, 0),
            bottom_range: (0, 0),
        }
    }

    #[must_use]
    pub fn genome(&self) -> GenomeId {
        self.genome
    }

    /// Last genome coordinate of the sequence (inclusive)
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.length - 1
    }

    #[must_use]
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.start + self.length
    }
}

/// One node of the genome tree together with its segment arrays
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Genome {
    pub name: String,

    /// Child genome names; the position in this list is the child slot
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<String>,

    pub sequences: Vec<Sequence>,

    /// Bases of the whole genome; empty when unknown
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dna: String,

    #[serde(default)]
    pub top_segments: Vec<TopSegment>,

    #[serde(default)]
    pub bottom_segments: Vec<BottomSegment>,

    #[serde(skip)]
    pub(crate) id: GenomeId,

    #[serde(skip)]
    pub(crate) parent: Option<GenomeId>,

    #[serde(skip)]
    pub(crate) child_ids: Vec<GenomeId>,
}

impl Genome {
    /// Create an empty genome
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            sequences: Vec::new(),
            dna: String::new(),
            top_segments: Vec::new(),
            bottom_segments: Vec::new(),
            id: GenomeId(0),
            parent: None,
            child_ids: Vec::new(),
        }
    }

    /// Builder method: append a sequence
    #[must_use]
    pub fn with_sequence(mut self, name: impl Into<String>, length: u64) -> Self {
        self.sequences.push(Sequence::new(name, length));
        self
    }

    /// Builder method: set the child genomes by name, in slot order
    #[must_use]
    pub fn with_children<S: Into<String>>(mut self, children: impl IntoIterator<Item = S>) -> Self {
        self.children = children.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method: set the bases
    #[must_use]
    pub fn with_dna(mut self, dna: impl Into<String>) -> Self {
        self.dna = dna.into();
        self
    }

    /// Builder method: set the top segment array
    #[must_use]
    pub fn with_top_segments(mut self, segments: Vec<TopSegment>) -> Self {
        self.top_segments = segments;
        self
    }

    /// Builder method: set the bottom segment array
    #[must_use]
    pub fn with_bottom_segments(mut self, segments: Vec<BottomSegment>) -> Self {
        self.bottom_segments = segments;
        self
    }

    #[must_use]
    pub fn id(&self) -> GenomeId {
        self.id
    }

    #[must_use]
    pub fn parent(&self) -> Option<GenomeId> {
        self.parent
    }

    #[must_use]
    pub fn child(&self, slot: usize) -> Option<GenomeId> {
        self.child_ids.get(slot).copied()
    }

    /// Slot under which `child` hangs from this genome
    #[must_use]
    pub fn child_index(&self, child: GenomeId) -> Option<usize> {
        self.child_ids.iter().position(|&id| id == child)
    }

    #[must_use]
    pub fn num_children(&self) -> usize {
        self.child_ids.len()
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.child_ids.is_empty()
    }

    #[must_use]
    pub fn top_segment(&self, index: usize) -> Option<&TopSegment> {
        self.top_segments.get(index)
    }

    #[must_use]
    pub fn bottom_segment(&self, index: usize) -> Option<&BottomSegment> {
        self.bottom_segments.get(index)
    }

    /// Index of the top segment containing a genome coordinate
    #[must_use]
    pub fn top_segment_index_at(&self, position: u64) -> Option<usize> {
        let idx = self
            .top_segments
            .partition_point(|seg| seg.start + seg.length <= position);
        self.top_segments
            .get(idx)
            .filter(|seg| seg.contains(position))
            .map(|_| idx)
    }

    /// Index of the bottom segment containing a genome coordinate
    #[must_use]
    pub fn bottom_segment_index_at(&self, position: u64) -> Option<usize> {
        let idx = self
            .bottom_segments
            .partition_point(|seg| seg.start + seg.length <= position);
        self.bottom_segments
            .get(idx)
            .filter(|seg| seg.contains(position))
            .map(|_| idx)
    }

    #[must_use]
    pub fn sequences(&self) -> &[Sequence] {
        &self.sequences
    }

    /// Index of the sequence containing a genome coordinate
    #[must_use]
    pub fn sequence_index_at(&self, position: u64) -> Option<usize> {
        let idx = self
            .sequences
            .partition_point(|seq| seq.start + seq.length <= position);
        self.sequences
            .get(idx)
            .filter(|seq| seq.contains(position))
            .map(|_| idx)
    }

    /// Sequence id for a genome coordinate
    #[must_use]
    pub fn sequence_id_at(&self, position: u64) -> Option<SequenceId> {
        self.sequence_index_at(position)
            .map(|idx| SequenceId::new(self.id, idx))
    }

    #[must_use]
    pub fn sequence_by_name(&self, name: &str) -> Option<SequenceRef<'_>> {
        self.sequences
            .iter()
            .position(|seq| seq.name == name)
            .map(|idx| SequenceRef::new(self, idx))
    }

    /// Base at a genome coordinate; `N` when the bases are unknown
    #[must_use]
    pub fn base(&self, position: u64) -> Option<char> {
        if position >= self.sequence_length() {
            return None;
        }
        if self.dna.is_empty() {
            return Some('N');
        }
        usize::try_from(position)
            .ok()
            .and_then(|pos| self.dna.as_bytes().get(pos))
            .map(|&b| char::from(b))
    }
}

impl SegmentedSequence for Genome {
    fn sequence_length(&self) -> u64 {
        self.sequences.iter().map(|seq| seq.length).sum()
    }

    fn num_top_segments(&self) -> usize {
        self.top_segments.len()
    }

    fn num_bottom_segments(&self) -> usize {
        self.bottom_segments.len()
    }

    fn sub_string(&self, start: u64, length: u64) -> Option<String> {
        if self.dna.is_empty() || start + length > self.sequence_length() {
            return None;
        }
        let from = usize::try_from(start).ok()?;
        let to = usize::try_from(start + length).ok()?;
        self.dna.get(from..to).map(str::to_string)
    }
}

/// A sequence viewed through its genome
#[derive(Debug, Clone, Copy)]
pub struct SequenceRef<'a> {
    genome: &'a Genome,
    index: usize,
}

impl<'a> SequenceRef<'a> {
    /// # Panics
    ///
    /// Panics if `index` is not a sequence of `genome`.
    #[must_use]
    pub fn new(genome: &'a Genome, index: usize) -> Self {
        assert!(
            index < genome.sequences.len(),
            "sequence index {index} out of range for genome '{}'",
            genome.name
        );
        Self { genome, index }
    }

    #[must_use]
    pub fn id(&self) -> SequenceId {
        SequenceId::new(self.genome.id, self.index)
    }

    #[must_use]
    pub fn genome(&self) -> &'a Genome {
        self.genome
    }

    #[must_use]
    pub fn sequence(&self) -> &'a Sequence {
        &self.genome.sequences[self.index]
    }

    #[must_use]
    pub fn name(&self) -> &'a str {
        &self.sequence().name
    }

    /// Genome coordinate of the first base
    #[must_use]
    pub fn start(&self) -> u64 {
        self.sequence().start
    }

    /// Index range `[first, last)` of the top segments of this sequence
    #[must_use]
    pub fn top_segment_range(&self) -> std::ops::Range<usize> {
        let (first, last) = self.sequence().top_range;
        first..last
    }

    /// Index range `[first, last)` of the bottom segments of this sequence
    #[must_use]
    pub fn bottom_segment_range(&self) -> std::ops::Range<usize> {
        let (first, last) = self.sequence().bottom_range;
        first..last
    }
}

impl SegmentedSequence for SequenceRef<'_> {
    fn sequence_length(&self) -> u64 {
        self.sequence().length
    }

    fn num_top_segments(&self) -> usize {
        self.top_segment_range().len()
    }

    fn num_bottom_segments(&self) -> usize {
        self.bottom_segment_range().len()
    }

    fn sub_string(&self, start: u64, length: u64) -> Option<String> {
        if start + length > self.sequence().length {
            return None;
        }
        self.genome.sub_string(self.start() + start, length)
    }
}
