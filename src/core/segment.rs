use serde::{Deserialize, Serialize};

/// A top segment: an interval of a genome aligned to one bottom segment of
/// the parent genome.
///
/// Index links are `None` when absent. `sequence` is derived from the genome's
/// sequence layout when the alignment is built and is not serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopSegment {
    /// Genome coordinate of the first base
    pub start: u64,

    /// Number of bases (always > 0)
    pub length: u64,

    /// Index of the aligned bottom segment in the parent genome
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_index: Option<usize>,

    /// True if the segment aligns to the reverse strand of its parent
    #[serde(default, skip_serializing_if = "is_false")]
    pub parent_reversed: bool,

    /// Next member of this segment's paralogy ring
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_paralogy_index: Option<usize>,

    /// Bottom segment of the same genome containing `start`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottom_parse_index: Option<usize>,

    /// Distance from the parse bottom segment's start to `start`
    #[serde(default, skip_serializing_if = "is_zero")]
    pub bottom_parse_offset: u64,

    #[serde(skip)]
    pub sequence: usize,
}

/// Link from a bottom segment to one child genome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChildLink {
    /// Index of the aligned top segment in the child genome
    #[serde(default)]
    pub index: Option<usize>,

    /// True if the child aligns to the reverse strand
    #[serde(default, skip_serializing_if = "is_false")]
    pub reversed: bool,
}

impl ChildLink {
    #[must_use]
    pub fn new(index: usize, reversed: bool) -> Self {
        Self {
            index: Some(index),
            reversed,
        }
    }

    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }
}

/// A bottom segment: an interval of a genome aligned to one top segment in
/// each child genome (or to nothing in that child).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BottomSegment {
    pub start: u64,

    pub length: u64,

    /// One link per child slot, in the genome's child order
    #[serde(default)]
    pub children: Vec<ChildLink>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_paralogy_index: Option<usize>,

    /// Top segment of the same genome containing `start`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_parse_index: Option<usize>,

    #[serde(default, skip_serializing_if = "is_zero")]
    pub top_parse_offset: u64,

    #[serde(skip)]
    pub sequence: usize,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_false(b: &bool) -> bool {
    !*b
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(n: &u64) -> bool {
    *n == 0
}

impl TopSegment {
    /// Create an unaligned top segment
    #[must_use]
    pub fn new(start: u64, length: u64) -> Self {
        Self {
            start,
            length,
            parent_index: None,
            parent_reversed: false,
            next_paralogy_index: None,
            bottom_parse_index: None,
            bottom_parse_offset: 0,
            sequence: 0,
        }
    }

    /// Builder method: align to a parent bottom segment
    #[must_use]
    pub fn with_parent(mut self, index: usize, reversed: bool) -> Self {
        self.parent_index = Some(index);
        self.parent_reversed = reversed;
        self
    }

    /// Builder method: set the next paralog in the ring
    #[must_use]
    pub fn with_next_paralogy(mut self, index: usize) -> Self {
        self.next_paralogy_index = Some(index);
        self
    }

    /// Last base covered (inclusive)
    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.length - 1
    }

    #[must_use]
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.start + self.length
    }
}

impl BottomSegment {
    /// Create a bottom segment with `num_children` empty child slots
    #[must_use]
    pub fn new(start: u64, length: u64, num_children: usize) -> Self {
        Self {
            start,
            length,
            children: vec![ChildLink::none(); num_children],
            next_paralogy_index: None,
            top_parse_index: None,
            top_parse_offset: 0,
            sequence: 0,
        }
    }

    /// Builder method: align a child slot to a top segment of that child
    ///
    /// # Panics
    ///
    /// Panics if `slot` is not a valid child slot.
    #[must_use]
    pub fn with_child(mut self, slot: usize, index: usize, reversed: bool) -> Self {
        self.children[slot] = ChildLink::new(index, reversed);
        self
    }

    #[must_use]
    pub fn end(&self) -> u64 {
        self.start + self.length - 1
    }

    #[must_use]
    pub fn contains(&self, position: u64) -> bool {
        position >= self.start && position < self.start + self.length
    }

    /// Child link for a slot, if the slot exists and is aligned
    #[must_use]
    pub fn child(&self, slot: usize) -> Option<ChildLink> {
        self.children
            .get(slot)
            .copied()
            .filter(|link| link.index.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_segment_serde_skips_defaults() {
        let seg = TopSegment::new(10, 5).with_parent(3, true);
        let json = serde_json::to_string(&seg).unwrap();
        assert!(json.contains("\"parent_index\":3"));
        assert!(json.contains("\"parent_reversed\":true"));
        assert!(!json.contains("next_paralogy_index"));
        assert!(!json.contains("sequence"));

        let back: TopSegment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seg);
    }

    #[test]
    fn test_bottom_segment_child_lookup() {
        let seg = BottomSegment::new(0, 12, 2).with_child(1, 4, false);
        assert!(seg.child(0).is_none());
        assert_eq!(seg.child(1), Some(ChildLink::new(4, false)));
        assert!(seg.child(2).is_none());
        assert_eq!(seg.end(), 11);
        assert!(seg.contains(11));
        assert!(!seg.contains(12));
    }
}
