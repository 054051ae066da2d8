//! Incremental construction of in-memory alignments.

use crate::alignment::store::{Alignment, AlignmentError};
use crate::core::genome::Genome;
use crate::core::segment::{BottomSegment, ChildLink, TopSegment};

/// Collects genomes and edits their links before building an [`Alignment`]
#[derive(Debug, Default)]
pub struct AlignmentBuilder {
    genomes: Vec<Genome>,
}

impl AlignmentBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: add a genome
    #[must_use]
    pub fn with_genome(mut self, genome: Genome) -> Self {
        self.genomes.push(genome);
        self
    }

    pub fn add_genome(&mut self, genome: Genome) {
        self.genomes.push(genome);
    }

    pub fn genome_mut(&mut self, name: &str) -> Option<&mut Genome> {
        self.genomes.iter_mut().find(|g| g.name == name)
    }

    /// Align top segment `top` of `child` to bottom segment `bottom` of
    /// `parent`, updating both ends of the edge.
    ///
    /// # Errors
    ///
    /// Returns an error if either genome is unknown, `child` is not listed as
    /// a child of `parent`, or a segment index is out of range.
    pub fn link(
        &mut self,
        parent: &str,
        bottom: usize,
        child: &str,
        top: usize,
        reversed: bool,
    ) -> Result<(), AlignmentError> {
        let slot = self.slot_of(parent, child)?;
        let parent_genome = self
            .genome_mut(parent)
            .ok_or_else(|| AlignmentError::UnknownGenome(parent.to_string()))?;
        let slots = parent_genome.children.len();
        let bottom_seg = parent_genome
            .bottom_segments
            .get_mut(bottom)
            .ok_or_else(|| segment_error(parent, "bottom", bottom))?;
        if bottom_seg.children.len() < slots {
            bottom_seg.children.resize(slots, ChildLink::none());
        }
        bottom_seg.children[slot] = ChildLink::new(top, reversed);

        let child_genome = self
            .genome_mut(child)
            .ok_or_else(|| AlignmentError::UnknownGenome(child.to_string()))?;
        let top_seg = child_genome
            .top_segments
            .get_mut(top)
            .ok_or_else(|| segment_error(child, "top", top))?;
        top_seg.parent_index = Some(bottom);
        top_seg.parent_reversed = reversed;
        Ok(())
    }

    /// Remove the parent link of `top` in `child`, and the matching child
    /// link in the parent if it points back at `top`.
    ///
    /// # Errors
    ///
    /// Returns an error if the genome or segment is unknown.
    pub fn unlink_top(&mut self, parent: &str, child: &str, top: usize) -> Result<(), AlignmentError> {
        let slot = self.slot_of(parent, child)?;
        let child_genome = self
            .genome_mut(child)
            .ok_or_else(|| AlignmentError::UnknownGenome(child.to_string()))?;
        let top_seg = child_genome
            .top_segments
            .get_mut(top)
            .ok_or_else(|| segment_error(child, "top", top))?;
        let Some(bottom) = top_seg.parent_index.take() else {
            return Ok(());
        };
        top_seg.parent_reversed = false;

        if let Some(bottom_seg) = self
            .genome_mut(parent)
            .and_then(|g| g.bottom_segments.get_mut(bottom))
        {
            if bottom_seg.children.get(slot).and_then(|l| l.index) == Some(top) {
                bottom_seg.children[slot] = ChildLink::none();
            }
        }
        Ok(())
    }

    /// Reverse the alignment of `count` consecutive child top segments
    /// starting at `first`: segment `first + k` is re-linked, reversed, to the
    /// parent bottom segment that segment `first + count - 1 - k` pointed at.
    /// All segments in the run must share one length.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment in the run has no parent.
    pub fn invert_run(
        &mut self,
        parent: &str,
        child: &str,
        first: usize,
        count: usize,
    ) -> Result<(), AlignmentError> {
        let child_genome = self
            .genomes
            .iter()
            .find(|g| g.name == child)
            .ok_or_else(|| AlignmentError::UnknownGenome(child.to_string()))?;
        let mut targets = Vec::with_capacity(count);
        for idx in first..first + count {
            let seg = child_genome
                .top_segments
                .get(idx)
                .ok_or_else(|| segment_error(child, "top", idx))?;
            let parent_idx = seg
                .parent_index
                .ok_or_else(|| segment_error(child, "aligned top", idx))?;
            targets.push((parent_idx, seg.parent_reversed));
        }
        for (k, &(bottom, reversed)) in targets.iter().rev().enumerate() {
            self.link(parent, bottom, child, first + k, !reversed)?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns any error raised while validating the assembled alignment.
    pub fn build(self) -> Result<Alignment, AlignmentError> {
        Alignment::from_genomes(self.genomes)
    }

    /// A root `parent` and a leaf `child` with identical sequences and
    /// identical segmentation, aligned one-to-one on the forward strand.
    #[must_use]
    pub fn identical_parent_child(
        num_sequences: usize,
        sequence_length: u64,
        segment_length: u64,
    ) -> Self {
        let mut parent = Genome::new("parent").with_children(["child"]);
        let mut child = Genome::new("child");
        let mut bottoms = Vec::new();
        let mut tops = Vec::new();
        for s in 0..num_sequences {
            let name = format!("Sequence_{s}");
            parent = parent.with_sequence(name.clone(), sequence_length);
            child = child.with_sequence(name, sequence_length);
            let offset = s as u64 * sequence_length;
            let mut start = 0;
            while start < sequence_length {
                let length = segment_length.min(sequence_length - start);
                let idx = tops.len();
                bottoms.push(BottomSegment::new(offset + start, length, 1).with_child(0, idx, false));
                tops.push(TopSegment::new(offset + start, length).with_parent(idx, false));
                start += length;
            }
        }
        Self::new()
            .with_genome(parent.with_bottom_segments(bottoms))
            .with_genome(child.with_top_segments(tops))
    }

    fn slot_of(&self, parent: &str, child: &str) -> Result<usize, AlignmentError> {
        let parent_genome = self
            .genomes
            .iter()
            .find(|g| g.name == parent)
            .ok_or_else(|| AlignmentError::UnknownGenome(parent.to_string()))?;
        parent_genome
            .children
            .iter()
            .position(|c| c == child)
            .ok_or_else(|| AlignmentError::Invalid {
                genome: child.to_string(),
                message: format!("not a child of '{parent}'"),
            })
    }
}

fn segment_error(genome: &str, side: &str, index: usize) -> AlignmentError {
    AlignmentError::Invalid {
        genome: genome.to_string(),
        message: format!("no {side} segment {index}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::genome::SegmentedSequence;

    #[test]
    fn test_identical_parent_child_builds() {
        let alignment = AlignmentBuilder::identical_parent_child(2, 100, 5)
            .build()
            .unwrap();
        let child = alignment.genome_by_name("child").unwrap();
        let parent = alignment.genome_by_name("parent").unwrap();
        assert_eq!(child.num_top_segments(), 40);
        assert_eq!(parent.num_bottom_segments(), 40);
        assert_eq!(child.top_segments[21].start, 105);
        assert_eq!(child.top_segments[21].sequence, 1);
        assert_eq!(parent.bottom_segments[21].child(0), Some(ChildLink::new(21, false)));
    }

    #[test]
    fn test_invert_run_keeps_links_reciprocal() {
        let mut builder = AlignmentBuilder::identical_parent_child(1, 20, 5);
        builder.invert_run("parent", "child", 0, 4).unwrap();
        let alignment = builder.build().unwrap();
        let child = alignment.genome_by_name("child").unwrap();
        assert_eq!(child.top_segments[0].parent_index, Some(3));
        assert!(child.top_segments[0].parent_reversed);
        assert_eq!(child.top_segments[3].parent_index, Some(0));
        let parent = alignment.genome_by_name("parent").unwrap();
        assert_eq!(parent.bottom_segments[3].child(0), Some(ChildLink::new(0, true)));
    }

    #[test]
    fn test_unlink_top_clears_both_ends() {
        let mut builder = AlignmentBuilder::identical_parent_child(1, 10, 5);
        builder.unlink_top("parent", "child", 1).unwrap();
        let alignment = builder.build().unwrap();
        let child = alignment.genome_by_name("child").unwrap();
        assert!(child.top_segments[1].parent_index.is_none());
        let parent = alignment.genome_by_name("parent").unwrap();
        assert!(parent.bottom_segments[1].child(0).is_none());
    }

    #[test]
    fn test_link_rejects_non_child() {
        let mut builder = AlignmentBuilder::identical_parent_child(1, 10, 5);
        assert!(builder.link("child", 0, "parent", 0, false).is_err());
    }
}
