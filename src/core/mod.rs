//! Core data model of a hierarchical alignment.
//!
//! - [`Genome`]: a tree node owning its sequences, bases and segment arrays
//! - [`Sequence`] / [`SequenceRef`]: named contiguous ranges of a genome
//! - [`TopSegment`]: an interval aligned upward to one parent bottom segment
//! - [`BottomSegment`]: an interval aligned downward to one top segment per child
//! - [`GenomeId`], [`SequenceId`], [`ColumnPosition`]: lightweight handles
//!
//! ## Segment links
//!
//! | Field | On | Points to |
//! |-------|----|-----------|
//! | `parent_index` | top | bottom segment in the parent genome |
//! | `children[slot]` | bottom | top segment in child genome `slot` |
//! | `bottom_parse_index` | top | bottom segment of the same genome overlapping the top's start |
//! | `top_parse_index` | bottom | top segment of the same genome overlapping the bottom's start |
//! | `next_paralogy_index` | top | next segment of the paralogy ring |
//!
//! Segments never change once an alignment is built; traversal state lives in
//! cursors (see [`crate::traversal`]).

pub mod genome;
pub mod segment;
pub mod types;

pub use genome::{Genome, SegmentedSequence, Sequence, SequenceRef};
pub use segment::{BottomSegment, ChildLink, TopSegment};
pub use types::{ColumnPosition, GenomeId, SegmentSide, SequenceId};
