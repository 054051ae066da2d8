//! # hal-column
//!
//! Traversal of multi-genome alignments organised as a genome tree.
//!
//! Every genome's sequence is partitioned twice: into top segments aligned
//! to its parent and into bottom segments aligned to its children. Paralogy
//! rings link top segments that share one parent segment. From these links
//! the crate derives:
//!
//! - **Columns**: for each base of a reference range, every homologous base
//!   in every genome of the tree, including bases in gaps next to the range
//! - **Blocks**: maximal colinear runs of segments, absorbing small indels
//! - **Mappings**: the pieces of one genome's interval that align to another
//!   genome
//!
//! ## Example
//!
//! ```rust,no_run
//! use hal_column::{Alignment, ColumnIterator, ColumnOptions};
//!
//! let alignment = Alignment::load_from_file("alignment.json".as_ref()).unwrap();
//! let chr1 = alignment.sequence_by_name("human", "chr1").unwrap().id();
//!
//! let options = ColumnOptions::default().with_targets(["mouse", "rat"]);
//! let mut columns = ColumnIterator::new(&alignment, chr1, 0, Some(99), options).unwrap();
//! while !columns.last_column() {
//!     let bases: usize = columns.column_map().values().map(Vec::len).sum();
//!     println!("{}: {bases} bases", columns.array_index());
//!     columns.advance().unwrap();
//! }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Genomes, sequences, segments and identifiers
//! - [`alignment`]: The in-memory alignment store and its builder
//! - [`traversal`]: Cursors, breakpoint classification, columns, blocks, mapping
//! - [`cli`]: Command-line interface implementation
//! - [`utils`]: Alignment validation

pub mod alignment;
pub mod cli;
pub mod core;
pub mod traversal;
pub mod utils;

// Re-export commonly used types for convenience
pub use alignment::{Alignment, AlignmentBuilder, AlignmentError};
pub use core::genome::{Genome, SegmentedSequence, Sequence, SequenceRef};
pub use core::segment::{BottomSegment, ChildLink, TopSegment};
pub use core::types::*;
pub use traversal::{
    map_span, BottomCursor, ColumnError, ColumnIterator, ColumnMap, ColumnOptions, CursorError,
    GappedBottomIterator, GappedTopIterator, MapOptions, MappedSegment, Rearrangement,
    RearrangementKind, Span, TopCursor,
};
