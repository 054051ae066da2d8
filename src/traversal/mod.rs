//! Alignment traversal.
//!
//! | Module | Provides |
//! |--------|----------|
//! | [`cursor`] | `TopCursor` / `BottomCursor`: one position in a segment array |
//! | [`rearrangement`] | Single-breakpoint classification |
//! | [`linked`] | Arena of cursor nodes reused across columns |
//! | [`column`] | `ColumnIterator`: homologous bases for each reference base |
//! | [`gapped`] | Colinear blocks of segments |
//! | [`mapping`] | Interval mapping between any two genomes |

pub mod column;
pub mod cursor;
pub mod gapped;
pub mod linked;
pub mod mapping;
pub mod rearrangement;

pub use column::{ColumnError, ColumnIterator, ColumnMap, ColumnOptions};
pub use cursor::{BottomCursor, CursorError, LinkKind, TopCursor};
pub use gapped::{GappedBottomIterator, GappedTopIterator};
pub use mapping::{map_span, MapOptions, MappedSegment, Span};
pub use rearrangement::{Breakpoint, GapRange, Rearrangement, RearrangementKind};
