//! In-memory alignment store.
//!
//! An [`Alignment`] owns every [`Genome`](crate::core::Genome) of the tree and
//! is immutable once built. Building resolves parent/child relationships from
//! child names, derives per-sequence indices and parse links, and validates:
//!
//! - sequences and both segment arrays tile each genome in order
//! - parent and child links are reciprocal and join equal-length segments
//! - paralogy rings close and share one parent segment
//! - parse links join overlapping segments of the same genome
//!
//! Alignments are described in JSON (optionally gzip-compressed):
//!
//! ```json
//! {
//!   "version": "1.0.0",
//!   "genomes": [
//!     { "name": "anc", "children": ["leaf"], "sequences": [{"name": "s", "length": 4}],
//!       "bottom_segments": [{"start": 0, "length": 4, "children": [{"index": 0}]}] },
//!     { "name": "leaf", "sequences": [{"name": "s", "length": 4}],
//!       "top_segments": [{"start": 0, "length": 4, "parent_index": 0}] }
//!   ]
//! }
//! ```

pub mod builder;
pub mod store;

pub use builder::AlignmentBuilder;
pub use store::{Alignment, AlignmentData, AlignmentError, ALIGNMENT_VERSION};
