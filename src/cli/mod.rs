//! Command-line interface for hal-column.
//!
//! Available commands:
//!
//! - **columns**: Print the alignment columns of a reference range
//! - **blocks**: Print the colinear blocks of a genome against its parent
//! - **map**: Map an interval of one genome onto another
//!
//! ## Usage
//!
//! ```text
//! # Columns of the first 100 bases of human chr1
//! hal-column columns alignment.json --genome human --sequence chr1 --length 100
//!
//! # Only report mouse and rat, without diving into gaps
//! hal-column columns alignment.json.gz --genome human --sequence chr1 \
//!     --targets mouse,rat --max-insertion 0
//!
//! # Blocks as TSV
//! hal-column blocks alignment.json --genome mouse --format tsv
//!
//! # Map an interval onto a sibling genome
//! hal-column map alignment.json --genome mouse --start 1200 --length 50 --target rat
//! ```

use clap::{Parser, Subcommand};

use crate::alignment::Alignment;
use crate::core::types::GenomeId;

pub mod blocks;
pub mod columns;
pub mod map;

#[derive(Parser)]
#[command(name = "hal-column")]
#[command(version)]
#[command(about = "Traverse multi-genome alignments column by column")]
#[command(
    long_about = "hal-column reads a genome-tree alignment description (JSON, optionally gzipped) and walks it:\n- alignment columns for every base of a reference range\n- colinear segment blocks of a genome\n- interval mapping between any two genomes of the tree"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the alignment columns of a reference range
    Columns(columns::ColumnsArgs),

    /// Print the colinear blocks of a genome and their parent blocks
    Blocks(blocks::BlocksArgs),

    /// Map an interval of one genome onto another genome
    Map(map::MapArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// `genome.sequence:offset` for a genome coordinate
pub(crate) fn locate(alignment: &Alignment, genome: GenomeId, position: u64) -> String {
    let g = alignment.genome(genome);
    match g.sequence_id_at(position) {
        Some(id) => {
            let seq = alignment.sequence(id);
            format!("{}:{}", alignment.sequence_label(id), position - seq.start())
        }
        None => format!("{}:{position}", g.name),
    }
}
