use std::path::PathBuf;

use clap::Args;

use crate::alignment::Alignment;
use crate::cli::{locate, OutputFormat};
use crate::core::types::{strand_char, GenomeId};
use crate::traversal::gapped::{GappedBottomIterator, GappedTopIterator};
use crate::traversal::rearrangement::{Rearrangement, DEFAULT_GAP_THRESHOLD};

#[derive(Args)]
pub struct BlocksArgs {
    /// Alignment description (JSON, optionally .gz)
    #[arg(required = true)]
    pub alignment: PathBuf,

    /// Genome whose top segments are grouped
    #[arg(short, long)]
    pub genome: String,

    /// Largest indel absorbed inside a block
    #[arg(long, default_value_t = DEFAULT_GAP_THRESHOLD)]
    pub gap_threshold: u64,

    /// Break blocks at every indel
    #[arg(long)]
    pub atomic: bool,
}

struct Block {
    first_segment: usize,
    last_segment: usize,
    start: String,
    length: u64,
    parent: Option<ParentBlock>,
}

struct ParentBlock {
    start: String,
    length: u64,
    reversed: bool,
}

pub fn run(args: BlocksArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let alignment = Alignment::load_from_file(&args.alignment)?;
    let genome = alignment.genome_by_name(&args.genome)?;
    if genome.top_segments.is_empty() {
        anyhow::bail!("Genome '{}' has no top segments", genome.name);
    }

    let classifier = Rearrangement::new(args.gap_threshold, args.atomic);
    let parent_slot = genome.parent().and_then(|p| {
        alignment
            .genome(p)
            .child_index(genome.id())
            .map(|slot| (p, slot))
    });

    let mut blocks = Vec::new();
    let mut block = GappedTopIterator::new(&alignment, genome.id(), 0, classifier)?;
    loop {
        blocks.push(describe(&alignment, &block, parent_slot, classifier));
        if block.to_right().is_err() {
            break;
        }
    }

    if verbose {
        eprintln!(
            "{}: {} top segments in {} blocks",
            genome.name,
            genome.top_segments.len(),
            blocks.len()
        );
    }

    match format {
        OutputFormat::Text => print_text(&blocks),
        OutputFormat::Json => print_json(&blocks)?,
        OutputFormat::Tsv => print_tsv(&blocks),
    }
    Ok(())
}

fn describe(
    alignment: &Alignment,
    block: &GappedTopIterator<'_>,
    parent_slot: Option<(GenomeId, usize)>,
    classifier: Rearrangement,
) -> Block {
    let range = block.array_range();
    let parent = parent_slot.and_then(|(parent, slot)| {
        let mut bottom = GappedBottomIterator::new(alignment, parent, slot, 0, classifier).ok()?;
        bottom.to_parent(block).ok()?;
        Some(ParentBlock {
            start: locate(alignment, parent, bottom.start_position()),
            length: bottom.length(),
            reversed: bottom.reversed(),
        })
    });
    Block {
        first_segment: *range.start(),
        last_segment: *range.end(),
        start: locate(alignment, block.genome_id(), block.start_position()),
        length: block.length(),
        parent,
    }
}

fn print_text(blocks: &[Block]) {
    for block in blocks {
        let parent = block.parent.as_ref().map_or_else(
            || "unaligned".to_string(),
            |p| format!("{} len={} {}", p.start, p.length, strand_char(p.reversed)),
        );
        println!(
            "segments {}-{}\t{} len={}\t-> {}",
            block.first_segment, block.last_segment, block.start, block.length, parent
        );
    }
}

fn print_json(blocks: &[Block]) -> anyhow::Result<()> {
    let output: Vec<_> = blocks
        .iter()
        .map(|b| {
            serde_json::json!({
                "first_segment": b.first_segment,
                "last_segment": b.last_segment,
                "start": b.start,
                "length": b.length,
                "parent": b.parent.as_ref().map(|p| serde_json::json!({
                    "start": p.start,
                    "length": p.length,
                    "strand": strand_char(p.reversed).to_string(),
                })),
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(blocks: &[Block]) {
    println!("first_segment\tlast_segment\tstart\tlength\tparent_start\tparent_length\tparent_strand");
    for b in blocks {
        let (start, length, strand) = match &b.parent {
            Some(p) => (p.start.clone(), p.length.to_string(), strand_char(p.reversed).to_string()),
            None => ("-".to_string(), "-".to_string(), "-".to_string()),
        };
        println!(
            "{}\t{}\t{}\t{}\t{start}\t{length}\t{strand}",
            b.first_segment, b.last_segment, b.start, b.length
        );
    }
}
