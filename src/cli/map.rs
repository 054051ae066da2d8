use std::path::PathBuf;

use clap::Args;

use crate::alignment::Alignment;
use crate::cli::{locate, OutputFormat};
use crate::core::types::strand_char;
use crate::traversal::mapping::{map_span, MapOptions, MappedSegment, Span};

#[derive(Args)]
pub struct MapArgs {
    /// Alignment description (JSON, optionally .gz)
    #[arg(required = true)]
    pub alignment: PathBuf,

    /// Source genome
    #[arg(short, long)]
    pub genome: String,

    /// First base of the interval (0-based genome coordinate)
    #[arg(long)]
    pub start: u64,

    /// Number of bases in the interval
    #[arg(long)]
    pub length: u64,

    /// Genome to map onto
    #[arg(short, long)]
    pub target: String,

    /// Map the reverse strand of the interval
    #[arg(long)]
    pub reverse: bool,

    /// Do not report paralogs of the mapped pieces
    #[arg(long)]
    pub no_dupes: bool,

    /// Ancestor to climb to before descending; paralogs born below it are
    /// reported too
    #[arg(long, value_name = "GENOME")]
    pub coalescence_limit: Option<String>,
}

pub fn run(args: MapArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let alignment = Alignment::load_from_file(&args.alignment)?;
    let source = alignment.genome_by_name(&args.genome)?.id();
    let target = alignment.genome_by_name(&args.target)?.id();
    if args.length == 0 {
        anyhow::bail!("--length must be at least 1");
    }

    let Some(end) = args.start.checked_add(args.length - 1) else {
        anyhow::bail!("--start {} plus --length {} overflows", args.start, args.length);
    };
    let start = if args.reverse { end } else { args.start };
    let limit = args
        .coalescence_limit
        .as_deref()
        .map(|name| alignment.genome_by_name(name).map(|g| g.id()))
        .transpose()?;
    let options = MapOptions::new()
        .with_no_dupes(args.no_dupes)
        .with_coalescence_limit(limit);
    let span = Span::new(source, start, args.length, args.reverse);
    let mapped = map_span(&alignment, span, target, &options)?;

    if verbose {
        let covered: u64 = mapped.iter().map(|m| m.source.length).sum();
        eprintln!(
            "{} of {} bases mapped in {} pieces",
            covered,
            args.length,
            mapped.len()
        );
    }

    match format {
        OutputFormat::Text => print_text(&alignment, &mapped),
        OutputFormat::Json => print_json(&alignment, &mapped)?,
        OutputFormat::Tsv => print_tsv(&alignment, &mapped),
    }
    Ok(())
}

fn describe(alignment: &Alignment, span: &Span) -> (String, String) {
    (
        locate(alignment, span.genome, span.lo()),
        locate(alignment, span.genome, span.hi()),
    )
}

fn print_text(alignment: &Alignment, mapped: &[MappedSegment]) {
    if mapped.is_empty() {
        println!("No aligned bases");
        return;
    }
    for m in mapped {
        let (source_lo, source_hi) = describe(alignment, &m.source);
        let (target_lo, target_hi) = describe(alignment, &m.target);
        println!(
            "{source_lo}-{source_hi} ({})\t-> {target_lo}-{target_hi} ({})",
            strand_char(m.source.reversed),
            strand_char(m.target.reversed)
        );
    }
}

fn print_json(alignment: &Alignment, mapped: &[MappedSegment]) -> anyhow::Result<()> {
    let output: Vec<_> = mapped
        .iter()
        .map(|m| {
            serde_json::json!({
                "source": {
                    "genome": alignment.genome(m.source.genome).name,
                    "start": m.source.lo(),
                    "end": m.source.hi(),
                    "strand": strand_char(m.source.reversed).to_string(),
                },
                "target": {
                    "genome": alignment.genome(m.target.genome).name,
                    "start": m.target.lo(),
                    "end": m.target.hi(),
                    "strand": strand_char(m.target.reversed).to_string(),
                },
            })
        })
        .collect();
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_tsv(alignment: &Alignment, mapped: &[MappedSegment]) {
    println!("source_start\tsource_end\tsource_strand\ttarget_start\ttarget_end\ttarget_strand");
    for m in mapped {
        let (source_lo, source_hi) = describe(alignment, &m.source);
        let (target_lo, target_hi) = describe(alignment, &m.target);
        println!(
            "{source_lo}\t{source_hi}\t{}\t{target_lo}\t{target_hi}\t{}",
            strand_char(m.source.reversed),
            strand_char(m.target.reversed)
        );
    }
}
