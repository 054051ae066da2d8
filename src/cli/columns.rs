use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use crate::alignment::Alignment;
use crate::cli::OutputFormat;
use crate::core::types::strand_char;
use crate::traversal::column::{
    ColumnIterator, ColumnOptions, DEFAULT_DEFRAGMENT_INTERVAL, DEFAULT_MAX_INSERTION_LENGTH,
};

#[derive(Args)]
pub struct ColumnsArgs {
    /// Alignment description (JSON, optionally .gz)
    #[arg(required = true)]
    pub alignment: PathBuf,

    /// Reference genome
    #[arg(short, long)]
    pub genome: String,

    /// Reference sequence within the genome
    #[arg(short, long)]
    pub sequence: String,

    /// First reference base (0-based, sequence-relative)
    #[arg(long, default_value = "0")]
    pub start: u64,

    /// Number of reference bases (default: to the end of the sequence)
    #[arg(long)]
    pub length: Option<u64>,

    /// Largest total gap length to walk inside a column range (0 disables)
    #[arg(long, default_value_t = DEFAULT_MAX_INSERTION_LENGTH)]
    pub max_insertion: u64,

    /// Only report these genomes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    pub targets: Vec<String>,

    /// Do not follow paralogy
    #[arg(long)]
    pub no_dupes: bool,

    /// Do not report ancestral genomes
    #[arg(long)]
    pub no_ancestors: bool,

    /// Walk the range on the reverse strand
    #[arg(long)]
    pub reverse_strand: bool,

    /// Report at most one base per genome in each column
    #[arg(long)]
    pub unique: bool,

    /// Follow paralogy in the reference genome only
    #[arg(long)]
    pub only_orthologs: bool,

    /// Compact traversal state every N columns (0 never)
    #[arg(long, default_value_t = DEFAULT_DEFRAGMENT_INTERVAL)]
    pub defragment_interval: usize,
}

impl ColumnsArgs {
    fn options(&self) -> ColumnOptions {
        ColumnOptions::new()
            .with_targets(self.targets.iter().cloned())
            .with_max_insertion_length(self.max_insertion)
            .with_no_dupes(self.no_dupes)
            .with_no_ancestors(self.no_ancestors)
            .with_reverse_strand(self.reverse_strand)
            .with_unique(self.unique)
            .with_only_orthologs(self.only_orthologs)
            .with_defragment_interval(self.defragment_interval)
    }
}

#[derive(Serialize)]
struct Base {
    sequence: String,
    position: u64,
    strand: char,
}

#[derive(Serialize)]
struct Column {
    reference: String,
    position: u64,
    depth: usize,
    bases: Vec<Base>,
}

pub fn run(args: ColumnsArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let alignment = Alignment::load_from_file(&args.alignment)?;
    let sequence = alignment.sequence_by_name(&args.genome, &args.sequence)?.id();
    let last = match args.length {
        Some(0) => anyhow::bail!("--length must be at least 1"),
        Some(length) => match args.start.checked_add(length - 1) {
            Some(last) => Some(last),
            None => anyhow::bail!("--start {} plus --length {length} overflows", args.start),
        },
        None => None,
    };

    let mut iter = ColumnIterator::new(&alignment, sequence, args.start, last, args.options())?;
    let mut columns = Vec::new();
    while !iter.last_column() {
        columns.push(collect_column(&alignment, &iter));
        iter.advance()?;
    }

    if verbose {
        eprintln!(
            "{}: {} columns",
            alignment.sequence_label(sequence),
            columns.len()
        );
    }

    match format {
        OutputFormat::Text => print_text(&columns),
        OutputFormat::Json => print_json(&columns)?,
        OutputFormat::Tsv => print_tsv(&columns),
    }
    Ok(())
}

fn collect_column(alignment: &Alignment, iter: &ColumnIterator<'_>) -> Column {
    let reference = iter.reference_sequence();
    let position = u64::try_from(iter.array_index())
        .unwrap_or_default()
        .saturating_sub(reference.start());
    let mut bases = Vec::new();
    for (id, positions) in iter.column_map() {
        let seq = alignment.sequence(*id);
        let label = alignment.sequence_label(*id);
        for p in positions {
            bases.push(Base {
                sequence: label.clone(),
                position: p.position - seq.start(),
                strand: strand_char(p.reversed),
            });
        }
    }
    Column {
        reference: alignment.sequence_label(reference.id()),
        position,
        depth: iter.depth(),
        bases,
    }
}

fn print_text(columns: &[Column]) {
    for column in columns {
        let bases: Vec<String> = column
            .bases
            .iter()
            .map(|b| format!("{}:{}{}", b.sequence, b.position, b.strand))
            .collect();
        let marker = if column.depth > 1 { " *" } else { "" };
        println!(
            "{}:{}{marker}\t{}",
            column.reference,
            column.position,
            bases.join(" ")
        );
    }
}

fn print_json(columns: &[Column]) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(columns)?);
    Ok(())
}

fn print_tsv(columns: &[Column]) {
    println!("reference\treference_position\tdepth\tsequence\tposition\tstrand");
    for column in columns {
        for base in &column.bases {
            println!(
                "{}\t{}\t{}\t{}\t{}\t{}",
                column.reference,
                column.position,
                column.depth,
                base.sequence,
                base.position,
                base.strand
            );
        }
    }
}
