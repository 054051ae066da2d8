use serde::{Deserialize, Serialize};

/// Handle to a genome inside an [`Alignment`](crate::alignment::Alignment).
///
/// Ids are dense indices assigned in the order genomes were added, so they are
/// only meaningful for the alignment that issued them.
///
/// The default id is a placeholder for records deserialized before the
/// alignment assigns real ids.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct GenomeId(pub usize);

impl GenomeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for GenomeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "g{}", self.0)
    }
}

/// Handle to a named sequence: the owning genome plus the sequence's position
/// in that genome's sequence list.
///
/// Ordering is by genome first, then by sequence order, which keeps column
/// maps grouped by genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SequenceId {
    pub genome: GenomeId,
    pub index: usize,
}

impl SequenceId {
    #[must_use]
    pub fn new(genome: GenomeId, index: usize) -> Self {
        Self { genome, index }
    }
}

/// Which side of a genome a segment array aligns to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentSide {
    /// Top segments, aligned to the parent genome
    Top,
    /// Bottom segments, aligned to the child genomes
    Bottom,
}

impl std::fmt::Display for SegmentSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

/// One homologous base in an alignment column.
///
/// `position` is a genome coordinate (not sequence-relative). `reversed` is
/// true when the base aligns to the reverse complement of the column's
/// reference base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnPosition {
    pub genome: GenomeId,
    pub position: u64,
    pub reversed: bool,
}

/// Strand character used in text and TSV output
#[must_use]
pub fn strand_char(reversed: bool) -> char {
    if reversed {
        '-'
    } else {
        '+'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_id_ordering_groups_by_genome() {
        let mut ids = vec![
            SequenceId::new(GenomeId(1), 0),
            SequenceId::new(GenomeId(0), 2),
            SequenceId::new(GenomeId(0), 1),
        ];
        ids.sort();
        assert_eq!(
            ids,
            vec![
                SequenceId::new(GenomeId(0), 1),
                SequenceId::new(GenomeId(0), 2),
                SequenceId::new(GenomeId(1), 0),
            ]
        );
    }

    #[test]
    fn test_strand_char() {
        assert_eq!(strand_char(false), '+');
        assert_eq!(strand_char(true), '-');
    }
}
