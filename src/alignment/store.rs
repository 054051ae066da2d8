use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

use flate2::read::GzDecoder;

use crate::core::genome::{Genome, SequenceRef};
use crate::core::segment::ChildLink;
use crate::core::types::{GenomeId, SequenceId};
use crate::utils::validation;

#[derive(Error, Debug)]
pub enum AlignmentError {
    #[error("Failed to read alignment: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse alignment: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Genome '{0}' not found in alignment")]
    UnknownGenome(String),

    #[error("Sequence '{sequence}' not found in genome '{genome}'")]
    UnknownSequence { genome: String, sequence: String },

    #[error("Duplicate genome name '{0}'")]
    DuplicateGenome(String),

    #[error("Alignment has no root genome")]
    NoRoot,

    #[error("Alignment has more than one root genome: {0}")]
    MultipleRoots(String),

    #[error("Invalid genome '{genome}': {message}")]
    Invalid { genome: String, message: String },
}

impl AlignmentError {
    fn invalid(genome: &Genome, message: impl Into<String>) -> Self {
        Self::Invalid {
            genome: genome.name.clone(),
            message: message.into(),
        }
    }
}

/// Description version for compatibility checking
pub const ALIGNMENT_VERSION: &str = "1.0.0";

/// Serializable alignment description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignmentData {
    pub version: String,
    pub genomes: Vec<Genome>,
}

/// An immutable, validated genome tree with its segment arrays
#[derive(Debug)]
pub struct Alignment {
    genomes: Vec<Genome>,

    /// Index: genome name -> id
    name_to_id: HashMap<String, GenomeId>,

    root: GenomeId,
}

impl Alignment {
    /// Build an alignment from genomes in any order.
    ///
    /// Resolves the tree from each genome's child names, derives sequence
    /// starts, per-segment sequence indices and missing parse links, then
    /// validates every structural invariant.
    ///
    /// # Errors
    ///
    /// Returns an error if names are duplicated or unknown, the tree does not
    /// have exactly one root, or any genome violates a layout or link
    /// invariant.
    pub fn from_genomes(mut genomes: Vec<Genome>) -> Result<Self, AlignmentError> {
        let mut name_to_id = HashMap::new();
        for (idx, genome) in genomes.iter_mut().enumerate() {
            let id = GenomeId(idx);
            genome.id = id;
            genome.parent = None;
            genome.child_ids.clear();
            if name_to_id.insert(genome.name.clone(), id).is_some() {
                return Err(AlignmentError::DuplicateGenome(genome.name.clone()));
            }
        }

        let mut edges = Vec::new();
        for genome in &genomes {
            for child in &genome.children {
                let child_id = *name_to_id
                    .get(child)
                    .ok_or_else(|| AlignmentError::UnknownGenome(child.clone()))?;
                edges.push((genome.id, child_id));
            }
        }
        for (parent, child) in edges {
            if let Some(existing) = genomes[child.0].parent {
                return Err(AlignmentError::invalid(
                    &genomes[child.0],
                    format!(
                        "listed as a child of both '{}' and '{}'",
                        genomes[existing.0].name, genomes[parent.0].name
                    ),
                ));
            }
            genomes[child.0].parent = Some(parent);
            genomes[parent.0].child_ids.push(child);
        }

        let roots: Vec<&Genome> = genomes.iter().filter(|g| g.parent.is_none()).collect();
        let root = match roots.as_slice() {
            [] => return Err(AlignmentError::NoRoot),
            [root] => root.id,
            many => {
                let names: Vec<&str> = many.iter().map(|g| g.name.as_str()).collect();
                return Err(AlignmentError::MultipleRoots(names.join(", ")));
            }
        };

        for genome in &mut genomes {
            let slots = genome.children.len();
            for bottom in &mut genome.bottom_segments {
                if bottom.children.is_empty() && slots > 0 {
                    bottom.children = vec![ChildLink::none(); slots];
                }
            }
            rebuild_indexes(genome)?;
        }

        let alignment = Self {
            genomes,
            name_to_id,
            root,
        };
        if alignment.depth_first_order().len() != alignment.genomes.len() {
            return Err(AlignmentError::invalid(
                alignment.genome(root),
                "genome tree contains a cycle",
            ));
        }
        alignment.validate_links()?;

        debug!(
            genomes = alignment.genomes.len(),
            root = %alignment.genome(root).name,
            "Built alignment"
        );
        Ok(alignment)
    }

    /// Load an alignment description from a JSON file (`.json` or `.json.gz`)
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a valid
    /// description, or describes an invalid alignment.
    #[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
    pub fn load_from_file(path: &Path) -> Result<Self, AlignmentError> {
        let file = std::fs::File::open(path)?;
        let mut content = String::new();
        if path.to_string_lossy().to_lowercase().ends_with(".gz") {
            GzDecoder::new(file).read_to_string(&mut content)?;
        } else {
            std::io::BufReader::new(file).read_to_string(&mut content)?;
        }
        Self::from_json(&content)
    }

    /// Parse an alignment description from a JSON string
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or describes an invalid
    /// alignment.
    pub fn from_json(json: &str) -> Result<Self, AlignmentError> {
        let data: AlignmentData = serde_json::from_str(json)?;

        // Version check (warn but don't fail)
        if data.version != ALIGNMENT_VERSION {
            warn!(
                expected = ALIGNMENT_VERSION,
                found = %data.version,
                "Alignment description version mismatch"
            );
        }

        Self::from_genomes(data.genomes)
    }

    /// Serialize to a JSON description
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, AlignmentError> {
        let data = AlignmentData {
            version: ALIGNMENT_VERSION.to_string(),
            genomes: self.genomes.clone(),
        };
        Ok(serde_json::to_string_pretty(&data)?)
    }

    #[must_use]
    pub fn root(&self) -> GenomeId {
        self.root
    }

    #[must_use]
    pub fn num_genomes(&self) -> usize {
        self.genomes.len()
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this alignment.
    #[must_use]
    pub fn genome(&self, id: GenomeId) -> &Genome {
        &self.genomes[id.0]
    }

    pub fn genomes(&self) -> impl Iterator<Item = &Genome> {
        self.genomes.iter()
    }

    #[must_use]
    pub fn genome_id(&self, name: &str) -> Option<GenomeId> {
        self.name_to_id.get(name).copied()
    }

    /// Look up a genome by name
    ///
    /// # Errors
    ///
    /// Returns `UnknownGenome` if no genome has this name.
    pub fn genome_by_name(&self, name: &str) -> Result<&Genome, AlignmentError> {
        self.genome_id(name)
            .map(|id| self.genome(id))
            .ok_or_else(|| AlignmentError::UnknownGenome(name.to_string()))
    }

    /// Look up a sequence by genome and sequence name
    ///
    /// # Errors
    ///
    /// Returns an error if either name is unknown.
    pub fn sequence_by_name(
        &self,
        genome: &str,
        sequence: &str,
    ) -> Result<SequenceRef<'_>, AlignmentError> {
        let g = self.genome_by_name(genome)?;
        g.sequence_by_name(sequence)
            .ok_or_else(|| AlignmentError::UnknownSequence {
                genome: genome.to_string(),
                sequence: sequence.to_string(),
            })
    }

    /// # Panics
    ///
    /// Panics if `id` was not issued by this alignment.
    #[must_use]
    pub fn sequence(&self, id: SequenceId) -> SequenceRef<'_> {
        SequenceRef::new(self.genome(id.genome), id.index)
    }

    /// Human-readable `genome.sequence` label
    #[must_use]
    pub fn sequence_label(&self, id: SequenceId) -> String {
        let seq = self.sequence(id);
        format!("{}.{}", seq.genome().name, seq.name())
    }

    /// Genomes from the root downward, parents before children
    #[must_use]
    pub fn depth_first_order(&self) -> Vec<GenomeId> {
        let mut order = Vec::with_capacity(self.genomes.len());
        let mut stack = vec![self.root];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            stack.extend(self.genome(id).child_ids.iter().rev());
        }
        order
    }

    /// Path of genomes from `genome` up to the root, inclusive
    #[must_use]
    pub fn ancestors(&self, genome: GenomeId) -> Vec<GenomeId> {
        let mut path = vec![genome];
        let mut current = genome;
        while let Some(parent) = self.genome(current).parent {
            path.push(parent);
            current = parent;
        }
        path
    }

    /// Most recent common ancestor of two genomes
    #[must_use]
    pub fn common_ancestor(&self, a: GenomeId, b: GenomeId) -> GenomeId {
        let up: HashSet<GenomeId> = self.ancestors(a).into_iter().collect();
        self.ancestors(b)
            .into_iter()
            .find(|g| up.contains(g))
            .unwrap_or(self.root)
    }

    /// Union of the tree paths between every pair of `genomes`: the smallest
    /// connected set of genomes containing them all.
    #[must_use]
    pub fn spanning_tree(&self, genomes: &[GenomeId]) -> HashSet<GenomeId> {
        let mut tree = HashSet::new();
        let Some((&first, rest)) = genomes.split_first() else {
            return tree;
        };
        tree.insert(first);
        let mut mrca = first;
        for &g in rest {
            mrca = self.common_ancestor(mrca, g);
        }
        for &g in genomes {
            for a in self.ancestors(g) {
                tree.insert(a);
                if a == mrca {
                    break;
                }
            }
        }
        tree
    }

    fn validate_links(&self) -> Result<(), AlignmentError> {
        for genome in &self.genomes {
            let parent = genome.parent.map(|p| {
                let parent = self.genome(p);
                let slot = parent.child_index(genome.id).unwrap_or_default();
                (parent, slot)
            });
            validation::validate_parent_links(genome, parent)
                .map_err(|msg| AlignmentError::invalid(genome, msg))?;
            for (slot, &child) in genome.child_ids.iter().enumerate() {
                validation::validate_child_links(genome, slot, self.genome(child))
                    .map_err(|msg| AlignmentError::invalid(genome, msg))?;
            }
        }
        Ok(())
    }
}

/// Derive sequence starts, per-segment sequence indices, per-sequence segment
/// ranges and missing parse links. Must run after deserialization.
fn rebuild_indexes(genome: &mut Genome) -> Result<(), AlignmentError> {
    let mut start = 0;
    for seq in &mut genome.sequences {
        seq.start = start;
        seq.genome = genome.id;
        start += seq.length;
    }

    validation::validate_layout(genome).map_err(|msg| AlignmentError::invalid(genome, msg))?;

    let top_seqs: Vec<usize> = genome
        .top_segments
        .iter()
        .map(|seg| genome.sequence_index_at(seg.start).unwrap_or_default())
        .collect();
    let bottom_seqs: Vec<usize> = genome
        .bottom_segments
        .iter()
        .map(|seg| genome.sequence_index_at(seg.start).unwrap_or_default())
        .collect();

    let top_parse: Vec<Option<(usize, u64)>> = genome
        .top_segments
        .iter()
        .map(|seg| {
            genome
                .bottom_segment_index_at(seg.start)
                .map(|b| (b, seg.start - genome.bottom_segments[b].start))
        })
        .collect();
    let bottom_parse: Vec<Option<(usize, u64)>> = genome
        .bottom_segments
        .iter()
        .map(|seg| {
            genome
                .top_segment_index_at(seg.start)
                .map(|t| (t, seg.start - genome.top_segments[t].start))
        })
        .collect();

    for ((seg, seq), parse) in genome
        .top_segments
        .iter_mut()
        .zip(top_seqs)
        .zip(top_parse)
    {
        seg.sequence = seq;
        if seg.bottom_parse_index.is_none() {
            if let Some((b, offset)) = parse {
                seg.bottom_parse_index = Some(b);
                seg.bottom_parse_offset = offset;
            }
        }
    }
    for ((seg, seq), parse) in genome
        .bottom_segments
        .iter_mut()
        .zip(bottom_seqs)
        .zip(bottom_parse)
    {
        seg.sequence = seq;
        if seg.top_parse_index.is_none() {
            if let Some((t, offset)) = parse {
                seg.top_parse_index = Some(t);
                seg.top_parse_offset = offset;
            }
        }
    }

    for idx in 0..genome.sequences.len() {
        let top_first = genome.top_segments.partition_point(|seg| seg.sequence < idx);
        let top_last = genome.top_segments.partition_point(|seg| seg.sequence <= idx);
        let bottom_first = genome.bottom_segments.partition_point(|seg| seg.sequence < idx);
        let bottom_last = genome.bottom_segments.partition_point(|seg| seg.sequence <= idx);
        let seq = &mut genome.sequences[idx];
        seq.top_range = (top_first, top_last);
        seq.bottom_range = (bottom_first, bottom_last);
    }

    validation::validate_parse_links(genome).map_err(|msg| AlignmentError::invalid(genome, msg))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::genome::SegmentedSequence;
    use crate::core::segment::{BottomSegment, TopSegment};

    fn two_level() -> Vec<Genome> {
        vec![
            Genome::new("root")
                .with_children(["leaf"])
                .with_sequence("r", 10)
                .with_bottom_segments(vec![
                    BottomSegment::new(0, 4, 1).with_child(0, 0, false),
                    BottomSegment::new(4, 6, 1).with_child(0, 1, true),
                ]),
            Genome::new("leaf").with_sequence("l", 10).with_top_segments(vec![
                TopSegment::new(0, 4).with_parent(0, false),
                TopSegment::new(4, 6).with_parent(1, true),
            ]),
        ]
    }

    #[test]
    fn test_from_genomes_resolves_tree() {
        let alignment = Alignment::from_genomes(two_level()).unwrap();
        let root = alignment.root();
        assert_eq!(alignment.genome(root).name, "root");
        let leaf = alignment.genome_id("leaf").unwrap();
        assert_eq!(alignment.genome(leaf).parent(), Some(root));
        assert_eq!(alignment.genome(root).child_index(leaf), Some(0));
        assert_eq!(alignment.depth_first_order(), vec![root, leaf]);
        assert_eq!(alignment.common_ancestor(leaf, root), root);
    }

    #[test]
    fn test_rejects_unreciprocated_link() {
        let mut genomes = two_level();
        genomes[1].top_segments[1].parent_reversed = false;
        let err = Alignment::from_genomes(genomes).unwrap_err();
        assert!(matches!(err, AlignmentError::Invalid { .. }), "{err}");
    }

    #[test]
    fn test_rejects_multiple_roots_and_unknown_child() {
        let genomes = vec![
            Genome::new("a").with_sequence("s", 1),
            Genome::new("b").with_sequence("s", 1),
        ];
        assert!(matches!(
            Alignment::from_genomes(genomes),
            Err(AlignmentError::MultipleRoots(_))
        ));

        let genomes = vec![Genome::new("a").with_children(["ghost"]).with_sequence("s", 1)];
        assert!(matches!(
            Alignment::from_genomes(genomes),
            Err(AlignmentError::UnknownGenome(name)) if name == "ghost"
        ));
    }

    #[test]
    fn test_parse_links_are_derived() {
        let genomes = vec![
            Genome::new("root")
                .with_children(["mid"])
                .with_sequence("r", 6)
                .with_bottom_segments(vec![
                    BottomSegment::new(0, 2, 1).with_child(0, 0, false),
                    BottomSegment::new(2, 4, 1).with_child(0, 1, false),
                ]),
            Genome::new("mid")
                .with_sequence("m", 6)
                .with_top_segments(vec![
                    TopSegment::new(0, 2).with_parent(0, false),
                    TopSegment::new(2, 4).with_parent(1, false),
                ])
                .with_bottom_segments(vec![BottomSegment::new(0, 3, 0), BottomSegment::new(3, 3, 0)]),
        ];
        let alignment = Alignment::from_genomes(genomes).unwrap();
        let mid = alignment.genome_by_name("mid").unwrap();
        assert_eq!(mid.top_segments[1].bottom_parse_index, Some(0));
        assert_eq!(mid.top_segments[1].bottom_parse_offset, 2);
        assert_eq!(mid.bottom_segments[1].top_parse_index, Some(1));
        assert_eq!(mid.bottom_segments[1].top_parse_offset, 1);
        assert_eq!(mid.num_top_segments(), 2);
    }

    #[test]
    fn test_json_round_trip_and_sequence_lookup() {
        let alignment = Alignment::from_genomes(two_level()).unwrap();
        let json = alignment.to_json().unwrap();
        let reloaded = Alignment::from_json(&json).unwrap();
        let seq = reloaded.sequence_by_name("leaf", "l").unwrap();
        assert_eq!(seq.sequence_length(), 10);
        assert_eq!(seq.top_segment_range(), 0..2);
        assert!(matches!(
            reloaded.sequence_by_name("leaf", "nope"),
            Err(AlignmentError::UnknownSequence { .. })
        ));
    }

    #[test]
    fn test_spanning_tree() {
        let genomes = vec![
            Genome::new("root").with_children(["a", "b"]).with_sequence("s", 1),
            Genome::new("a").with_children(["a1"]).with_sequence("s", 1),
            Genome::new("a1").with_sequence("s", 1),
            Genome::new("b").with_sequence("s", 1),
        ];
        let alignment = Alignment::from_genomes(genomes).unwrap();
        let id = |name| alignment.genome_id(name).unwrap();

        let tree = alignment.spanning_tree(&[id("a1"), id("a")]);
        assert_eq!(tree, [id("a1"), id("a")].into_iter().collect());

        let tree = alignment.spanning_tree(&[id("a1"), id("b")]);
        assert_eq!(tree.len(), 4);
    }
}
