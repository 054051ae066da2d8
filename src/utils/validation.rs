//! Centralized structural checks for alignments.
//!
//! Layout checks run per genome before any derived index is computed; link
//! checks run once every genome is placed in the tree. Both return a plain
//! message that the caller wraps with the offending genome's name.

use crate::core::genome::{Genome, SegmentedSequence};

/// Upper bound on paralogy ring walks; a ring longer than its genome's
/// segment array cannot close.
#[must_use]
pub fn max_ring_length(genome: &Genome) -> usize {
    genome.num_top_segments()
}

/// Check that sequences, bases and both segment arrays tile the genome.
///
/// # Errors
///
/// Returns a description of the first violation found.
pub fn validate_layout(genome: &Genome) -> Result<(), String> {
    if genome.sequences.is_empty() {
        return Err("genome has no sequences".to_string());
    }
    if let Some(seq) = genome.sequences.iter().find(|seq| seq.length == 0) {
        return Err(format!("sequence '{}' has length 0", seq.name));
    }

    let length = genome.sequence_length();
    if !genome.dna.is_empty() && genome.dna.len() as u64 != length {
        return Err(format!(
            "DNA length {} does not match genome length {length}",
            genome.dna.len()
        ));
    }

    check_tiling(
        "top",
        genome.top_segments.iter().map(|seg| (seg.start, seg.length)),
        genome,
    )?;
    check_tiling(
        "bottom",
        genome
            .bottom_segments
            .iter()
            .map(|seg| (seg.start, seg.length)),
        genome,
    )?;

    let slots = genome.children.len();
    if let Some((idx, seg)) = genome
        .bottom_segments
        .iter()
        .enumerate()
        .find(|(_, seg)| seg.children.len() != slots)
    {
        return Err(format!(
            "bottom segment {idx} has {} child links, expected {slots}",
            seg.children.len()
        ));
    }

    if genome.bottom_segments.iter().any(|seg| seg.next_paralogy_index.is_some()) {
        return Err("paralogy links on bottom segments are not supported".to_string());
    }

    Ok(())
}

/// An empty array is allowed (root has no top segments, leaves no bottom
/// segments); otherwise segments must cover `[0, length)` contiguously and
/// each must stay inside one sequence.
fn check_tiling(
    side: &str,
    segments: impl Iterator<Item = (u64, u64)>,
    genome: &Genome,
) -> Result<(), String> {
    let mut expected = 0u64;
    let mut any = false;
    for (idx, (start, length)) in segments.enumerate() {
        any = true;
        if length == 0 {
            return Err(format!("{side} segment {idx} has length 0"));
        }
        if start != expected {
            return Err(format!(
                "{side} segment {idx} starts at {start}, expected {expected}"
            ));
        }
        let first = genome.sequence_index_at(start);
        let last = genome.sequence_index_at(start + length - 1);
        if first.is_none() || first != last {
            return Err(format!(
                "{side} segment {idx} [{start}, {}) crosses a sequence boundary",
                start + length
            ));
        }
        expected = start + length;
    }
    if any && expected != genome.sequence_length() {
        return Err(format!(
            "{side} segments cover {expected} bases, genome length is {}",
            genome.sequence_length()
        ));
    }
    Ok(())
}

/// Check the parse links of one genome against its own coordinates.
///
/// # Errors
///
/// Returns a description of the first inconsistent parse link.
pub fn validate_parse_links(genome: &Genome) -> Result<(), String> {
    for (idx, top) in genome.top_segments.iter().enumerate() {
        if let Some(b) = top.bottom_parse_index {
            let bottom = genome
                .bottom_segment(b)
                .ok_or_else(|| format!("top segment {idx} parses to missing bottom segment {b}"))?;
            if !bottom.contains(top.start) || top.start - bottom.start != top.bottom_parse_offset {
                return Err(format!(
                    "top segment {idx} parse link to bottom segment {b} does not match coordinates"
                ));
            }
        }
    }
    for (idx, bottom) in genome.bottom_segments.iter().enumerate() {
        if let Some(t) = bottom.top_parse_index {
            let top = genome
                .top_segment(t)
                .ok_or_else(|| format!("bottom segment {idx} parses to missing top segment {t}"))?;
            if !top.contains(bottom.start) || bottom.start - top.start != bottom.top_parse_offset {
                return Err(format!(
                    "bottom segment {idx} parse link to top segment {t} does not match coordinates"
                ));
            }
        }
    }
    Ok(())
}

/// Check a genome's upward links against its parent, and its paralogy rings.
///
/// `slot` is the genome's child slot in `parent`.
///
/// # Errors
///
/// Returns a description of the first inconsistent link.
pub fn validate_parent_links(
    genome: &Genome,
    parent: Option<(&Genome, usize)>,
) -> Result<(), String> {
    let ring_limit = max_ring_length(genome);
    for (idx, top) in genome.top_segments.iter().enumerate() {
        if let Some(p) = top.parent_index {
            let Some((parent, slot)) = parent else {
                return Err(format!("top segment {idx} has a parent link but the genome is the root"));
            };
            let bottom = parent.bottom_segment(p).ok_or_else(|| {
                format!("top segment {idx} links to missing parent bottom segment {p}")
            })?;
            if bottom.length != top.length {
                return Err(format!(
                    "top segment {idx} (length {}) and parent bottom segment {p} (length {}) differ in length",
                    top.length, bottom.length
                ));
            }
            let link = bottom.child(slot).ok_or_else(|| {
                format!("parent bottom segment {p} has no link back to this genome")
            })?;
            let back = link.index.unwrap_or_default();
            let back_seg = genome
                .top_segment(back)
                .ok_or_else(|| format!("parent bottom segment {p} links to missing top segment {back}"))?;
            if back_seg.parent_index != Some(p) || back_seg.parent_reversed != link.reversed {
                return Err(format!(
                    "parent bottom segment {p} child link disagrees with top segment {back}"
                ));
            }
            if back != idx && top.next_paralogy_index.is_none() {
                return Err(format!(
                    "top segment {idx} shares parent {p} with segment {back} outside a paralogy ring"
                ));
            }
        }

        if top.next_paralogy_index.is_some() {
            let mut current = idx;
            let mut steps = 0usize;
            loop {
                let next = genome
                    .top_segment(current)
                    .and_then(|seg| seg.next_paralogy_index)
                    .ok_or_else(|| format!("paralogy ring through top segment {idx} is not closed"))?;
                let next_seg = genome
                    .top_segment(next)
                    .ok_or_else(|| format!("paralogy link to missing top segment {next}"))?;
                if next_seg.parent_index != top.parent_index {
                    return Err(format!(
                        "paralogy ring through top segment {idx} mixes parent segments"
                    ));
                }
                steps += 1;
                if next == idx {
                    break;
                }
                if steps > ring_limit {
                    return Err(format!("paralogy ring through top segment {idx} does not close"));
                }
                current = next;
            }
        }
    }
    Ok(())
}

/// Check a genome's downward links against one child genome.
///
/// # Errors
///
/// Returns a description of the first inconsistent link.
pub fn validate_child_links(genome: &Genome, slot: usize, child: &Genome) -> Result<(), String> {
    for (idx, bottom) in genome.bottom_segments.iter().enumerate() {
        let Some(link) = bottom.child(slot) else {
            continue;
        };
        let t = link.index.unwrap_or_default();
        let top = child.top_segment(t).ok_or_else(|| {
            format!(
                "bottom segment {idx} links to missing top segment {t} of '{}'",
                child.name
            )
        })?;
        if top.parent_index != Some(idx) || top.parent_reversed != link.reversed {
            return Err(format!(
                "bottom segment {idx} child link to '{}' segment {t} is not reciprocated",
                child.name
            ));
        }
        if top.length != bottom.length {
            return Err(format!(
                "bottom segment {idx} and '{}' top segment {t} differ in length",
                child.name
            ));
        }
    }
    Ok(())
}
