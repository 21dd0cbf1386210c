//! Motif positions over a FASTA reference, per contig and strand.

use needletail::sequence::complement;
use regex::bytes::RegexBuilder;
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

use crate::error::Result;
use crate::io::fasta;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MotifPositions {
    pub forward: BTreeSet<u64>,
    pub reverse: BTreeSet<u64>,
}

/// Contig → positions, in FASTA order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MotifIndex {
    entries: Vec<(String, MotifPositions)>,
}

impl MotifIndex {
    pub fn get(&self, contig: &str) -> Option<&MotifPositions> {
        self.entries
            .iter()
            .find(|(c, _)| c == contig)
            .map(|(_, p)| p)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MotifPositions)> {
        self.entries.iter().map(|(c, p)| (c.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Positions of `motif` (a case-insensitive regex) shifted by `rel_idx`.
///
/// Forward positions are `start + rel_idx`. Reverse-strand hits are found on
/// the reverse complement and reported in forward coordinates as
/// `len - (start + rel_idx) - 1`. Matches do not overlap, as with any regex
/// scan.
pub fn build_reference_idx(path: &Path, motif: &str, rel_idx: u64) -> Result<MotifIndex> {
    let re = RegexBuilder::new(motif).case_insensitive(true).build()?;
    let mut index = MotifIndex::default();
    let Some(mut rdr) = fasta::open_fastx(path)? else {
        return Ok(index);
    };

    while let Some(rec) = rdr.next().transpose()? {
        let contig = fasta::short_name(&String::from_utf8_lossy(rec.id())).to_string();
        let seq = rec.seq();
        let len = seq.len() as u64;

        let forward = re
            .find_iter(&seq)
            .map(|m| m.start() as u64 + rel_idx)
            .collect();

        let rc: Vec<u8> = seq.iter().rev().map(|&b| complement(b)).collect();
        let reverse = re
            .find_iter(&rc)
            .filter_map(|m| len.checked_sub(m.start() as u64 + rel_idx + 1))
            .collect();

        index.entries.push((contig, MotifPositions { forward, reverse }));
    }
    log::debug!("motif {motif:?}: indexed {} contigs", index.len());
    Ok(index)
}
