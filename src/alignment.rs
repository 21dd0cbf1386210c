//! Read-to-reference alignment through minimap2.

use ahash::AHashMap;
use serde::Serialize;
use std::fmt;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::io::{fasta, sam};
use crate::model::Strand;
use crate::util::mapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CigarOp {
    Match,
    Ins,
    Del,
    RefSkip,
    SoftClip,
    HardClip,
    Pad,
    Equal,
    Diff,
}

impl CigarOp {
    pub fn from_char(c: char) -> Option<Self> {
        Some(match c {
            'M' => CigarOp::Match,
            'I' => CigarOp::Ins,
            'D' => CigarOp::Del,
            'N' => CigarOp::RefSkip,
            'S' => CigarOp::SoftClip,
            'H' => CigarOp::HardClip,
            'P' => CigarOp::Pad,
            '=' => CigarOp::Equal,
            'X' => CigarOp::Diff,
            _ => return None,
        })
    }

    pub fn as_char(self) -> char {
        match self {
            CigarOp::Match => 'M',
            CigarOp::Ins => 'I',
            CigarOp::Del => 'D',
            CigarOp::RefSkip => 'N',
            CigarOp::SoftClip => 'S',
            CigarOp::HardClip => 'H',
            CigarOp::Pad => 'P',
            CigarOp::Equal => '=',
            CigarOp::Diff => 'X',
        }
    }

    pub fn is_clip(self) -> bool {
        matches!(self, CigarOp::SoftClip | CigarOp::HardClip)
    }

    pub fn consumes_ref(self) -> bool {
        matches!(
            self,
            CigarOp::Match | CigarOp::Del | CigarOp::RefSkip | CigarOp::Equal | CigarOp::Diff
        )
    }

    pub fn consumes_query(self) -> bool {
        matches!(
            self,
            CigarOp::Match | CigarOp::Ins | CigarOp::SoftClip | CigarOp::Equal | CigarOp::Diff
        )
    }
}

/// One hit, in minimap2/mappy conventions: 0-based half-open coordinates,
/// `q_st`/`q_en` on the query as given, `cigar` in reference order without
/// clipping.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alignment {
    pub ctg: String,
    pub ctg_len: u64,
    pub r_st: u64,
    pub r_en: u64,
    pub q_st: u32,
    pub q_en: u32,
    pub strand: Strand,
    pub mapq: u8,
    pub cigar: Vec<(u32, CigarOp)>,
    pub is_primary: bool,
    pub nm: u32,
    pub mlen: u32,
    pub blen: u32,
}

impl Alignment {
    pub fn cigar_str(&self) -> String {
        self.cigar
            .iter()
            .map(|(l, op)| format!("{l}{}", op.as_char()))
            .collect()
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}-{}({}) q={}-{} mapq={} {}",
            self.ctg,
            self.r_st,
            self.r_en,
            self.strand,
            self.q_st,
            self.q_en,
            self.mapq,
            self.cigar_str()
        )
    }
}

/// Maps every reference base of `aln` to its first query base.
///
/// `out[i + 1] - out[i]` is 1 for a match/mismatch, 0 for a deleted base and
/// larger than 1 when an insertion follows. The last element is the exclusive
/// query end. Reverse-strand hits are walked from `r_en` backwards so query
/// positions stay increasing; index `i` is then reference base `r_en - 1 - i`.
pub fn reference_to_query(aln: &Alignment) -> Result<Vec<u32>> {
    let ref_len = (aln.r_en - aln.r_st) as usize;
    let mut out = vec![0u32; ref_len + 1];
    let ops: Vec<&(u32, CigarOp)> = match aln.strand {
        Strand::Forward => aln.cigar.iter().collect(),
        Strand::Reverse => aln.cigar.iter().rev().collect(),
    };

    let (mut rpos, mut qpos) = (0usize, aln.q_st);
    for &(len, op) in ops {
        let l = len as usize;
        match op {
            CigarOp::Match | CigarOp::Equal | CigarOp::Diff => {
                let slot = out
                    .get_mut(rpos..rpos + l)
                    .ok_or_else(|| Error::MalformedCigar(aln.cigar_str()))?;
                for (i, s) in slot.iter_mut().enumerate() {
                    *s = qpos + i as u32;
                }
                rpos += l;
                qpos += len;
            }
            CigarOp::Ins => qpos += len,
            CigarOp::Del => {
                let slot = out
                    .get_mut(rpos..rpos + l)
                    .ok_or_else(|| Error::MalformedCigar(aln.cigar_str()))?;
                slot.fill(qpos);
                rpos += l;
            }
            other => return Err(Error::InvalidCigarOp(other.as_char())),
        }
    }
    if rpos != ref_len {
        return Err(Error::MalformedCigar(aln.cigar_str()));
    }
    out[rpos] = qpos;
    Ok(out)
}

/// mappy keyword arguments expressed as minimap2 flags.
#[derive(Debug, Clone)]
pub struct AlignerOptions {
    pub threads: usize,
    /// `-N`: number of secondary alignments to keep.
    pub best_n: Option<usize>,
    pub extra_args: Vec<String>,
}

impl Default for AlignerOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            best_n: None,
            extra_args: Vec::new(),
        }
    }
}

impl AlignerOptions {
    fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if let Some(n) = self.best_n {
            args.push("-N".to_string());
            args.push(n.to_string());
        }
        args.extend(self.extra_args.iter().cloned());
        args
    }
}

/// A reference ready for mapping.
#[derive(Debug, Clone)]
pub struct Aligner {
    minimap2: PathBuf,
    reference: PathBuf,
    preset: String,
    opts: AlignerOptions,
    seq_names: Vec<String>,
}

impl Aligner {
    pub fn new(reference: &Path, preset: &str, opts: AlignerOptions) -> Result<Self> {
        Self::with_minimap2(None, reference, preset, opts)
    }

    /// minimap2 happily maps against a reference without sequences, so a
    /// FASTA reference is checked up front. `.mmi` indexes are taken as is.
    pub fn with_minimap2(
        minimap2: Option<&Path>,
        reference: &Path,
        preset: &str,
        opts: AlignerOptions,
    ) -> Result<Self> {
        if !reference.exists() {
            return Err(Error::NotFound(reference.to_path_buf()));
        }
        let is_index = reference.extension().is_some_and(|e| e == "mmi");
        let seq_names = if is_index {
            Vec::new()
        } else {
            let names = fasta::contig_names(reference)?;
            if names.is_empty() {
                return Err(Error::EmptyReference(reference.to_path_buf()));
            }
            names
        };
        let minimap2 = mapping::resolve_minimap2(minimap2)?;
        log::debug!(
            "aligner: {} ({} sequences, preset {preset})",
            reference.display(),
            seq_names.len()
        );
        Ok(Self {
            minimap2,
            reference: reference.to_path_buf(),
            preset: preset.to_string(),
            opts,
            seq_names,
        })
    }

    /// Reference sequence names; empty for prebuilt indexes.
    pub fn seq_names(&self) -> &[String] {
        &self.seq_names
    }

    pub fn reference(&self) -> &Path {
        &self.reference
    }

    pub fn preset(&self) -> &str {
        &self.preset
    }

    /// All hits of one query, best first.
    pub fn map(&self, name: &str, seq: &[u8]) -> Result<Vec<Alignment>> {
        let mut hits = self.map_batch(&[(name.to_string(), seq.to_vec())])?;
        Ok(hits.remove(name).unwrap_or_default())
    }

    /// Maps many queries with one minimap2 run. Queries without hits are absent.
    pub fn map_batch(&self, queries: &[(String, Vec<u8>)]) -> Result<AHashMap<String, Vec<Alignment>>> {
        let mut tmp = tempfile::Builder::new()
            .prefix("ontkit-queries")
            .suffix(".fa")
            .tempfile()?;
        let n = mapping::write_fasta(BufWriter::new(tmp.as_file_mut()), queries)?;
        if n == 0 {
            return Ok(AHashMap::new());
        }
        let sam_text = mapping::map_to_sam(
            &self.minimap2,
            &self.preset,
            &self.reference,
            tmp.path(),
            self.opts.threads,
            &self.opts.to_args(),
        )?;

        let mut out: AHashMap<String, Vec<Alignment>> = AHashMap::new();
        for hit in sam::parse_sam(&sam_text)? {
            out.entry(hit.qname).or_default().push(hit.alignment);
        }
        log::debug!("mapped {}/{} queries", out.len(), n);
        Ok(out)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Aligned {
    Best(Alignment),
    All(Vec<Alignment>),
}

/// Aligns `query`; with `best` only the first primary hit is returned.
///
/// minimap2 may report several primary hits (e.g. supplementary pieces) even
/// when asked for one, hence the explicit flag.
pub fn align(query: &[u8], aligner: &Aligner, best: bool) -> Result<Option<Aligned>> {
    let hits = aligner.map("query", query)?;
    if hits.is_empty() {
        return Ok(None);
    }
    if best {
        let first = hits
            .iter()
            .find(|a| a.is_primary)
            .cloned()
            .unwrap_or_else(|| hits[0].clone());
        return Ok(Some(Aligned::Best(first)));
    }
    Ok(Some(Aligned::All(hits)))
}
