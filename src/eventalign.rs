//! Signal intervals per aligned reference base.
//!
//! Chain: reference base → query base(s) (CIGAR) → raw samples (move table).

use serde::Serialize;
use std::io::Write;

use crate::alignment::{reference_to_query, Alignment};
use crate::error::{Error, Result};
use crate::io::fast5::Fast5Read;
use crate::model::Strand;
use crate::signal::{self, sequence_to_signal};

/// Everything the basecaller left behind for one read.
#[derive(Debug, Clone)]
pub struct Basecall {
    pub read_id: String,
    pub seq: Vec<u8>,
    /// First raw sample per base plus the exclusive end, see [`sequence_to_signal`].
    pub seq_to_sig: Vec<u64>,
}

impl Basecall {
    /// `None` when the read lacks a basecall, move table or segmentation.
    pub fn from_read(read: &Fast5Read) -> Result<Option<Self>> {
        let Some(fq) = read.fastq()? else {
            return Ok(None);
        };
        let Some(moves) = read.move_table()? else {
            return Ok(None);
        };
        let (Some(stride), Some(start)) = (read.block_stride()?, read.raw_start_index()?) else {
            return Ok(None);
        };
        let (seq, _) = signal::parse_fastq(&fq)?;
        Self::new(read.read_id(), seq.into_bytes(), &moves, start, stride).map(Some)
    }

    pub fn new(read_id: &str, seq: Vec<u8>, moves: &[u8], start: u64, stride: u64) -> Result<Self> {
        let seq_to_sig = sequence_to_signal(moves, start, stride);
        // one trailing sentinel beyond the bases
        if seq_to_sig.len() != seq.len() + 1 {
            return Err(Error::Missing {
                read: read_id.to_string(),
                what: format!(
                    "move table with {} moves for {} bases",
                    seq_to_sig.len() - 1,
                    seq.len()
                ),
            });
        }
        Ok(Self {
            read_id: read_id.to_string(),
            seq,
            seq_to_sig,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRow {
    pub read_id: String,
    pub ctg: String,
    pub ref_pos: u64,
    pub strand: Strand,
    /// Query bases assigned to this reference base (more than one after an insertion).
    pub bases: String,
    pub signal_start: u64,
    pub signal_end: u64,
    pub mean: Option<f64>,
}

pub const TSV_HEADER: &str =
    "read_id\tctg\tref_pos\tstrand\tbases\tsignal_start\tsignal_end\tn_samples\tmean";

impl EventRow {
    pub fn write_tsv<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
        let mean = self
            .mean
            .map(|m| format!("{m:.4}"))
            .unwrap_or_else(|| "NA".to_string());
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.read_id,
            self.ctg,
            self.ref_pos,
            self.strand,
            self.bases,
            self.signal_start,
            self.signal_end,
            self.signal_end - self.signal_start,
            mean
        )
    }
}

/// Rows for every reference base of `aln` that has query bases; deleted
/// reference bases carry no signal and are skipped.
///
/// `norm_signal` is indexed by raw sample; windows past its end get no mean.
pub fn event_rows(bc: &Basecall, aln: &Alignment, norm_signal: &[f64]) -> Result<Vec<EventRow>> {
    let r2q = reference_to_query(aln)?;
    let mut rows = Vec::with_capacity(r2q.len().saturating_sub(1));
    for (i, w) in r2q.windows(2).enumerate() {
        let (q0, q1) = (w[0] as usize, w[1] as usize);
        if q1 == q0 {
            continue;
        }
        let (Some(&s0), Some(&s1)) = (bc.seq_to_sig.get(q0), bc.seq_to_sig.get(q1)) else {
            return Err(Error::Missing {
                read: bc.read_id.clone(),
                what: format!("signal for query bases {q0}..{q1}"),
            });
        };
        let ref_pos = match aln.strand {
            Strand::Forward => aln.r_st + i as u64,
            Strand::Reverse => aln.r_en - 1 - i as u64,
        };
        let mean = norm_signal
            .get(s0 as usize..s1 as usize)
            .and_then(signal::mean);
        rows.push(EventRow {
            read_id: bc.read_id.clone(),
            ctg: aln.ctg.clone(),
            ref_pos,
            strand: aln.strand,
            bases: String::from_utf8_lossy(&bc.seq[q0..q1]).into_owned(),
            signal_start: s0,
            signal_end: s1,
            mean,
        });
    }
    Ok(rows)
}

/// Best primary hit passing `min_mapq`.
pub fn pick_alignment(hits: &[Alignment], min_mapq: u8) -> Option<&Alignment> {
    hits.iter().find(|a| a.is_primary && a.mapq >= min_mapq)
}
