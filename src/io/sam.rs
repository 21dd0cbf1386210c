//! minimap2 `-a` output read with noodles, mapped onto mappy's conventions.

use noodles_sam as sam;
use sam::alignment::record::cigar::op::Kind;
use sam::alignment::record::data::field::Tag;
use sam::alignment::RecordBuf;

use crate::alignment::{Alignment, CigarOp};
use crate::error::{Error, Result};
use crate::model::Strand;

#[derive(Debug, Clone)]
pub struct SamHit {
    pub qname: String,
    pub alignment: Alignment,
}

impl From<Kind> for CigarOp {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Match => CigarOp::Match,
            Kind::Insertion => CigarOp::Ins,
            Kind::Deletion => CigarOp::Del,
            Kind::Skip => CigarOp::RefSkip,
            Kind::SoftClip => CigarOp::SoftClip,
            Kind::HardClip => CigarOp::HardClip,
            Kind::Pad => CigarOp::Pad,
            Kind::SequenceMatch => CigarOp::Equal,
            Kind::SequenceMismatch => CigarOp::Diff,
        }
    }
}

/// Parses all mapped records; unmapped ones are skipped.
pub fn parse_sam(text: &str) -> Result<Vec<SamHit>> {
    let mut reader = sam::io::Reader::new(text.as_bytes());
    let header = reader.read_header()?;
    let mut out = Vec::new();
    for result in reader.record_bufs(&header) {
        let record = result?;
        if let Some(hit) = to_hit(&header, &record)? {
            out.push(hit);
        }
    }
    Ok(out)
}

fn to_hit(header: &sam::Header, record: &RecordBuf) -> Result<Option<SamHit>> {
    let flags = record.flags();
    if flags.is_unmapped() {
        return Ok(None);
    }
    let qname = record
        .name()
        .map(|n| n.to_string())
        .ok_or_else(|| Error::MalformedSam("record without a name".into()))?;
    let bad = |what: &str| Error::MalformedSam(format!("{qname}: {what}"));

    let (ctg, ctg_len) = record
        .reference_sequence_id()
        .and_then(|id| header.reference_sequences().get_index(id))
        .map(|(name, rs)| (name.to_string(), rs.length().get() as u64))
        .ok_or_else(|| bad("mapped record without a reference sequence"))?;
    let pos = record
        .alignment_start()
        .ok_or_else(|| bad("mapped record without a position"))?
        .get() as u64;
    // 255 ("unavailable") is read as None
    let mapq = record.mapping_quality().map(|q| q.get()).unwrap_or(255);
    let ops: Vec<(u32, CigarOp)> = record
        .cigar()
        .as_ref()
        .iter()
        .map(|op| (op.len() as u32, CigarOp::from(op.kind())))
        .collect();
    if ops.is_empty() {
        return Err(bad("mapped record without a CIGAR"));
    }
    let nm = record
        .data()
        .get(&Tag::EDIT_DISTANCE)
        .and_then(|v| v.as_int())
        .and_then(|v| u32::try_from(v).ok())
        .unwrap_or(0);

    // split clipping off both ends
    let lead = ops.iter().take_while(|(_, op)| op.is_clip()).count();
    let trail = ops[lead..].iter().rev().take_while(|(_, op)| op.is_clip()).count();
    let clip_len = |s: &[(u32, CigarOp)]| s.iter().map(|(l, _)| *l).sum::<u32>();
    let lead_len = clip_len(&ops[..lead]);
    let trail_len = clip_len(&ops[ops.len() - trail..]);
    let cigar: Vec<(u32, CigarOp)> = ops[lead..ops.len() - trail].to_vec();
    if cigar.iter().any(|(_, op)| op.is_clip()) {
        return Err(bad("clipping inside the CIGAR"));
    }

    let qlen: u32 = ops
        .iter()
        .filter(|(_, op)| op.consumes_query() || *op == CigarOp::HardClip)
        .map(|(l, _)| *l)
        .sum();
    let rlen: u64 = cigar
        .iter()
        .filter(|(_, op)| op.consumes_ref())
        .map(|(l, _)| *l as u64)
        .sum();
    let sum_of = |want: &[CigarOp]| -> u32 {
        cigar
            .iter()
            .filter(|(_, op)| want.contains(op))
            .map(|(l, _)| *l)
            .sum()
    };
    let aligned = sum_of(&[CigarOp::Match, CigarOp::Equal, CigarOp::Diff]);
    let gaps = sum_of(&[CigarOp::Ins, CigarOp::Del]);

    let strand = if flags.is_reverse_complemented() {
        Strand::Reverse
    } else {
        Strand::Forward
    };
    // SAM clips are in reference orientation; q_st/q_en are on the read as given
    let (q_st, q_en) = match strand {
        Strand::Forward => (lead_len, qlen - trail_len),
        Strand::Reverse => (trail_len, qlen - lead_len),
    };
    let r_st = pos - 1;

    Ok(Some(SamHit {
        qname,
        alignment: Alignment {
            ctg,
            ctg_len,
            r_st,
            r_en: r_st + rlen,
            q_st,
            q_en,
            strand,
            mapq,
            cigar,
            // supplementary hits stay primary, as in mappy
            is_primary: !flags.is_secondary(),
            nm,
            mlen: aligned.saturating_sub(nm.saturating_sub(gaps)),
            blen: aligned + gaps,
        },
    }))
}

/// `10S90M`-style CIGAR for building alignments in tests.
#[cfg(test)]
pub(crate) fn parse_cigar(cigar: &str) -> Vec<(u32, CigarOp)> {
    let mut ops = Vec::new();
    let mut n = 0u32;
    for ch in cigar.chars() {
        match ch.to_digit(10) {
            Some(d) => n = n * 10 + d,
            None => {
                ops.push((n, CigarOp::from_char(ch).unwrap()));
                n = 0;
            }
        }
    }
    ops
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "@HD\tVN:1.6\tSO:unsorted\n\
        @SQ\tSN:chr1\tLN:1000\n\
        @SQ\tSN:chrM\tLN:16569\n\
        @PG\tID:minimap2\tPN:minimap2\tVN:2.26\n";

    #[test]
    fn reverse_record_with_clips() {
        let text = format!(
            "{HEADER}\
            r1\t16\tchr1\t101\t60\t5S10M2D3M4H\t*\t0\t0\t*\t*\tNM:i:3\ttp:A:P\n\
            r2\t4\t*\t0\t0\t*\t*\t0\t0\tACGT\t*\n"
        );
        let hits = parse_sam(&text).unwrap();
        assert_eq!(hits.len(), 1);
        let a = &hits[0].alignment;
        assert_eq!(hits[0].qname, "r1");
        assert_eq!(a.strand, Strand::Reverse);
        assert_eq!((a.r_st, a.r_en, a.ctg_len), (100, 115, 1000));
        // query is 22 bp; the 4H at the SAM end is the read start
        assert_eq!((a.q_st, a.q_en), (4, 17));
        assert_eq!(a.cigar_str(), "10M2D3M");
        assert_eq!((a.nm, a.blen, a.mlen), (3, 15, 12));
        assert_eq!(a.mapq, 60);
        assert!(a.is_primary);
    }

    #[test]
    fn forward_secondary_and_supplementary() {
        let text = format!(
            "{HEADER}\
            r1\t256\tchrM\t1\t0\t3S4M1I2M\t*\t0\t0\t*\t*\n\
            r1\t2048\tchr1\t11\t17\t5M\t*\t0\t0\tACGTA\t*\tNM:i:1\n"
        );
        let hits = parse_sam(&text).unwrap();
        let a = &hits[0].alignment;
        assert_eq!(a.strand, Strand::Forward);
        assert!(!a.is_primary);
        assert_eq!(a.ctg, "chrM");
        assert_eq!((a.r_st, a.r_en, a.ctg_len), (0, 6, 16569));
        assert_eq!((a.q_st, a.q_en), (3, 10));
        assert_eq!(a.nm, 0);

        let b = &hits[1].alignment;
        assert!(b.is_primary);
        assert_eq!((b.r_st, b.r_en, b.mapq), (10, 15, 17));
        assert_eq!((b.nm, b.mlen, b.blen), (1, 4, 5));
    }

    #[test]
    fn noodles_ops_map_to_cigar_ops() {
        assert_eq!(CigarOp::from(Kind::SequenceMismatch), CigarOp::Diff);
        assert_eq!(CigarOp::from(Kind::Skip), CigarOp::RefSkip);
        assert_eq!(parse_cigar("10S90M2D"), vec![
            (10, CigarOp::SoftClip),
            (90, CigarOp::Match),
            (2, CigarOp::Del)
        ]);
    }

    #[test]
    fn truncated_line_is_an_error() {
        assert!(parse_sam(&format!("{HEADER}r1\t0\tchr1\t1\n")).is_err());
    }

    #[test]
    fn unknown_reference_is_an_error() {
        let text = format!("{HEADER}r1\t0\tchr9\t1\t60\t4M\t*\t0\t0\t*\t*\n");
        assert!(parse_sam(&text).is_err());
    }
}
