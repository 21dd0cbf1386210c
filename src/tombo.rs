//! Reading tombo resquiggle results (`RawGenomeCorrected_NNN`).

use hdf5::types::FixedAscii;
use hdf5::H5Type;
use serde::Serialize;

use crate::error::Result;
use crate::io::fast5::{attr_string, attr_u64, read_string, Fast5Read};
use crate::model::{AlignmentInfo, AlignmentStats, Strand, RAW_GENOME_CORRECTED};

const TEMPLATE: &str = "BaseCalled_template";

/// Row of tombo's `Events` table, as stored on disk.
#[derive(H5Type, Debug, Clone)]
#[repr(C)]
pub struct EventRecord {
    pub norm_mean: f64,
    pub norm_stdev: f64,
    pub start: u32,
    pub length: u32,
    pub base: FixedAscii<1>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TomboEvent {
    pub norm_mean: f64,
    pub norm_stdev: f64,
    pub start: u32,
    pub length: u32,
    pub base: char,
}

impl From<EventRecord> for TomboEvent {
    fn from(r: EventRecord) -> Self {
        Self {
            norm_mean: r.norm_mean,
            norm_stdev: r.norm_stdev,
            start: r.start,
            length: r.length,
            base: r.base.as_str().chars().next().unwrap_or('N'),
        }
    }
}

/// Event table of the latest tombo analysis.
pub fn event_table(read: &Fast5Read) -> Result<Option<Vec<TomboEvent>>> {
    let Some(analysis) = read.latest_analysis(RAW_GENOME_CORRECTED)? else {
        return Ok(None);
    };
    let Some(ds) = read.analysis_dataset(&analysis, &format!("{TEMPLATE}/Events"))? else {
        return Ok(None);
    };
    let rows = ds.read_raw::<EventRecord>()?;
    Ok(Some(rows.into_iter().map(TomboEvent::from).collect()))
}

/// Raw index where event `start` 0 lies (`read_start_rel_to_raw`).
pub fn events_raw_offset(read: &Fast5Read) -> Result<Option<u64>> {
    let Some(analysis) = read.latest_analysis(RAW_GENOME_CORRECTED)? else {
        return Ok(None);
    };
    match read.analysis_dataset(&analysis, &format!("{TEMPLATE}/Events"))? {
        Some(ds) => attr_u64(&ds, "read_start_rel_to_raw"),
        None => Ok(None),
    }
}

/// Alignment attributes tombo stores next to its events.
pub fn alignment_info(read: &Fast5Read) -> Result<Option<AlignmentInfo>> {
    let Some(analysis) = read.latest_analysis(RAW_GENOME_CORRECTED)? else {
        return Ok(None);
    };
    let Some(grp) = read.analysis_group(&analysis, &format!("{TEMPLATE}/Alignment"))? else {
        return Ok(None);
    };
    let num = |name: &str| -> Result<u64> {
        attr_u64(&grp, name)?.ok_or_else(|| read.missing(name))
    };
    let ctg = attr_string(&grp, "mapped_chrom")?.ok_or_else(|| read.missing("mapped_chrom"))?;
    let strand: Strand = attr_string(&grp, "mapped_strand")?
        .ok_or_else(|| read.missing("mapped_strand"))?
        .parse()?;

    Ok(Some(AlignmentInfo {
        ctg,
        ref_start: num("mapped_start")?,
        ref_end: num("mapped_end")?,
        n_clipped_start: num("clipped_bases_start")?,
        n_clipped_end: num("clipped_bases_end")?,
        strand,
        stats: AlignmentStats {
            n_matches: num("num_matches")?,
            n_mismatches: num("num_mismatches")?,
            n_insertions: num("num_insertions")?,
            n_deletions: num("num_deletions")?,
        },
    }))
}

/// Attribute access for callers that need tombo fields not modelled above.
pub fn alignment_attr(read: &Fast5Read, name: &str) -> Result<Option<String>> {
    let Some(analysis) = read.latest_analysis(RAW_GENOME_CORRECTED)? else {
        return Ok(None);
    };
    let Some(grp) = read.analysis_group(&analysis, &format!("{TEMPLATE}/Alignment"))? else {
        return Ok(None);
    };
    if !grp.attr_names()?.iter().any(|n| n == name) {
        return Ok(None);
    }
    let attr = grp.attr(name)?;
    match read_string(&attr, name) {
        Ok(s) => Ok(Some(s)),
        Err(_) => Ok(Some(attr.read_scalar::<f64>()?.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::fast5::fixtures::*;
    use crate::io::fast5::{Fast5File, OpenMode};
    use std::path::Path;

    fn add_tombo(path: &Path, read: &str) {
        let f = hdf5::File::open_rw(path).unwrap();
        let analyses = f.group(&format!("read_{read}/Analyses")).unwrap();
        let rgc = analyses.create_group("RawGenomeCorrected_000").unwrap();
        let tmpl = rgc.create_group("BaseCalled_template").unwrap();
        let events = vec![
            EventRecord {
                norm_mean: -0.5,
                norm_stdev: 0.1,
                start: 0,
                length: 8,
                base: FixedAscii::<1>::from_ascii(b"A").unwrap(),
            },
            EventRecord {
                norm_mean: 1.25,
                norm_stdev: 0.2,
                start: 8,
                length: 5,
                base: FixedAscii::<1>::from_ascii(b"C").unwrap(),
            },
        ];
        let ds = tmpl
            .new_dataset_builder()
            .with_data(events.as_slice())
            .create("Events")
            .unwrap();
        i64_attr(&ds, "read_start_rel_to_raw", 120);

        let aln = tmpl.create_group("Alignment").unwrap();
        str_attr(&aln, "mapped_chrom", "chr2");
        str_attr(&aln, "mapped_strand", "-");
        for (name, v) in [
            ("mapped_start", 1000),
            ("mapped_end", 1002),
            ("clipped_bases_start", 3),
            ("clipped_bases_end", 1),
            ("num_matches", 2),
            ("num_mismatches", 0),
            ("num_insertions", 1),
            ("num_deletions", 0),
        ] {
            i64_attr(&aln, name, v);
        }
    }

    #[test]
    fn reads_tombo_results() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("tombo.fast5");
        write_multi(&p, &[ReadFixture::new("t1", vec![1, 2, 3])]);
        add_tombo(&p, "t1");

        let f5 = Fast5File::open(&p, OpenMode::Read).unwrap();
        let reads = f5.reads().unwrap();
        let r = &reads[0];

        let ev = event_table(r).unwrap().unwrap();
        assert_eq!(ev.len(), 2);
        assert_eq!(ev[1].base, 'C');
        assert_eq!((ev[1].start, ev[1].length), (8, 5));
        assert_eq!(events_raw_offset(r).unwrap(), Some(120));

        let info = alignment_info(r).unwrap().unwrap();
        assert_eq!(info.ctg, "chr2");
        assert_eq!(info.strand, Strand::Reverse);
        assert_eq!((info.ref_start, info.ref_end), (1000, 1002));
        assert_eq!(info.n_clipped_start, 3);
        assert_eq!(info.stats.n_insertions, 1);

        assert_eq!(alignment_attr(r, "mapped_chrom").unwrap().as_deref(), Some("chr2"));
        assert_eq!(alignment_attr(r, "nope").unwrap(), None);
    }

    #[test]
    fn absent_without_tombo_analysis() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("plain.fast5");
        write_multi(&p, &[ReadFixture::new("p1", vec![1])]);
        let f5 = Fast5File::open(&p, OpenMode::Read).unwrap();
        let reads = f5.reads().unwrap();
        let r = &reads[0];
        assert_eq!(event_table(r).unwrap(), None);
        assert_eq!(alignment_info(r).unwrap(), None);
        assert_eq!(events_raw_offset(r).unwrap(), None);
    }
}
