//! Small multi-read fast5 files and a stand-in minimap2 for the CLI tests.
#![allow(dead_code)]

use hdf5::types::{FixedAscii, VarLenUnicode};
use hdf5::{Group, Location};
use ontkit::tombo::EventRecord;
use std::path::{Path, PathBuf};

fn str_attr(loc: &Location, name: &str, value: &str) {
    let v: VarLenUnicode = value.parse().unwrap();
    loc.new_attr::<VarLenUnicode>()
        .shape(())
        .create(name)
        .unwrap()
        .write_scalar(&v)
        .unwrap();
}

fn num_attr<T: hdf5::H5Type>(loc: &Location, name: &str, value: T) {
    loc.new_attr::<T>()
        .shape(())
        .create(name)
        .unwrap()
        .write_scalar(&value)
        .unwrap();
}

fn child(parent: &Group, name: &str) -> Group {
    if parent.link_exists(name) {
        parent.group(name).unwrap()
    } else {
        parent.create_group(name).unwrap()
    }
}

/// Basecaller output attached to a read.
pub struct Basecalled<'a> {
    pub fastq: &'a str,
    pub moves: Option<&'a [u8]>,
    pub block_stride: i64,
    pub first_sample: i64,
}

impl<'a> Basecalled<'a> {
    pub fn fastq_only(fastq: &'a str) -> Self {
        Self {
            fastq,
            moves: None,
            block_stride: 5,
            first_sample: 0,
        }
    }
}

/// Every read gets 40 samples; reads without a basecall get no `Analyses` group.
pub fn write_reads(path: &Path, reads: &[(&str, Option<Basecalled>)]) {
    let f = hdf5::File::create(path).unwrap();
    for (id, basecall) in reads {
        let root = f.create_group(&format!("read_{id}")).unwrap();
        let raw = root.create_group("Raw").unwrap();
        str_attr(&raw, "read_id", id);
        let signal: Vec<i16> = (0..40).map(|i| 400 + (i % 7) * 3).collect();
        raw.new_dataset_builder()
            .with_data(signal.as_slice())
            .create("Signal")
            .unwrap();

        let ch = root.create_group("channel_id").unwrap();
        str_attr(&ch, "channel_number", "7");
        num_attr(&ch, "digitisation", 8192.0f64);
        num_attr(&ch, "offset", 10.0f64);
        num_attr(&ch, "range", 1400.0f64);
        num_attr(&ch, "sampling_rate", 4000.0f64);

        let Some(bc) = basecall else { continue };
        let analyses = root.create_group("Analyses").unwrap();
        let call = analyses.create_group("Basecall_1D_000").unwrap();
        let tmpl = call.create_group("BaseCalled_template").unwrap();
        let v: VarLenUnicode = bc.fastq.parse().unwrap();
        tmpl.new_dataset::<VarLenUnicode>()
            .shape(())
            .create("Fastq")
            .unwrap()
            .write_scalar(&v)
            .unwrap();
        if let Some(moves) = bc.moves {
            tmpl.new_dataset_builder()
                .with_data(moves)
                .create("Move")
                .unwrap();
        }
        let summary = call
            .create_group("Summary")
            .unwrap()
            .create_group("basecall_1d_template")
            .unwrap();
        num_attr(&summary, "block_stride", bc.block_stride);
        let seg = analyses
            .create_group("Segmentation_000")
            .unwrap()
            .create_group("Summary")
            .unwrap()
            .create_group("segmentation")
            .unwrap();
        num_attr(&seg, "first_sample_template", bc.first_sample);
    }
}

/// `(read_id, fastq)` shorthand over [`write_reads`].
pub fn write_fast5(path: &Path, reads: &[(&str, Option<&str>)]) {
    let reads: Vec<(&str, Option<Basecalled>)> = reads
        .iter()
        .map(|(id, fq)| (*id, fq.map(Basecalled::fastq_only)))
        .collect();
    write_reads(path, &reads);
}

/// Two-event tombo resquiggle of `read` on chr2, reverse strand.
pub fn add_tombo(path: &Path, read: &str) {
    let f = hdf5::File::open_rw(path).unwrap();
    let root = f.group(&format!("read_{read}")).unwrap();
    let rgc = child(&root, "Analyses")
        .create_group("RawGenomeCorrected_000")
        .unwrap();
    let tmpl = rgc.create_group("BaseCalled_template").unwrap();
    let events = vec![
        EventRecord {
            norm_mean: -0.5,
            norm_stdev: 0.1,
            start: 0,
            length: 8,
            base: FixedAscii::<1>::from_ascii(b"G").unwrap(),
        },
        EventRecord {
            norm_mean: 0.75,
            norm_stdev: 0.2,
            start: 8,
            length: 4,
            base: FixedAscii::<1>::from_ascii(b"T").unwrap(),
        },
    ];
    let ds = tmpl
        .new_dataset_builder()
        .with_data(events.as_slice())
        .create("Events")
        .unwrap();
    num_attr(&ds, "read_start_rel_to_raw", 12i64);

    let aln = tmpl.create_group("Alignment").unwrap();
    str_attr(&aln, "mapped_chrom", "chr2");
    str_attr(&aln, "mapped_strand", "-");
    for (name, v) in [
        ("mapped_start", 500i64),
        ("mapped_end", 502),
        ("clipped_bases_start", 0),
        ("clipped_bases_end", 2),
        ("num_matches", 2),
        ("num_mismatches", 0),
        ("num_insertions", 0),
        ("num_deletions", 0),
    ] {
        num_attr(&aln, name, v);
    }
}

/// Executable standing in for minimap2: prints a version, writes `-d` index
/// targets, and otherwise answers every mapping with `sam_text`.
#[cfg(unix)]
pub fn fake_minimap2(dir: &Path, sam_text: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;
    let p = dir.join("minimap2");
    let script = format!(
        "#!/bin/sh\n\
        if [ \"$1\" = \"--version\" ]; then echo 2.26-fake; exit 0; fi\n\
        while [ $# -gt 0 ]; do\n\
        if [ \"$1\" = \"-d\" ]; then echo rebuilt > \"$2\"; exit 0; fi\n\
        shift\n\
        done\n\
        cat <<'EOF'\n{sam_text}EOF\n"
    );
    fs_err::write(&p, script).unwrap();
    let mut perms = fs_err::metadata(&p).unwrap().permissions();
    perms.set_mode(0o755);
    fs_err::set_permissions(&p, perms).unwrap();
    p
}
