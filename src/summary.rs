//! Per-read summaries for the `reads` subcommand.
//!
//! One row per read: where it lives, how much signal it carries, its
//! calibration, and whether a basecall (with move table) is attached.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::io::fast5::{Fast5File, Fast5Read, OpenMode};
use crate::signal;

#[derive(Debug, Clone, Serialize)]
pub struct ReadSummary {
    pub read_id: String,
    pub file: PathBuf,
    pub n_samples: usize,
    pub channel: String,
    pub offset: f64,
    pub scale: f64,
    pub basecall: Option<String>,
    pub n_bases: Option<usize>,
    pub mean_qscore: Option<f64>,
    pub has_moves: bool,
}

/// Mean Phred score computed in error-probability space, the way ONT reports it.
pub fn mean_qscore(quals: &[u8]) -> Option<f64> {
    if quals.is_empty() {
        return None;
    }
    let mean_err =
        quals.iter().map(|&q| 10f64.powf(-(q as f64) / 10.0)).sum::<f64>() / quals.len() as f64;
    Some(-10.0 * mean_err.log10())
}

pub fn summarize_read(file: &Path, read: &Fast5Read) -> Result<ReadSummary> {
    let info = read.channel_info()?;
    let (offset, scale) = signal::offset_scale(&info);
    let basecall = read.latest_analysis(crate::model::BASECALL_1D)?;

    let (n_bases, mean_q) = match read.fastq()? {
        Some(fq) => match signal::parse_fastq(&fq) {
            Ok((seq, q)) => (Some(seq.len()), mean_qscore(&q)),
            Err(e) => {
                log::warn!("{}: unreadable basecall: {e}", read.read_id());
                (None, None)
            }
        },
        None => (None, None),
    };

    Ok(ReadSummary {
        read_id: read.read_id().to_string(),
        file: file.to_path_buf(),
        n_samples: read.n_samples()?,
        channel: info.channel_number,
        offset,
        scale,
        basecall,
        n_bases,
        mean_qscore: mean_q,
        has_moves: read.move_table()?.is_some(),
    })
}

pub fn summarize_file(path: &Path) -> Result<Vec<ReadSummary>> {
    let f5 = Fast5File::open(path, OpenMode::Read)?;
    f5.reads()?
        .iter()
        .map(|r| summarize_read(path, r))
        .collect()
}

pub const TSV_HEADER: &str =
    "read_id\tfile\tn_samples\tchannel\toffset\tscale\tbasecall\tn_bases\tmean_qscore\thas_moves";

pub fn write_tsv_row<W: Write>(w: &mut W, r: &ReadSummary) -> std::io::Result<()> {
    let opt = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    writeln!(
        w,
        "{}\t{}\t{}\t{}\t{:.4}\t{:.6}\t{}\t{}\t{}\t{}",
        r.read_id,
        r.file.display(),
        r.n_samples,
        r.channel,
        r.offset,
        r.scale,
        opt(r.basecall.clone()),
        opt(r.n_bases.map(|n| n.to_string())),
        opt(r.mean_qscore.map(|q| format!("{q:.2}"))),
        r.has_moves
    )
}
