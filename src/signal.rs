//! Signal helpers: calibration, move-table mapping, normalisation.

use needletail::parse_fastx_reader;
use std::io::Cursor;

use crate::error::{Error, Result};
use crate::model::{ChannelInfo, PHRED_OFFSET};

/// `(offset, scale)` with pA = (level + offset) * scale.
pub fn offset_scale(info: &ChannelInfo) -> (f64, f64) {
    (info.offset, info.scale())
}

/// Maps basecalled bases to raw signal indices.
///
/// Bases are emitted per block of `block_stride` samples; a `1` in the move
/// table marks the block where a new base starts. Element `i` of the result is
/// the first sample of base `i`; the last element is the exclusive end of the
/// final base.
pub fn sequence_to_signal(move_table: &[u8], raw_start: u64, block_stride: u64) -> Vec<u64> {
    move_table
        .iter()
        .chain(std::iter::once(&1u8))
        .enumerate()
        .filter(|(_, &m)| m != 0)
        .map(|(i, _)| i as u64 * block_stride + raw_start)
        .collect()
}

/// Sequence and Phred qualities of the first record in a FASTQ string.
pub fn parse_fastq(fastq: &str) -> Result<(String, Vec<u8>)> {
    let text = fastq.trim();
    if !text.starts_with('@') {
        return Err(Error::InvalidFastq("record does not start with '@'".into()));
    }
    let mut rdr = parse_fastx_reader(Cursor::new(text.as_bytes().to_vec()))?;
    let rec = rdr
        .next()
        .ok_or_else(|| Error::InvalidFastq("no record".into()))??;
    let qual = rec
        .qual()
        .ok_or_else(|| Error::InvalidFastq("record has no qualities".into()))?;
    if let Some(&bad) = qual.iter().find(|&&q| q < PHRED_OFFSET) {
        return Err(Error::InvalidFastq(format!(
            "quality byte {bad} below Phred+{PHRED_OFFSET}"
        )));
    }
    let seq = String::from_utf8_lossy(&rec.seq()).into_owned();
    let phred = qual.iter().map(|&q| q - PHRED_OFFSET).collect();
    Ok((seq, phred))
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    let mut v = values.to_vec();
    v.sort_by(|a, b| a.total_cmp(b));
    let n = v.len();
    if n % 2 == 1 {
        v[n / 2]
    } else {
        0.5 * (v[n / 2 - 1] + v[n / 2])
    }
}

/// Median/MAD normalisation: `(x - median) / (factor * MAD)`.
///
/// Use `Some(MAD_SCALE)` to estimate σ for normally distributed data; `None`
/// divides by the plain MAD. A flat signal has MAD 0 and produces non-finite
/// values.
pub fn normalize_mad(signal: &[f64], scale_factor: Option<f64>) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let factor = scale_factor.unwrap_or(1.0);
    let med = median(signal);
    let shifted: Vec<f64> = signal.iter().map(|x| x - med).collect();
    let abs: Vec<f64> = shifted.iter().map(|x| x.abs()).collect();
    let mad = median(&abs);
    let denom = factor * mad;
    shifted.into_iter().map(|x| x / denom).collect()
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
