use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::Error;

/// Default minimap2 preset for nanopore reads.
pub const DEFAULT_PRESET: &str = "map-ont";
/// MAD → standard deviation factor for normally distributed data.
pub const MAD_SCALE: f64 = 1.4826;
/// Phred+33 encoding used by every ONT basecaller.
pub const PHRED_OFFSET: u8 = 33;

// Analysis group prefixes under /Analyses
pub const BASECALL_1D: &str = "Basecall_1D";
pub const SEGMENTATION: &str = "Segmentation";
pub const RAW_GENOME_CORRECTED: &str = "RawGenomeCorrected";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strand {
    #[serde(rename = "+")]
    Forward,
    #[serde(rename = "-")]
    Reverse,
}

impl Strand {
    pub fn as_char(self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Strand {
    type Err = Error;

    // minimap2 reports strands as 1 / -1, tombo and SAM users as + / -
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" | "1" | "+1" => Ok(Strand::Forward),
            "-" | "-1" => Ok(Strand::Reverse),
            other => Err(Error::InvalidStrand(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlignmentStats {
    pub n_matches: u64,
    pub n_mismatches: u64,
    pub n_insertions: u64,
    pub n_deletions: u64,
}

/// Alignment summary stored by tombo next to its event table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignmentInfo {
    pub ctg: String,
    pub ref_start: u64,
    pub ref_end: u64,
    pub n_clipped_start: u64,
    pub n_clipped_end: u64,
    pub strand: Strand,
    pub stats: AlignmentStats,
}

/// Per-channel calibration from the `channel_id` group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelInfo {
    pub channel_number: String,
    pub digitisation: f64,
    pub offset: f64,
    pub range: f64,
    pub sampling_rate: f64,
}

impl ChannelInfo {
    /// pA per discrete level.
    pub fn scale(&self) -> f64 {
        self.range / self.digitisation
    }
}

/// Inputs and knobs of an `eventalign` run, saved next to its output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub inputs: Vec<PathBuf>,
    pub reference: PathBuf,
    pub reference_md5: Option<String>,
    pub preset: String,
    pub threads: usize,
    pub mad_scale: f64,
    pub min_mapq: u8,
    pub n_reads: usize,
    pub n_aligned: usize,
}

impl RunManifest {
    pub fn save_to(out_dir: &Path, m: &Self) -> anyhow::Result<()> {
        fs_err::create_dir_all(out_dir)?;
        let f = fs_err::File::create(out_dir.join("run_manifest.json"))?;
        serde_json::to_writer_pretty(f, m)?;
        Ok(())
    }

    pub fn load_from(out_dir: &Path) -> anyhow::Result<Self> {
        let f = fs_err::File::open(out_dir.join("run_manifest.json"))?;
        let m: Self = serde_json::from_reader(f)?;
        Ok(m)
    }
}
