//! `ontkit motifs` — motif positions on both strands of a reference.

use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::path::PathBuf;

use crate::io::files;
use crate::model::Strand;
use crate::motif;

#[derive(Args, Debug)]
pub struct CmdMotifs {
    #[arg(long)]
    pub fasta: PathBuf,
    /// Motif (regular expression, case-insensitive), e.g. CG or GATC
    #[arg(long)]
    pub motif: String,
    /// Offset of the reported base within each match
    #[arg(long, default_value_t = 0)]
    pub rel_idx: u64,
    /// Output path (default: stdout)
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

impl CmdMotifs {
    pub fn run(self) -> Result<()> {
        let idx = motif::build_reference_idx(&self.fasta, &self.motif, self.rel_idx)
            .with_context(|| format!("index {} in {}", self.motif, self.fasta.display()))?;

        let mut w = files::output_writer(self.out.as_deref())?;
        writeln!(w, "contig\tstrand\tposition")?;
        let mut n = 0usize;
        for (ctg, pos) in idx.iter() {
            for p in &pos.forward {
                writeln!(w, "{ctg}\t{}\t{p}", Strand::Forward)?;
            }
            for p in &pos.reverse {
                writeln!(w, "{ctg}\t{}\t{p}", Strand::Reverse)?;
            }
            n += pos.forward.len() + pos.reverse.len();
        }
        w.flush()?;
        log::info!("motifs: {n} site(s) of {} over {} contig(s)", self.motif, idx.len());
        Ok(())
    }
}
