//! `ontkit index` — prebuild a minimap2 index.

use crate::io::fasta;
use crate::model::DEFAULT_PRESET;
use crate::util::mapping;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct CmdIndex {
    #[arg(long)]
    pub reference: PathBuf,
    /// Output .mmi (default: reference path with .mmi extension)
    #[arg(long)]
    pub out: Option<PathBuf>,
    #[arg(long, default_value = DEFAULT_PRESET)]
    pub preset: String,
    #[arg(long)]
    pub minimap2: Option<PathBuf>,
    #[arg(long, help = "Threads (default: logical CPUs, capped at 16)")]
    pub threads: Option<usize>,
    #[arg(long)]
    pub force: bool,
}

impl CmdIndex {
    pub fn run(self) -> Result<()> {
        fasta::validate_fasta(&self.reference)?;
        let mm2_bin = mapping::resolve_minimap2(self.minimap2.as_deref())?;
        log::info!("Using minimap2 at {mm2_bin:?}");
        if let Ok(v) = mapping::get_version(&mm2_bin) {
            log::info!("minimap2: {v}");
        }

        let out = self
            .out
            .unwrap_or_else(|| self.reference.with_extension("mmi"));
        if mapping::build_index(
            &mm2_bin,
            &self.reference,
            &self.preset,
            &out,
            self.force,
            mapping::thread_count(self.threads),
        )? {
            log::info!("wrote {}", out.display());
        }
        Ok(())
    }
}
