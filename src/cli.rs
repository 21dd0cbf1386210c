//! CLI definition and top-level dispatch.

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::subcommands::{
    eventalign::CmdEventalign, fastq::CmdFastq, index::CmdIndex, motifs::CmdMotifs,
    reads::CmdReads, syscheck::CmdSyscheck, tombo::CmdTombo,
};

#[derive(Parser, Debug)]
#[command(
    name = "ontkit",
    version,
    about = "Helpers for Oxford Nanopore fast5 data"
)]
pub struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarise every read in fast5 files (TSV or JSON lines)
    Reads(CmdReads),

    /// Extract the latest basecall of every read as FASTQ
    Fastq(CmdFastq),

    /// Align basecalls and report the raw signal behind each reference base
    Eventalign(CmdEventalign),

    /// Positions of a sequence motif on both strands of a FASTA reference
    Motifs(CmdMotifs),

    /// Dump tombo resquiggle alignments (and optionally events)
    Tombo(CmdTombo),

    /// Prebuild a minimap2 index for a reference
    Index(CmdIndex),

    /// Check environment, external tools, and features
    Syscheck(CmdSyscheck),
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.cmd {
            Commands::Reads(cmd) => cmd.run(),
            Commands::Fastq(cmd) => cmd.run(),
            Commands::Eventalign(cmd) => cmd.run(),
            Commands::Motifs(cmd) => cmd.run(),
            Commands::Tombo(cmd) => cmd.run(),
            Commands::Index(cmd) => cmd.run(),
            Commands::Syscheck(cmd) => cmd.run(),
        }
    }
}
