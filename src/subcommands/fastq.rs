//! `ontkit fastq` — latest basecall of every read.

use anyhow::Result;
use clap::Args;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::io::fast5::{Fast5File, OpenMode};
use crate::io::files;
use crate::util::logging;

#[derive(Args, Debug)]
pub struct CmdFastq {
    /// fast5 files or directories
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,
    #[arg(long, short)]
    pub recursive: bool,
    /// Output path (default: stdout)
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

impl CmdFastq {
    pub fn run(self) -> Result<()> {
        let t0 = Instant::now();
        let inputs = files::collect_fast5(&self.inputs, self.recursive)?;
        let mut w = files::output_writer(self.out.as_deref())?;

        let (mut written, mut missing) = (0usize, 0usize);
        for path in &inputs {
            let f5 = Fast5File::open(path, OpenMode::Read)?;
            for read in f5.reads()? {
                match read.fastq()? {
                    Some(fq) => {
                        let fq = fq.trim_end();
                        writeln!(w, "{fq}")?;
                        written += 1;
                    }
                    None => {
                        log::debug!("{}: no basecall", read.read_id());
                        missing += 1;
                    }
                }
            }
        }
        w.flush()?;
        log::info!(
            "fastq: {written} record(s) from {} file(s), {missing} read(s) without basecall, {}",
            inputs.len(),
            logging::elapsed(t0)
        );
        Ok(())
    }
}
