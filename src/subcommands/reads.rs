//! `ontkit reads` — one summary row per read.

use anyhow::{Context, Result};
use clap::Args;
use rayon::prelude::*;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

use crate::io::files;
use crate::summary::{self, ReadSummary};
use crate::util::{logging, mapping};

#[derive(Args, Debug)]
pub struct CmdReads {
    /// fast5 files or directories
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,
    #[arg(long, short)]
    pub recursive: bool,
    /// Output path (default: stdout)
    #[arg(long, short)]
    pub out: Option<PathBuf>,
    /// JSON lines instead of TSV
    #[arg(long)]
    pub json: bool,
    #[arg(long, help = "Threads (default: logical CPUs, capped at 16)")]
    pub threads: Option<usize>,
}

impl CmdReads {
    pub fn run(self) -> Result<()> {
        let t0 = Instant::now();
        let inputs = files::collect_fast5(&self.inputs, self.recursive)?;
        log::info!("reads: {} fast5 file(s)", inputs.len());

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(mapping::thread_count(self.threads))
            .build()?;
        let pb = logging::progress(inputs.len());
        let per_file: Vec<(PathBuf, crate::Result<Vec<ReadSummary>>)> = pool.install(|| {
            inputs
                .par_iter()
                .map(|p| {
                    let rows = summary::summarize_file(p);
                    pb.inc(1);
                    (p.clone(), rows)
                })
                .collect()
        });
        pb.finish_and_clear();

        let mut w = files::output_writer(self.out.as_deref())?;
        if !self.json {
            writeln!(w, "{}", summary::TSV_HEADER)?;
        }
        let (mut n_reads, mut n_failed) = (0usize, 0usize);
        for (path, rows) in per_file {
            let rows = match rows {
                Ok(rows) => rows,
                Err(e) => {
                    log::warn!("skipping {}: {e}", path.display());
                    n_failed += 1;
                    continue;
                }
            };
            for r in &rows {
                if self.json {
                    serde_json::to_writer(&mut w, r)?;
                    writeln!(w)?;
                } else {
                    summary::write_tsv_row(&mut w, r)
                        .with_context(|| format!("write row for {}", r.read_id))?;
                }
            }
            n_reads += rows.len();
        }
        w.flush()?;
        log::info!(
            "reads: {n_reads} read(s), {n_failed} unreadable file(s) in {}",
            logging::elapsed(t0)
        );
        Ok(())
    }
}
