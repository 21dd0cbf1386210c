//! `ontkit eventalign` — signal samples behind every aligned reference base.
//!
//! Per fast5 file: read basecalls and move tables, map all basecalls with one
//! minimap2 call, then cut the MAD-normalised signal at the base boundaries.

use anyhow::{Context, Result};
use clap::Args;
use fs_err as fs;
use rayon::prelude::*;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

use crate::alignment::{Aligner, AlignerOptions};
use crate::eventalign::{self, Basecall, EventRow};
use crate::io::fast5::{Fast5File, OpenMode};
use crate::io::files;
use crate::model::{RunManifest, DEFAULT_PRESET, MAD_SCALE};
use crate::signal;
use crate::util::{logging, mapping};

#[derive(Args, Debug)]
pub struct CmdEventalign {
    /// Comma-separated fast5 files or directories
    #[arg(long, value_delimiter = ',', required = true)]
    pub inputs: Vec<PathBuf>,
    /// Reference FASTA (or prebuilt .mmi)
    #[arg(long)]
    pub reference: PathBuf,
    /// Output directory (eventalign.tsv, run_manifest.json)
    #[arg(long)]
    pub out: PathBuf,
    #[arg(long, default_value = DEFAULT_PRESET)]
    pub preset: String,
    #[arg(long, value_name = "PATH")]
    pub minimap2: Option<PathBuf>,
    #[arg(long, help = "Threads (default: logical CPUs, capped at 16)")]
    pub threads: Option<usize>,
    #[arg(long, short)]
    pub recursive: bool,
    /// Skip reads whose best primary hit has a lower MAPQ
    #[arg(long, default_value_t = 0)]
    pub min_mapq: u8,
    /// Factor applied to the MAD when normalising the signal
    #[arg(long, default_value_t = MAD_SCALE)]
    pub mad_scale: f64,
    /// Secondary alignments minimap2 may report (-N)
    #[arg(long)]
    pub best_n: Option<usize>,
}

#[derive(Default)]
struct Counts {
    reads: usize,
    basecalled: usize,
    aligned: usize,
    rows: usize,
}

impl CmdEventalign {
    pub fn run(self) -> Result<()> {
        let t0 = Instant::now();
        let threads = mapping::thread_count(self.threads);
        let inputs = files::collect_fast5(&self.inputs, self.recursive)?;
        log::info!("eventalign: {} fast5 file(s)", inputs.len());

        let opts = AlignerOptions {
            threads,
            best_n: self.best_n,
            ..AlignerOptions::default()
        };
        let aligner =
            Aligner::with_minimap2(self.minimap2.as_deref(), &self.reference, &self.preset, opts)
                .with_context(|| format!("load reference {}", self.reference.display()))?;
        log::info!(
            "reference {} ({} sequences), preset {}",
            aligner.reference().display(),
            aligner.seq_names().len(),
            aligner.preset()
        );

        let pool = rayon::ThreadPoolBuilder::new().num_threads(threads).build()?;

        fs::create_dir_all(&self.out)?;
        let tsv = self.out.join("eventalign.tsv");
        let mut w = BufWriter::new(fs::File::create(&tsv)?);
        writeln!(w, "{}", eventalign::TSV_HEADER)?;

        let mut counts = Counts::default();
        let pb = logging::progress(inputs.len());
        for path in &inputs {
            let rows = self
                .process_file(path, &aligner, &pool, &mut counts)
                .with_context(|| format!("eventalign on {}", path.display()))?;
            for row in &rows {
                row.write_tsv(&mut w)?;
            }
            counts.rows += rows.len();
            pb.inc(1);
        }
        pb.finish_and_clear();
        w.flush()?;

        let manifest = RunManifest {
            inputs: inputs.clone(),
            reference: self.reference.clone(),
            reference_md5: files::md5_of_file(&self.reference).ok(),
            preset: self.preset.clone(),
            threads,
            mad_scale: self.mad_scale,
            min_mapq: self.min_mapq,
            n_reads: counts.reads,
            n_aligned: counts.aligned,
        };
        RunManifest::save_to(&self.out, &manifest)?;

        log::info!(
            "eventalign: {} read(s), {} basecalled, {} aligned, {} row(s) -> {} in {}",
            counts.reads,
            counts.basecalled,
            counts.aligned,
            counts.rows,
            tsv.display(),
            logging::elapsed(t0)
        );
        Ok(())
    }

    fn process_file(
        &self,
        path: &std::path::Path,
        aligner: &Aligner,
        pool: &rayon::ThreadPool,
        counts: &mut Counts,
    ) -> Result<Vec<EventRow>> {
        let f5 = Fast5File::open(path, OpenMode::Read)?;
        let reads = f5.reads()?;
        counts.reads += reads.len();

        // HDF5 handles stay on this thread; only plain data goes to the pool.
        let mut jobs: Vec<(Basecall, Vec<f64>)> = Vec::with_capacity(reads.len());
        for read in &reads {
            let bc = match Basecall::from_read(read) {
                Ok(Some(bc)) => bc,
                Ok(None) => {
                    log::debug!("{}: no basecall with moves", read.read_id());
                    continue;
                }
                Err(e) => {
                    log::warn!("{}: {e}", read.read_id());
                    continue;
                }
            };
            let pa = read.signal(true)?.to_f64();
            jobs.push((bc, signal::normalize_mad(&pa, Some(self.mad_scale))));
        }
        counts.basecalled += jobs.len();

        let queries: Vec<(String, Vec<u8>)> = jobs
            .iter()
            .map(|(bc, _)| (bc.read_id.clone(), bc.seq.clone()))
            .collect();
        let hits = aligner.map_batch(&queries)?;

        let min_mapq = self.min_mapq;
        let per_read: Vec<Option<Vec<EventRow>>> = pool.install(|| {
            jobs.par_iter()
                .map(|(bc, norm)| {
                    let aln = hits
                        .get(&bc.read_id)
                        .and_then(|h| eventalign::pick_alignment(h, min_mapq))?;
                    match eventalign::event_rows(bc, aln, norm) {
                        Ok(rows) => Some(rows),
                        Err(e) => {
                            log::warn!("{}: {e}", bc.read_id);
                            None
                        }
                    }
                })
                .collect()
        });

        let mut rows = Vec::new();
        for r in per_read.into_iter().flatten() {
            counts.aligned += 1;
            rows.extend(r);
        }
        Ok(rows)
    }
}
