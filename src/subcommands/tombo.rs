//! `ontkit tombo` — resquiggle alignments (and events) as JSON lines.

use anyhow::Result;
use clap::Args;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::io::fast5::{Fast5File, OpenMode};
use crate::io::files;
use crate::model::AlignmentInfo;
use crate::tombo::{self, TomboEvent};

#[derive(Args, Debug)]
pub struct CmdTombo {
    /// fast5 files or directories
    #[arg(required = true, num_args = 1..)]
    pub inputs: Vec<PathBuf>,
    #[arg(long, short)]
    pub recursive: bool,
    /// Include the per-base event table
    #[arg(long)]
    pub events: bool,
    /// Extra `Alignment` attributes to copy verbatim (repeatable)
    #[arg(long = "attr", value_name = "NAME")]
    pub attrs: Vec<String>,
    /// Output path (default: stdout)
    #[arg(long, short)]
    pub out: Option<PathBuf>,
}

#[derive(Serialize)]
struct TomboRecord<'a> {
    read_id: &'a str,
    file: &'a Path,
    alignment: AlignmentInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    read_start_rel_to_raw: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    events: Option<Vec<TomboEvent>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    attrs: BTreeMap<&'a str, String>,
}

impl CmdTombo {
    pub fn run(self) -> Result<()> {
        let inputs = files::collect_fast5(&self.inputs, self.recursive)?;
        let mut w = files::output_writer(self.out.as_deref())?;

        let (mut n, mut skipped) = (0usize, 0usize);
        for path in &inputs {
            let f5 = Fast5File::open(path, OpenMode::Read)?;
            for read in f5.reads()? {
                let Some(alignment) = tombo::alignment_info(&read)? else {
                    skipped += 1;
                    continue;
                };
                let (offset, events) = if self.events {
                    (tombo::events_raw_offset(&read)?, tombo::event_table(&read)?)
                } else {
                    (None, None)
                };
                let mut attrs = BTreeMap::new();
                for name in &self.attrs {
                    if let Some(v) = tombo::alignment_attr(&read, name)? {
                        attrs.insert(name.as_str(), v);
                    }
                }
                let rec = TomboRecord {
                    read_id: read.read_id(),
                    file: path,
                    alignment,
                    read_start_rel_to_raw: offset,
                    events,
                    attrs,
                };
                serde_json::to_writer(&mut w, &rec)?;
                writeln!(w)?;
                n += 1;
            }
        }
        w.flush()?;
        log::info!("tombo: {n} resquiggled read(s), {skipped} without tombo results");
        Ok(())
    }
}
