//! `ontkit syscheck` — environment & versions.

use anyhow::Result;
use clap::Args;
use fs_err as fs;
use std::path::PathBuf;
use sysinfo::System;

use crate::util::mapping;

#[derive(Args, Debug)]
pub struct CmdSyscheck {
    #[arg(long)]
    pub out: Option<PathBuf>,
    /// Optional explicit minimap2 binary
    #[arg(long, value_name = "PATH")]
    pub minimap2: Option<PathBuf>,
}

impl CmdSyscheck {
    pub fn run(self) -> Result<()> {
        let mut s = System::new_all();
        s.refresh_all();

        // minimap2 is optional for most subcommands, so report instead of failing
        let minimap2 = match mapping::resolve_minimap2(self.minimap2.as_deref()) {
            Ok(bin) => {
                let version = mapping::get_version(&bin).unwrap_or_else(|e| format!("error: {e}"));
                serde_json::json!({ "path": bin, "version": version })
            }
            Err(e) => serde_json::json!({ "path": null, "error": e.to_string() }),
        };
        let (major, minor, patch) = hdf5::library_version();

        let obj = serde_json::json!({
            "ontkit_version": env!("CARGO_PKG_VERSION"),
            "cpus": s.cpus().len(),
            "total_memory_mb": s.total_memory() / 1024 / 1024,
            "hdf5": format!("{major}.{minor}.{patch}"),
            "executables": {
                "minimap2": minimap2,
            },
        });

        if let Some(path) = self.out {
            serde_json::to_writer_pretty(fs::File::create(path)?, &obj)?;
        } else {
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
        Ok(())
    }
}
