//! minimap2 subprocess helpers.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::error::{Error, Result};

pub const MINIMAP2_ENV: &str = "ONTKIT_MINIMAP2";

/// Worker threads: the explicit value, else logical CPUs capped at 16.
pub fn thread_count(opt: Option<usize>) -> usize {
    opt.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
            .min(16)
    })
}

/// Resolve the minimap2 executable.
/// Priority: CLI override > environment variable > PATH search
pub fn resolve_minimap2(mm2_opt: Option<&Path>) -> Result<PathBuf> {
    if let Some(p) = mm2_opt {
        if p.exists() {
            return Ok(p.to_path_buf());
        }
        return Err(Error::Minimap2(format!("minimap2 not found at {}", p.display())));
    }
    if let Some(envp) = std::env::var_os(MINIMAP2_ENV) {
        return Ok(PathBuf::from(envp));
    }
    which::which("minimap2").map_err(|_| {
        Error::Minimap2(format!(
            "minimap2 not found (set --minimap2, {MINIMAP2_ENV}, or PATH)"
        ))
    })
}

pub fn get_version(bin: &Path) -> Result<String> {
    let out = Command::new(bin).arg("--version").output()?;
    if !out.status.success() {
        return Err(Error::Minimap2(format!(
            "{} --version exited with {}",
            bin.display(),
            out.status
        )));
    }
    let s = String::from_utf8_lossy(&out.stdout);
    Ok(s.lines().next().unwrap_or_default().trim().to_string())
}

/// Build a `.mmi` index. Returns false when an existing index was kept.
pub fn build_index(
    mm2: &Path,
    reference: &Path,
    preset: &str,
    out_mmi: &Path,
    force: bool,
    threads: usize,
) -> Result<bool> {
    if out_mmi.exists() && !force {
        log::info!("index {} exists, keeping it (--force to rebuild)", out_mmi.display());
        return Ok(false);
    }
    if let Some(parent) = out_mmi.parent() {
        fs_err::create_dir_all(parent)?;
    }
    log::info!(
        "minimap2 index ({preset}): {} → {}",
        reference.display(),
        out_mmi.display()
    );
    let status = Command::new(mm2)
        .args(["-x", preset, "-t"])
        .arg(threads.to_string())
        .arg("-d")
        .arg(out_mmi)
        .arg(reference)
        .status()?;
    if !status.success() {
        return Err(Error::Minimap2(format!("indexing failed with {status}")));
    }
    Ok(true)
}

/// Map FASTA `queries` against `reference` and return the SAM text.
pub fn map_to_sam(
    mm2: &Path,
    preset: &str,
    reference: &Path,
    queries: &Path,
    threads: usize,
    extra: &[String],
) -> Result<String> {
    let out = Command::new(mm2)
        .args(["-a", "-x", preset, "-t"])
        .arg(threads.to_string())
        .args(extra)
        .arg(reference)
        .arg(queries)
        .stderr(Stdio::piped())
        .output()?;
    if !out.status.success() {
        let err = String::from_utf8_lossy(&out.stderr);
        return Err(Error::Minimap2(format!(
            "mapping exited with {}: {}",
            out.status,
            err.trim()
        )));
    }
    Ok(String::from_utf8_lossy(&out.stdout).into_owned())
}

/// Write `(name, seq)` pairs as FASTA.
pub fn write_fasta<W: Write>(mut w: W, records: &[(String, Vec<u8>)]) -> Result<usize> {
    let mut n = 0;
    for (name, seq) in records {
        if seq.is_empty() {
            continue;
        }
        writeln!(w, ">{name}")?;
        w.write_all(seq)?;
        writeln!(w)?;
        n += 1;
    }
    w.flush()?;
    Ok(n)
}
