//! Input discovery, output sinks and hashing.

use fs_err as fs;
use itertools::Itertools;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

pub const FAST5_EXT: &str = ".fast5";

pub fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        Err(Error::NotFound(path.to_path_buf()))
    } else {
        Ok(())
    }
}

pub fn md5_of_file(path: &Path) -> Result<String> {
    let mut f = fs::File::open(path)?;
    let mut ctx = md5::Context::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = f.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(format!("{:x}", ctx.compute()))
}

fn name_ends_with(path: &Path, extension: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.ends_with(extension))
}

/// Files whose name ends with `extension`.
///
/// A file path is returned as is when it matches. A directory is searched for
/// matching files, descending into subdirectories only when `recursive` is
/// set. Results are sorted.
pub fn find_files(path: &Path, extension: &str, recursive: bool) -> Result<Vec<PathBuf>> {
    ensure_exists(path)?;
    if path.is_file() {
        return Ok(if name_ends_with(path, extension) {
            vec![path.to_path_buf()]
        } else {
            Vec::new()
        });
    }
    let mut out = Vec::new();
    walk(path, extension, recursive, &mut out)?;
    out.sort();
    Ok(out)
}

fn walk(dir: &Path, extension: &str, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let p = entry.path();
        if entry.file_type()?.is_dir() {
            if recursive {
                walk(&p, extension, recursive, out)?;
            }
        } else if name_ends_with(&p, extension) {
            out.push(p);
        }
    }
    Ok(())
}

/// fast5 files under every input, deduplicated, in input order.
pub fn collect_fast5(inputs: &[PathBuf], recursive: bool) -> Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    for input in inputs {
        found.extend(find_files(input, FAST5_EXT, recursive)?);
    }
    Ok(found.into_iter().unique().collect())
}

/// Buffered writer to `out`, or stdout when no path is given.
pub fn output_writer(out: Option<&Path>) -> Result<Box<dyn Write>> {
    Ok(match out {
        Some(p) => {
            if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            Box::new(BufWriter::new(fs::File::create(p)?))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(p: &Path) {
        fs::write(p, b"").unwrap();
    }

    #[test]
    fn finds_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("sub/deeper")).unwrap();
        touch(&root.join("b.fast5"));
        touch(&root.join("a.fast5"));
        touch(&root.join("notes.txt"));
        touch(&root.join("sub/c.fast5"));
        touch(&root.join("sub/deeper/d.fast5"));

        let flat = find_files(root, ".fast5", false).unwrap();
        assert_eq!(flat, vec![root.join("a.fast5"), root.join("b.fast5")]);

        let deep = find_files(root, ".fast5", true).unwrap();
        assert_eq!(deep.len(), 4);
        assert!(deep.contains(&root.join("sub/deeper/d.fast5")));

        // a file path is checked against the extension only
        assert_eq!(find_files(&root.join("notes.txt"), ".fast5", true).unwrap(), Vec::<PathBuf>::new());
        assert_eq!(
            find_files(&root.join("a.fast5"), ".fast5", false).unwrap(),
            vec![root.join("a.fast5")]
        );

        let all = collect_fast5(&[root.to_path_buf(), root.join("a.fast5")], false).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn missing_path_is_an_error() {
        assert!(matches!(
            find_files(Path::new("/no/such/dir"), ".fast5", false),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn md5_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("x.txt");
        fs::write(&p, b"abc").unwrap();
        assert_eq!(md5_of_file(&p).unwrap(), "900150983cd24fb0d6963f7d28e17f72");
    }
}
