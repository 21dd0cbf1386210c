use needletail::errors::ParseErrorKind;
use needletail::{parse_fastx_file, FastxReader};
use std::path::Path;

use crate::error::{Error, Result};

/// Opens a FASTA/FASTQ (optionally compressed); `None` for an empty file.
pub(crate) fn open_fastx(p: &Path) -> Result<Option<Box<dyn FastxReader>>> {
    if !p.exists() {
        return Err(Error::NotFound(p.to_path_buf()));
    }
    match parse_fastx_file(p) {
        Ok(rdr) => Ok(Some(rdr)),
        Err(e) if matches!(e.kind, ParseErrorKind::EmptyFile) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Checks file exists, is readable, and looks like FASTA by reading first record.
pub fn validate_fasta(p: &Path) -> Result<()> {
    let Some(mut rdr) = open_fastx(p)? else {
        return Err(Error::EmptyReference(p.to_path_buf()));
    };
    let _ = rdr.next().transpose()?;
    Ok(())
}

/// Contig names and lengths (bp), in file order.
pub fn contig_lengths(p: &Path) -> Result<Vec<(String, u64)>> {
    let mut out = Vec::new();
    let Some(mut rdr) = open_fastx(p)? else {
        return Ok(out);
    };
    while let Some(rec) = rdr.next().transpose()? {
        let id = String::from_utf8_lossy(rec.id()).to_string();
        let len = rec.seq().len() as u64;
        out.push((id, len));
    }
    Ok(out)
}

/// Record names up to the first whitespace, as minimap2 reports them.
pub fn contig_names(p: &Path) -> Result<Vec<String>> {
    Ok(contig_lengths(p)?
        .into_iter()
        .map(|(id, _)| short_name(&id).to_string())
        .collect())
}

pub fn short_name(id: &str) -> &str {
    id.split_whitespace().next().unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn lengths_ok() {
        let mut f = NamedTempFile::new().unwrap();
        writeln!(f, ">c1 desc\nAAAAAA\n>c2\nACGTA\nCGTAC\n>c3\nA\n").unwrap();
        let v = contig_lengths(f.path()).unwrap();
        assert_eq!(
            v,
            vec![
                ("c1 desc".to_string(), 6),
                ("c2".to_string(), 10),
                ("c3".to_string(), 1)
            ]
        );
        assert_eq!(contig_names(f.path()).unwrap(), vec!["c1", "c2", "c3"]);
    }

    #[test]
    fn empty_and_missing() {
        let f = NamedTempFile::new().unwrap();
        assert!(contig_lengths(f.path()).unwrap().is_empty());
        assert!(matches!(validate_fasta(f.path()), Err(Error::EmptyReference(_))));
        assert!(matches!(
            validate_fasta(Path::new("/no/such.fa")),
            Err(Error::NotFound(_))
        ));
    }
}
