use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("HDF5 error: {0}")]
    Hdf5(#[from] hdf5::Error),

    #[error("FASTA/FASTQ parse error: {0}")]
    Fastx(#[from] needletail::errors::ParseError),

    #[error("invalid motif pattern: {0}")]
    Motif(#[from] regex::Error),

    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("{} is neither a single-read nor a multi-read fast5 file", .0.display())]
    UnknownLayout(PathBuf),

    #[error("missing {what} in read {read}")]
    Missing { read: String, what: String },

    #[error("unsupported HDF5 string type for {0}")]
    NotAString(String),

    #[error("reference {} contains no sequences", .0.display())]
    EmptyReference(PathBuf),

    #[error("invalid CIGAR operation {0} for reference-to-query mapping")]
    InvalidCigarOp(char),

    #[error("malformed CIGAR string {0:?}")]
    MalformedCigar(String),

    #[error("malformed SAM line: {0}")]
    MalformedSam(String),

    #[error("invalid FASTQ: {0}")]
    InvalidFastq(String),

    #[error("invalid strand {0:?}")]
    InvalidStrand(String),

    #[error("minimap2 failed: {0}")]
    Minimap2(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_keep_their_message() {
        let e = fs_err::File::open("/no/such/batch0.fast5").unwrap_err();
        let msg = Error::from(e).to_string();
        assert!(msg.contains("batch0.fast5"), "{msg}");
    }
}
