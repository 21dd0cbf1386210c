pub mod alignment;
pub mod cli;
pub mod error;
pub mod eventalign;
pub mod model;
pub mod motif;
pub mod signal;
pub mod summary;
pub mod tombo;

pub mod io {
    pub mod fast5;
    pub mod fasta;
    pub mod files;
    pub mod sam;
}

pub mod util {
    pub mod logging;
    pub mod mapping;
}

pub mod subcommands {
    pub mod eventalign;
    pub mod fastq;
    pub mod index;
    pub mod motifs;
    pub mod reads;
    pub mod syscheck;
    pub mod tombo;
}

pub use error::{Error, Result};
