//! ontkit: helpers for Oxford Nanopore fast5 data.
//! Entry point only; see `cli` and `subcommands/*`.

use anyhow::Result;
use ontkit::cli::Cli;
use ontkit::util::logging;

fn main() -> Result<()> {
    logging::init_logging();
    let cli = <Cli as clap::Parser>::parse();
    cli.run()
}
