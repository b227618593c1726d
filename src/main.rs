mod cli;
mod invoke;
mod logging;
mod model;
mod selection;
mod text_summary;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    logging::init_logging(args.verbose);

    // Only failures before the build tool is spawned are errors. The build tool's own
    // exit code is reported by `run` and does not change ours.
    cli::run(args)
}
