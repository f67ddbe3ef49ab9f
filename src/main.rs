//! fsbulk CLI: walk, copy, remove and hash trees from the command line.

use clap::Parser;
use fsbulk::engine::{Cli, handle_run, resolve_opts};
use fsbulk::utils::{report_error, setup_logging};
use std::process;
use std::time::Instant;

fn main() {
    let start_time = Instant::now();
    let cli = Cli::parse();
    let opts = resolve_opts(&cli);
    setup_logging(opts.verbose);
    if let Err(e) = handle_run(&cli, &opts) {
        report_error(&e, opts.debug, start_time.elapsed());
        process::exit(1);
    }
    log::debug!("Total time: {:?}", start_time.elapsed());
}
