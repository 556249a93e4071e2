//! `mixtype`: render multi-script text from the command line

use anyhow::Result;
use clap::Parser;
use mixtype_cli::cli::Cli;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logger(cli.verbose);
    mixtype_cli::run(&cli)
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}
