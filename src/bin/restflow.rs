//! `restflow` command-line entry point.
//!
//! Logs go to stderr; command output goes to stdout.

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;
use rest_flow::cli::Cli;
use rest_flow::commands;

fn init_logging(verbosity: u8) {
    let mut builder = env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("warn"),
    );

    // -v flags win over RUST_LOG
    let level = match verbosity {
        0 => None,
        1 => Some(LevelFilter::Info),
        2 => Some(LevelFilter::Debug),
        _ => Some(LevelFilter::Trace),
    };
    if let Some(level) = level {
        builder.filter_level(level);
    }

    builder.format_timestamp(None).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = commands::run(cli)?;
    print!("{}", output);
    Ok(())
}
