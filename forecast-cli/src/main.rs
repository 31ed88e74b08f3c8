//! Binary crate for the `forecast-snapshot` command-line tool.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and merging them over the config file
//! - Logging setup
//! - Printing where the snapshot landed

use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    setup_tracing(cmd.verbose);
    cmd.run().await
}

fn setup_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
