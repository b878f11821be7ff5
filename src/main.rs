//! archgate - Architecture conformance checking CLI
//!
//! Checks a static dependency graph against a declared target architecture
//! and exits non-zero when the run fails under the chosen policy.

use anyhow::Result;
use archgate::cli;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // RUST_LOG wins over --log-level / --debug
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.effective_log_level()));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    if !cli::run(cli)? {
        std::process::exit(1);
    }
    Ok(())
}
