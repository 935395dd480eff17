//! fleetwait - block until a fleet cluster reaches a given state.
//!
//! Shell scripts that drive `fleetctl` use this to wait for listings to
//! settle instead of sleeping a fixed amount.

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;
mod config;
mod error;
mod output;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine readable.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| cli.log_level().into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = cli.run().await {
        error::print_error(&e);
        std::process::exit(1);
    }

    Ok(())
}
