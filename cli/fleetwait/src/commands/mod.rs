//! CLI commands.

mod sorted;
mod wait;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fleet_converge::{ClusterDriver, Member, PollConfig, Poller};
use fleet_platform::{FleetctlDriver, PlatformConfig};
use tracing::debug;

use crate::config::Config;
use crate::output::OutputFormat;

/// fleetwait - Wait for a fleet cluster to converge.
#[derive(Debug, Parser)]
#[command(name = "fleetwait")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output format (table or json).
    #[arg(long, global = true, default_value = "table")]
    format: OutputFormat,

    /// Member endpoint to query.
    #[arg(long, global = true, env = "FLEET_ENDPOINT")]
    endpoint: Option<String>,

    /// Path to the fleetctl binary.
    #[arg(long, global = true, env = "FLEETCTL_BIN")]
    fleetctl: Option<PathBuf>,

    /// Seconds to wait before giving up.
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log more (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Wait until exactly N machines are listed.
    Machines(wait::CountArgs),

    /// Wait until exactly N units are loaded (or active).
    Units(wait::UnitsArgs),

    /// Wait until exactly N unit files are submitted.
    UnitFiles(wait::CountArgs),

    /// Wait until a listing holds exactly the given names.
    Exact(wait::ExactArgs),

    /// Check that a listing is in lexicographic order.
    Sorted(sorted::SortedArgs),

    /// Show CLI version.
    Version,
}

impl Cli {
    /// Default log filter when RUST_LOG is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }

    /// Run the CLI command.
    pub async fn run(self) -> Result<()> {
        if matches!(self.command, Commands::Version) {
            println!("fleetwait {}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }

        let config = Config::load()?;

        let mut platform = PlatformConfig::from_env()?;
        if let Some(endpoint) = self.endpoint.or(config.endpoint) {
            platform.endpoints = vec![endpoint];
        }
        if let Some(bin) = self.fleetctl.or(config.fleetctl) {
            platform.fleetctl_bin = bin;
        }

        let mut poll = PollConfig::from_env()?;
        if let Some(secs) = self.timeout.or(config.timeout_secs) {
            poll = poll.with_timeout(Duration::from_secs(secs));
        }

        let driver = Arc::new(FleetctlDriver::new(platform));
        let member = driver
            .create_member()
            .await
            .context("No fleet endpoint configured")?;
        debug!(member = %member, endpoint = member.endpoint(), "Using fleet member");

        let ctx = CommandContext {
            poller: Poller::new(driver, poll),
            member,
            format: self.format,
        };

        match self.command {
            Commands::Machines(args) => wait::machines(ctx, args).await,
            Commands::Units(args) => wait::units(ctx, args).await,
            Commands::UnitFiles(args) => wait::unit_files(ctx, args).await,
            Commands::Exact(args) => wait::exact(ctx, args).await,
            Commands::Sorted(args) => sorted::run(ctx, args).await,
            Commands::Version => Ok(()),
        }
    }
}

/// Shared command context.
pub struct CommandContext {
    pub poller: Poller,
    pub member: Member,
    pub format: OutputFormat,
}
