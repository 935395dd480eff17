//! Ordering check.

use anyhow::Result;
use clap::Args;
use fleet_converge::check_sorted;
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_success};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct SortedArgs {
    /// Check `list-units` instead of `list-unit-files`.
    #[arg(long)]
    units: bool,
}

impl SortedArgs {
    fn listing(&self) -> [&'static str; 4] {
        let command = if self.units { "list-units" } else { "list-unit-files" };
        [command, "--no-legend", "--fields", "unit"]
    }
}

#[derive(Debug, Serialize, Tabled)]
struct NameRow {
    #[tabled(rename = "Unit")]
    unit: String,
}

/// List once and fail if names are out of order.
pub async fn run(ctx: CommandContext, args: SortedArgs) -> Result<()> {
    let names = ctx
        .poller
        .list_names(&ctx.member, &args.listing())
        .await
        .map_err(CliError::from)?;

    check_sorted(&names).map_err(CliError::from)?;

    print_success(&format!("{} names in order", names.len()), ctx.format);
    let rows: Vec<NameRow> = names.into_iter().map(|unit| NameRow { unit }).collect();
    print_output(&rows, ctx.format);
    Ok(())
}
