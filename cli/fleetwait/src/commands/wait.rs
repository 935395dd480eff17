//! Wait commands.

use anyhow::Result;
use clap::{Args, ValueEnum};
use fleet_converge::query::{ListActiveUnits, ListUnitFiles, ListUnits};
use fleet_converge::units::{MachineState, UnitFileState, UnitState};
use serde::Serialize;
use tabled::Tabled;

use crate::error::CliError;
use crate::output::{print_output, print_success};

use super::CommandContext;

#[derive(Debug, Args)]
pub struct CountArgs {
    /// Number of entries to wait for.
    count: usize,
}

#[derive(Debug, Args)]
pub struct UnitsArgs {
    /// Number of units to wait for.
    count: usize,

    /// Count only units whose active state is `active`.
    #[arg(long)]
    active: bool,
}

/// Listing compared by `exact`.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Listing {
    /// Loaded units.
    Units,
    /// Active units.
    Active,
    /// Submitted unit files.
    UnitFiles,
}

#[derive(Debug, Args)]
pub struct ExactArgs {
    /// Listing to compare.
    #[arg(value_enum)]
    listing: Listing,

    /// Expected names. None means the listing must be empty.
    names: Vec<String>,
}

#[derive(Debug, Serialize, Tabled)]
struct MachineRow {
    #[tabled(rename = "Machine")]
    machine: String,

    #[tabled(rename = "IP")]
    ip: String,

    #[tabled(rename = "Metadata")]
    metadata: String,
}

impl From<&MachineState> for MachineRow {
    fn from(m: &MachineState) -> Self {
        let metadata = m
            .metadata
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            machine: m.id.clone(),
            ip: display_option(&m.ip),
            metadata: if metadata.is_empty() { "-".to_string() } else { metadata },
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct UnitRow {
    #[tabled(rename = "Unit")]
    unit: String,

    #[tabled(rename = "Load")]
    load: String,

    #[tabled(rename = "Active")]
    active: String,

    #[tabled(rename = "Sub")]
    sub: String,

    #[tabled(rename = "Machine")]
    machine: String,
}

impl From<&UnitState> for UnitRow {
    fn from(u: &UnitState) -> Self {
        Self {
            unit: u.name.clone(),
            load: u.load_state.clone(),
            active: u.active_state.clone(),
            sub: u.sub_state.clone(),
            machine: display_list(&u.machines),
        }
    }
}

#[derive(Debug, Serialize, Tabled)]
struct UnitFileRow {
    #[tabled(rename = "Unit")]
    unit: String,

    #[tabled(rename = "Desired")]
    desired: String,

    #[tabled(rename = "State")]
    state: String,

    #[tabled(rename = "Machine")]
    machine: String,
}

impl From<&UnitFileState> for UnitFileRow {
    fn from(u: &UnitFileState) -> Self {
        Self {
            unit: u.name.clone(),
            desired: u.desired_state.clone(),
            state: u.state.clone(),
            machine: display_option(&u.target_machine),
        }
    }
}

fn display_option(opt: &Option<String>) -> String {
    opt.as_deref().unwrap_or("-").to_string()
}

fn display_list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(",")
    }
}

/// Wait for a machine count.
pub async fn machines(ctx: CommandContext, args: CountArgs) -> Result<()> {
    let snapshot = ctx
        .poller
        .wait_for_machines(&ctx.member, args.count)
        .await
        .map_err(CliError::from)?;

    print_success(&format!("{} machines", snapshot.len()), ctx.format);
    let rows: Vec<MachineRow> = snapshot.iter().map(MachineRow::from).collect();
    print_output(&rows, ctx.format);
    Ok(())
}

/// Wait for a loaded or active unit count.
pub async fn units(ctx: CommandContext, args: UnitsArgs) -> Result<()> {
    let result = if args.active {
        ctx.poller.wait_for_active_units(&ctx.member, args.count).await
    } else {
        ctx.poller.wait_for_units(&ctx.member, args.count).await
    };
    let snapshot = result.map_err(CliError::from)?;

    print_success(&format!("{} units", snapshot.len()), ctx.format);
    let rows: Vec<UnitRow> = snapshot.iter().map(UnitRow::from).collect();
    print_output(&rows, ctx.format);
    Ok(())
}

/// Wait for a unit file count.
pub async fn unit_files(ctx: CommandContext, args: CountArgs) -> Result<()> {
    let snapshot = ctx
        .poller
        .wait_for_unit_files(&ctx.member, args.count)
        .await
        .map_err(CliError::from)?;

    print_success(&format!("{} unit files", snapshot.len()), ctx.format);
    let rows: Vec<UnitFileRow> = snapshot.iter().map(UnitFileRow::from).collect();
    print_output(&rows, ctx.format);
    Ok(())
}

/// Wait for an exact set of names.
pub async fn exact(ctx: CommandContext, args: ExactArgs) -> Result<()> {
    let timeout = ctx.poller.config().timeout;
    let (poller, member) = (&ctx.poller, &ctx.member);
    let names = args.names;

    match args.listing {
        Listing::Units => {
            let snapshot = poller
                .await_exact_membership(member, &ListUnits, names, timeout)
                .await
                .map_err(CliError::from)?;
            print_success(&format!("{} units", snapshot.len()), ctx.format);
            let rows: Vec<UnitRow> = snapshot.iter().map(UnitRow::from).collect();
            print_output(&rows, ctx.format);
        }
        Listing::Active => {
            let snapshot = poller
                .await_exact_membership(member, &ListActiveUnits, names, timeout)
                .await
                .map_err(CliError::from)?;
            print_success(&format!("{} active units", snapshot.len()), ctx.format);
            let rows: Vec<UnitRow> = snapshot.iter().map(UnitRow::from).collect();
            print_output(&rows, ctx.format);
        }
        Listing::UnitFiles => {
            let snapshot = poller
                .await_exact_membership(member, &ListUnitFiles, names, timeout)
                .await
                .map_err(CliError::from)?;
            print_success(&format!("{} unit files", snapshot.len()), ctx.format);
            let rows: Vec<UnitFileRow> = snapshot.iter().map(UnitFileRow::from).collect();
            print_output(&rows, ctx.format);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_machine_row_metadata() {
        let machine = MachineState {
            id: "abc".to_string(),
            ip: None,
            metadata: BTreeMap::from([
                ("region".to_string(), "us-east".to_string()),
                ("disk".to_string(), "ssd".to_string()),
            ]),
        };

        let row = MachineRow::from(&machine);
        assert_eq!(row.ip, "-");
        assert_eq!(row.metadata, "disk=ssd,region=us-east");
    }
}
