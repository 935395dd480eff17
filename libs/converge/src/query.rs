//! Listing queries.
//!
//! A query binds the arguments of a read-only `fleetctl` listing to the
//! parser for its output. All queries request `--no-legend --full` so the
//! output is one record per line with untruncated IDs.

use std::fmt;

use fleet_units::{parse, Keyed, MachineState, ParseError, Snapshot, UnitFileState, UnitState};

/// A read-only listing command and its parser.
pub trait Query: Send + Sync {
    /// Record type produced for each row.
    type Entry: Keyed + Clone + fmt::Debug + Send + Sync;

    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Arguments passed to the driver.
    fn args(&self) -> &'static [&'static str];

    /// Parse command output into a snapshot.
    fn parse(&self, stdout: &str) -> Result<Snapshot<Self::Entry>, ParseError>;
}

/// Machines that have joined the cluster.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListMachines;

impl Query for ListMachines {
    type Entry = MachineState;

    fn name(&self) -> &'static str {
        "list-machines"
    }

    fn args(&self) -> &'static [&'static str] {
        &[
            "list-machines",
            "--no-legend",
            "--full",
            "--fields",
            "machine,ip,metadata",
        ]
    }

    fn parse(&self, stdout: &str) -> Result<Snapshot<MachineState>, ParseError> {
        parse::parse_machines(stdout)
    }
}

const LIST_UNITS_ARGS: &[&str] = &[
    "list-units",
    "--no-legend",
    "--full",
    "--fields",
    "unit,load,active,sub,machine",
];

/// Units loaded on some machine, in any active state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListUnits;

impl Query for ListUnits {
    type Entry = UnitState;

    fn name(&self) -> &'static str {
        "list-units"
    }

    fn args(&self) -> &'static [&'static str] {
        LIST_UNITS_ARGS
    }

    fn parse(&self, stdout: &str) -> Result<Snapshot<UnitState>, ParseError> {
        parse::parse_units(stdout)
    }
}

/// Units whose active state is `active`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListActiveUnits;

impl Query for ListActiveUnits {
    type Entry = UnitState;

    fn name(&self) -> &'static str {
        "list-units (active)"
    }

    fn args(&self) -> &'static [&'static str] {
        LIST_UNITS_ARGS
    }

    fn parse(&self, stdout: &str) -> Result<Snapshot<UnitState>, ParseError> {
        Ok(parse::parse_units(stdout)?.filter(UnitState::is_active))
    }
}

/// Unit files known to the registry, scheduled or not.
#[derive(Debug, Clone, Copy, Default)]
pub struct ListUnitFiles;

impl Query for ListUnitFiles {
    type Entry = UnitFileState;

    fn name(&self) -> &'static str {
        "list-unit-files"
    }

    fn args(&self) -> &'static [&'static str] {
        &[
            "list-unit-files",
            "--no-legend",
            "--full",
            "--fields",
            "unit,dstate,state,tmachine",
        ]
    }

    fn parse(&self, stdout: &str) -> Result<Snapshot<UnitFileState>, ParseError> {
        parse::parse_unit_files(stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_filter() {
        let stdout = "\
a.service loaded active running m1
b.service loaded activating start-pre m1
c.service loaded failed failed m2
";
        let all = ListUnits.parse(stdout).unwrap();
        let active = ListActiveUnits.parse(stdout).unwrap();

        assert_eq!(all.len(), 3);
        assert_eq!(active.len(), 1);
        assert!(active.contains_key("a.service"));
    }

    #[test]
    fn test_args_request_machine_readable_output() {
        for args in [
            ListMachines.args(),
            ListUnits.args(),
            ListActiveUnits.args(),
            ListUnitFiles.args(),
        ] {
            assert!(args.contains(&"--no-legend"));
            assert!(args.contains(&"--full"));
        }
    }
}
