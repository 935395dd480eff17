//! Parsers for `fleetctl` tabular listings.
//!
//! All parsers expect `--no-legend --full` output with the column set named
//! in each function. Columns are whitespace separated; a `-` column means the
//! value is absent. Blank lines are skipped, so empty output parses into an
//! empty snapshot rather than an error.

use std::collections::BTreeMap;

use crate::error::ParseError;
use crate::snapshot::Snapshot;
use crate::types::{MachineState, UnitFileState, UnitState};

/// Marker fleetctl prints for an empty column.
const ABSENT: &str = "-";

/// Parse `list-units --fields unit,load,active,sub,machine`.
///
/// Rows repeating a unit name are instances on other machines and are folded
/// into one entry.
pub fn parse_units(stdout: &str) -> Result<Snapshot<UnitState>, ParseError> {
    let mut units: BTreeMap<String, UnitState> = BTreeMap::new();

    for (line, cols) in rows(stdout) {
        let [name, load, active, sub, machine] = columns::<5>(line, &cols)?;
        let unit = UnitState {
            name: name.to_string(),
            load_state: load.to_string(),
            active_state: active.to_string(),
            sub_state: sub.to_string(),
            machines: machine_id(machine).into_iter().collect(),
        };

        match units.get_mut(name) {
            Some(existing) => existing.merge(unit),
            None => {
                units.insert(name.to_string(), unit);
            }
        }
    }

    Snapshot::from_entries(units.into_values())
}

/// Parse `list-unit-files --fields unit,dstate,state,tmachine`.
pub fn parse_unit_files(stdout: &str) -> Result<Snapshot<UnitFileState>, ParseError> {
    let rows = rows(stdout)
        .map(|(line, cols)| {
            let [name, dstate, state, tmachine] = columns::<4>(line, &cols)?;
            Ok(UnitFileState {
                name: name.to_string(),
                desired_state: dstate.to_string(),
                state: state.to_string(),
                target_machine: machine_id(tmachine),
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Snapshot::from_entries(rows)
}

/// Parse `list-machines --fields machine,ip,metadata`.
///
/// Metadata is a comma separated list of `key=value` pairs.
pub fn parse_machines(stdout: &str) -> Result<Snapshot<MachineState>, ParseError> {
    let rows = rows(stdout)
        .map(|(line, cols)| {
            let [id, ip, metadata] = columns::<3>(line, &cols)?;
            Ok(MachineState {
                id: id.to_string(),
                ip: optional(ip),
                metadata: parse_metadata(line, metadata)?,
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Snapshot::from_entries(rows)
}

/// First column of every non-blank line, in output order.
///
/// Used for listings whose order is itself under test.
pub fn parse_names(stdout: &str) -> Vec<String> {
    rows(stdout)
        .filter_map(|(_, cols)| cols.first().map(|c| c.to_string()))
        .collect()
}

/// Non-blank lines with their 1-based line numbers, split into columns.
fn rows(stdout: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    stdout
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.split_whitespace().collect::<Vec<_>>()))
        .filter(|(_, cols)| !cols.is_empty())
}

fn columns<'a, const N: usize>(line: usize, cols: &[&'a str]) -> Result<[&'a str; N], ParseError> {
    <[&str; N]>::try_from(cols).map_err(|_| ParseError::MalformedRow {
        line,
        expected: N,
        found: cols.len(),
        content: cols.join(" "),
    })
}

fn optional(value: &str) -> Option<String> {
    if value == ABSENT {
        None
    } else {
        Some(value.to_string())
    }
}

/// `--full` renders machines as `ID/IP`; only the ID identifies the machine.
fn machine_id(value: &str) -> Option<String> {
    optional(value).map(|m| match m.split_once('/') {
        Some((id, _)) => id.to_string(),
        None => m,
    })
}

fn parse_metadata(line: usize, value: &str) -> Result<BTreeMap<String, String>, ParseError> {
    if value == ABSENT {
        return Ok(BTreeMap::new());
    }

    value
        .split(',')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| ParseError::InvalidMetadata {
                    line,
                    pair: pair.to_string(),
                })
        })
        .collect()
}
