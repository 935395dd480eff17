//! State records for units, unit files and machines.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::Keyed;

/// Active state reported for a running unit.
pub const ACTIVE: &str = "active";

/// Load state reported for a unit loaded on a machine.
pub const LOADED: &str = "loaded";

/// Observed state of a single unit.
///
/// `list-units` prints one row per machine a unit runs on, so a global unit
/// is folded into one entry listing every machine. The states are those of
/// the least converged instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    /// Unit name, e.g. `hello.service`.
    pub name: String,

    /// systemd load state (`loaded`, `not-found`, ...).
    pub load_state: String,

    /// systemd active state (`active`, `inactive`, `failed`, ...).
    pub active_state: String,

    /// systemd sub state (`running`, `dead`, ...).
    pub sub_state: String,

    /// Machines the unit is scheduled on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub machines: Vec<String>,
}

impl UnitState {
    /// Returns true if the unit reports an `active` active state.
    pub fn is_active(&self) -> bool {
        self.active_state == ACTIVE
    }

    /// Returns true if the unit reports a `loaded` load state.
    pub fn is_loaded(&self) -> bool {
        self.load_state == LOADED
    }

    /// First machine the unit is scheduled on.
    pub fn machine(&self) -> Option<&str> {
        self.machines.first().map(String::as_str)
    }

    /// Fold another instance of the same unit into this entry.
    pub(crate) fn merge(&mut self, other: UnitState) {
        if self.is_loaded() && !other.is_loaded() {
            self.load_state = other.load_state.clone();
        }
        if self.is_active() && !other.is_active() {
            self.active_state = other.active_state;
            self.sub_state = other.sub_state;
        }
        self.machines.extend(other.machines);
    }
}

impl Keyed for UnitState {
    fn key(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}/{}/{}",
            self.name, self.load_state, self.active_state, self.sub_state
        )?;
        if !self.machines.is_empty() {
            write!(f, " on {}", self.machines.join(","))?;
        }
        Ok(())
    }
}

/// Observed state of a submitted unit file (one row of `list-unit-files`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFileState {
    /// Unit name.
    pub name: String,

    /// Desired state recorded in the registry (`inactive`, `loaded`, `launched`).
    pub desired_state: String,

    /// Current state reported by the agents.
    pub state: String,

    /// Machine the unit is targeted at, if scheduled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_machine: Option<String>,
}

impl UnitFileState {
    /// Returns true once the current state has caught up with the desired state.
    pub fn is_settled(&self) -> bool {
        self.desired_state == self.state
    }
}

impl Keyed for UnitFileState {
    fn key(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for UnitFileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}->{}", self.name, self.state, self.desired_state)
    }
}

/// Observed state of a cluster machine (one row of `list-machines`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineState {
    /// Machine ID.
    pub id: String,

    /// Public IP, if reported.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    /// Machine metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,
}

impl Keyed for MachineState {
    fn key(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        if let Some(ip) = &self.ip {
            write!(f, " ({})", ip)?;
        }
        Ok(())
    }
}
