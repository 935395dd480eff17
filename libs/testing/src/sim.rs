//! In-memory fleet cluster.
//!
//! The registry (what `cat` reads) is updated as soon as a command returns,
//! but listings only reflect a change once the propagation lag has passed,
//! the same split a real cluster shows between its registry and its agents.
//! Time is read from `tokio::time`, so paused-clock tests are deterministic.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use fleet_converge::{ClusterDriver, CommandOutput, DriverError, Member};
use tokio::time::Instant;
use tracing::debug;

/// Simulation settings.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Prefix for member names.
    pub cluster_name: String,

    /// Delay between a unit mutation and its appearance in listings.
    pub propagation_lag: Duration,

    /// Delay between member creation and its machine being listed.
    pub join_lag: Duration,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            cluster_name: "smoke".to_string(),
            propagation_lag: Duration::from_millis(500),
            join_lag: Duration::from_millis(200),
        }
    }
}

/// Target state of a unit in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum TargetState {
    Inactive,
    Loaded,
    Launched,
}

impl TargetState {
    fn as_str(self) -> &'static str {
        match self {
            TargetState::Inactive => "inactive",
            TargetState::Loaded => "loaded",
            TargetState::Launched => "launched",
        }
    }
}

#[derive(Debug)]
struct Machine {
    id: String,
    ip: String,
    joined_at: Instant,
    destroyed: bool,
}

#[derive(Debug, Default)]
struct Unit {
    body: String,

    /// Member the unit is scheduled on.
    machine: Option<String>,

    /// State listings report.
    observed: Option<TargetState>,

    /// State the registry holds, and when listings will catch up.
    pending: Option<(Option<TargetState>, Instant)>,
}

impl Unit {
    fn desired(&self) -> Option<TargetState> {
        match self.pending {
            Some((state, _)) => state,
            None => self.observed,
        }
    }

    fn transition(&mut self, next: Option<TargetState>, visible_at: Instant) {
        self.pending = Some((next, visible_at));
    }

    fn settle(&mut self, now: Instant) {
        if let Some((state, at)) = self.pending {
            if at <= now {
                self.observed = state;
                self.pending = None;
            }
        }
    }

    fn is_gone(&self) -> bool {
        self.observed.is_none() && self.pending.is_none()
    }
}

#[derive(Debug, Default)]
struct State {
    next_member: usize,
    machines: BTreeMap<String, Machine>,
    units: BTreeMap<String, Unit>,
    failing_queries: u32,
}

impl State {
    fn settle(&mut self, now: Instant) {
        for unit in self.units.values_mut() {
            unit.settle(now);
        }
        self.units.retain(|_, unit| !unit.is_gone());
    }

    fn first_live_member(&self) -> Option<String> {
        self.machines
            .iter()
            .find(|(_, m)| !m.destroyed)
            .map(|(name, _)| name.clone())
    }

    fn machine_column(&self, member: Option<&String>, full: bool) -> String {
        let Some(machine) = member.and_then(|name| self.machines.get(name)) else {
            return "-".to_string();
        };
        format!("{}/{}", display_id(&machine.id, full), machine.ip)
    }

    fn live_unit(&self, name: &str) -> Option<&Unit> {
        self.units.get(name).filter(|u| u.desired().is_some())
    }
}

/// In-memory cluster implementing [`ClusterDriver`].
pub struct SimulatedCluster {
    config: SimConfig,
    state: Mutex<State>,
}

impl SimulatedCluster {
    /// Create a simulated cluster.
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
        }
    }

    /// Make the next `n` listing commands fail as if the registry timed out.
    pub fn fail_next_queries(&self, n: u32) {
        self.state().failing_queries = n;
    }

    /// Names of units in the registry, regardless of listing lag.
    pub fn registry_units(&self) -> Vec<String> {
        self.state()
            .units
            .iter()
            .filter(|(_, u)| u.desired().is_some())
            .map(|(name, _)| name.clone())
            .collect()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_member(&self, member: &Member) -> Result<(), DriverError> {
        match self.state().machines.get(member.name()) {
            None => Err(DriverError::UnknownMember(member.name().to_string())),
            Some(m) if m.destroyed => Err(DriverError::MemberDestroyed(member.name().to_string())),
            Some(_) => Ok(()),
        }
    }

    fn launch(
        &self,
        command: &str,
        units: Vec<(String, Option<String>)>,
        replace: bool,
    ) -> Result<CommandOutput, DriverError> {
        let target = match command {
            "submit" => TargetState::Inactive,
            "load" => TargetState::Loaded,
            _ => TargetState::Launched,
        };
        let now = Instant::now();
        let visible_at = now + self.config.propagation_lag;
        let mut state = self.state();
        state.settle(now);

        // Validate everything first so a failing batch changes nothing.
        for (name, body) in &units {
            match (state.live_unit(name), body) {
                (None, None) => {
                    return Err(failed(format!("Error: unable to find unit file for {name}")));
                }
                (Some(existing), Some(body)) if existing.body != *body && !replace => {
                    return Err(failed(format!(
                        "Error: unit {name} already exists with different contents, use --replace"
                    )));
                }
                _ => {}
            }
        }

        let machine = state.first_live_member();
        let mut stdout = String::new();

        for (name, body) in units {
            let unit = state.units.entry(name.clone()).or_default();
            let current = unit.desired();

            let mut changed = false;
            if let Some(body) = body {
                if current.is_none() || unit.body != body {
                    unit.body = body;
                    changed = true;
                }
            }

            let next = current.unwrap_or(TargetState::Inactive).max(target);
            if Some(next) != current {
                changed = true;
            }

            if next >= TargetState::Loaded && unit.machine.is_none() {
                unit.machine = machine.clone();
            } else if next == TargetState::Inactive {
                unit.machine = None;
            }

            if changed {
                unit.transition(Some(next), visible_at);
            }

            let placed = unit.machine.clone();
            let line = match next {
                TargetState::Inactive => format!("Unit {name} inactive\n"),
                _ => format!(
                    "Unit {name} {} on {}\n",
                    next.as_str(),
                    state.machine_column(placed.as_ref(), true)
                ),
            };
            stdout.push_str(&line);
        }

        Ok(CommandOutput::new(stdout, ""))
    }

    fn teardown(&self, command: &str, operands: &[&str]) -> Result<CommandOutput, DriverError> {
        let now = Instant::now();
        let visible_at = now + self.config.propagation_lag;
        let mut state = self.state();
        state.settle(now);

        let mut stdout = String::new();
        let mut stderr = String::new();

        for operand in operands {
            let name = unit_name(operand);
            let Some(unit) = state.units.get_mut(&name).filter(|u| u.desired().is_some()) else {
                stderr.push_str(&format!("Unit {name} does not exist\n"));
                continue;
            };
            let current = unit.desired();

            let next = match command {
                "destroy" => None,
                "unload" => current.map(|s| s.min(TargetState::Inactive)),
                _ => current.map(|s| s.min(TargetState::Loaded)),
            };

            if next != current {
                if next.is_none_or(|s| s == TargetState::Inactive) {
                    unit.machine = None;
                }
                unit.transition(next, visible_at);
            }

            match next {
                None => stdout.push_str(&format!("Destroyed {name}\n")),
                Some(s) => stdout.push_str(&format!("Unit {name} {}\n", s.as_str())),
            }
        }

        Ok(CommandOutput::new(stdout, stderr))
    }

    fn cat(&self, operands: &[&str]) -> Result<CommandOutput, DriverError> {
        let [operand] = operands else {
            return Err(failed("Error: one unit file must be provided"));
        };
        let name = unit_name(operand);
        let state = self.state();

        state
            .live_unit(&name)
            .map(|u| CommandOutput::new(u.body.clone(), ""))
            .ok_or_else(|| failed(format!("Unit {name} not found")))
    }

    fn status(&self, operands: &[&str]) -> Result<CommandOutput, DriverError> {
        let mut state = self.state();
        state.settle(Instant::now());

        let mut stdout = String::new();
        for operand in operands {
            let name = unit_name(operand);
            let (active, sub) = match state.units.get(&name).and_then(|u| u.observed) {
                Some(TargetState::Launched) => ("active", "running"),
                Some(TargetState::Loaded) => ("inactive", "dead"),
                _ => {
                    return Err(failed(format!(
                        "Unit {name} does not appear to be running."
                    )));
                }
            };
            stdout.push_str(&format!(
                "● {name}\n   Loaded: loaded (/run/fleet/units/{name}; linked-runtime)\n   Active: {active} ({sub})\n"
            ));
        }

        Ok(CommandOutput::new(stdout, ""))
    }

    fn list(&self, inv: &Invocation<'_>) -> Result<CommandOutput, DriverError> {
        let now = Instant::now();
        let mut state = self.state();

        if state.failing_queries > 0 {
            state.failing_queries -= 1;
            return Err(failed(
                "Error retrieving list of units from repository: context deadline exceeded",
            ));
        }
        state.settle(now);

        let full = inv.has_flag("--full");
        let default_fields = match inv.command {
            "list-units" => "unit,machine,active,sub",
            "list-unit-files" => "unit,dstate,state,tmachine",
            _ => "machine,ip,metadata",
        };
        let fields: Vec<&str> = inv.fields.unwrap_or(default_fields).split(',').collect();

        let mut rows: Vec<Vec<String>> = Vec::new();
        match inv.command {
            "list-machines" => {
                for machine in state
                    .machines
                    .values()
                    .filter(|m| !m.destroyed && m.joined_at <= now)
                {
                    rows.push(
                        fields
                            .iter()
                            .map(|f| machine_field(machine, f, full))
                            .collect::<Result<_, _>>()?,
                    );
                }
            }
            command => {
                let files = command == "list-unit-files";
                for (name, unit) in &state.units {
                    let Some(observed) = unit.observed else {
                        continue;
                    };
                    if !files && observed < TargetState::Loaded {
                        continue;
                    }
                    rows.push(
                        fields
                            .iter()
                            .map(|f| unit_field(&state, name, unit, observed, f, full))
                            .collect::<Result<_, _>>()?,
                    );
                }
            }
        }

        let mut stdout = String::new();
        if !inv.has_flag("--no-legend") {
            let legend: Vec<String> = fields.iter().map(|f| f.to_uppercase()).collect();
            stdout.push_str(&legend.join("\t"));
            stdout.push('\n');
        }
        for row in rows {
            stdout.push_str(&row.join("\t"));
            stdout.push('\n');
        }

        Ok(CommandOutput::new(stdout, ""))
    }
}

impl Default for SimulatedCluster {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

#[async_trait]
impl ClusterDriver for SimulatedCluster {
    async fn create_member(&self) -> Result<Member, DriverError> {
        let mut state = self.state();
        let n = state.next_member;
        state.next_member += 1;

        let name = format!("{}{}", self.config.cluster_name, n);
        let machine = Machine {
            id: format!("{:016x}{:016x}", 0x5eed_f1ee_7000_0000_u64 + n as u64, n as u64),
            ip: format!("172.18.1.{}", n + 1),
            joined_at: Instant::now() + self.config.join_lag,
            destroyed: false,
        };

        debug!(member = %name, machine_id = %machine.id, "[SIM] Member created");
        state.machines.insert(name.clone(), machine);

        Ok(Member::new(name.clone(), format!("sim://{name}")))
    }

    async fn destroy_member(&self, member: &Member) -> Result<(), DriverError> {
        let mut state = self.state();
        match state.machines.get_mut(member.name()) {
            None => Err(DriverError::UnknownMember(member.name().to_string())),
            Some(m) if m.destroyed => Err(DriverError::MemberDestroyed(member.name().to_string())),
            Some(m) => {
                m.destroyed = true;
                debug!(member = %member, "[SIM] Member destroyed");
                Ok(())
            }
        }
    }

    async fn run_command(
        &self,
        member: &Member,
        args: &[&str],
    ) -> Result<CommandOutput, DriverError> {
        self.check_member(member)?;
        let inv = Invocation::parse(args)?;
        debug!(member = %member, command = inv.command, operands = ?inv.operands, "[SIM] fleetctl");

        match inv.command {
            "submit" | "load" | "start" => {
                let units = self.read_units(&inv.operands)?;
                self.launch(inv.command, units, inv.has_flag("--replace"))
            }
            "destroy" | "unload" | "stop" => self.teardown(inv.command, &inv.operands),
            "cat" => self.cat(&inv.operands),
            "status" => self.status(&inv.operands),
            "list-units" | "list-unit-files" | "list-machines" => self.list(&inv),
            other => Err(failed(format!("Error: unknown command {other:?}"))),
        }
    }
}

impl SimulatedCluster {
    /// Read unit bodies; `None` means the name must already be in the registry.
    fn read_units(&self, operands: &[&str]) -> Result<Vec<(String, Option<String>)>, DriverError> {
        if operands.is_empty() {
            return Err(failed("Error: at least one unit file must be provided"));
        }

        Ok(operands
            .iter()
            .map(|operand| (unit_name(operand), read_unit_body(Path::new(operand))))
            .collect())
    }
}

/// Parsed `fleetctl` arguments.
#[derive(Debug)]
struct Invocation<'a> {
    command: &'a str,
    flags: Vec<&'a str>,
    fields: Option<&'a str>,
    operands: Vec<&'a str>,
}

impl<'a> Invocation<'a> {
    /// Global flags (`--x` before the command) are accepted and ignored.
    fn parse(args: &[&'a str]) -> Result<Self, DriverError> {
        let mut iter = args.iter().copied().skip_while(|a| a.starts_with("--"));
        let command = iter.next().ok_or_else(|| failed("Error: no command given"))?;

        let mut inv = Invocation {
            command,
            flags: Vec::new(),
            fields: None,
            operands: Vec::new(),
        };

        while let Some(arg) = iter.next() {
            if arg == "--fields" {
                inv.fields = Some(iter.next().ok_or_else(|| failed("Error: --fields needs a value"))?);
            } else if let Some(value) = arg.strip_prefix("--fields=") {
                inv.fields = Some(value);
            } else if arg.starts_with("--") {
                inv.flags.push(arg);
            } else {
                inv.operands.push(arg);
            }
        }

        Ok(inv)
    }

    fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(&flag)
    }
}

fn failed(message: impl Into<String>) -> DriverError {
    DriverError::command_failed(Some(1), "", message)
}

/// Unit names are the file name of whatever path was given.
fn unit_name(operand: &str) -> String {
    Path::new(operand)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(operand)
        .to_string()
}

/// Read a unit file, falling back to its `name@.service` template.
fn read_unit_body(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .or_else(|| template_path(path).and_then(|t| std::fs::read_to_string(t).ok()))
}

/// `dir/hello@3.service` -> `dir/hello@.service`.
fn template_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let at = name.find('@')?;
    let dot = name.rfind('.')?;
    if dot <= at + 1 {
        return None;
    }
    Some(path.with_file_name(format!("{}{}", &name[..=at], &name[dot..])))
}

fn display_id(id: &str, full: bool) -> String {
    if full {
        id.to_string()
    } else {
        format!("{}...", &id[..8.min(id.len())])
    }
}

fn machine_field(machine: &Machine, field: &str, full: bool) -> Result<String, DriverError> {
    Ok(match field {
        "machine" => display_id(&machine.id, full),
        "ip" => machine.ip.clone(),
        "metadata" => "-".to_string(),
        other => return Err(failed(format!("Error: invalid field {other:?}"))),
    })
}

fn unit_field(
    state: &State,
    name: &str,
    unit: &Unit,
    observed: TargetState,
    field: &str,
    full: bool,
) -> Result<String, DriverError> {
    let running = observed == TargetState::Launched;
    Ok(match field {
        "unit" => name.to_string(),
        "load" => LOAD_STATE.to_string(),
        "active" => (if running { "active" } else { "inactive" }).to_string(),
        "sub" => (if running { "running" } else { "dead" }).to_string(),
        "machine" | "tmachine" => state.machine_column(unit.machine.as_ref(), full),
        "dstate" => unit.desired().map_or("-", TargetState::as_str).to_string(),
        "state" => observed.as_str().to_string(),
        other => return Err(failed(format!("Error: invalid field {other:?}"))),
    })
}

const LOAD_STATE: &str = "loaded";
