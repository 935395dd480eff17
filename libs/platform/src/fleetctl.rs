//! Process-backed cluster driver.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use fleet_converge::{ClusterDriver, CommandOutput, DriverError, Member};
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::PlatformConfig;

/// Member bookkeeping.
#[derive(Debug, Default)]
struct Members {
    /// Index of the next endpoint to hand out.
    next: usize,

    /// Live members: name -> endpoint.
    live: HashMap<String, String>,

    /// Names of destroyed members.
    destroyed: HashSet<String>,
}

/// Cluster driver that shells out to `fleetctl`.
pub struct FleetctlDriver {
    config: PlatformConfig,
    members: Mutex<Members>,
}

impl FleetctlDriver {
    /// Create a driver over the configured endpoints.
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            config,
            members: Mutex::new(Members::default()),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PlatformConfig {
        &self.config
    }

    fn members(&self) -> std::sync::MutexGuard<'_, Members> {
        self.members.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Resolve the endpoint of a live member.
    fn endpoint(&self, member: &Member) -> Result<String, DriverError> {
        let members = self.members();
        if members.destroyed.contains(member.name()) {
            return Err(DriverError::MemberDestroyed(member.name().to_string()));
        }
        members
            .live
            .get(member.name())
            .cloned()
            .ok_or_else(|| DriverError::UnknownMember(member.name().to_string()))
    }
}

#[async_trait]
impl ClusterDriver for FleetctlDriver {
    async fn create_member(&self) -> Result<Member, DriverError> {
        let mut members = self.members();

        let Some(endpoint) = self.config.endpoints.get(members.next).cloned() else {
            return Err(DriverError::Exhausted(members.live.len()));
        };

        let name = format!("m{}", members.next);
        members.next += 1;
        members.live.insert(name.clone(), endpoint.clone());

        info!(member = %name, endpoint = %endpoint, "Member assigned");
        Ok(Member::new(name, endpoint))
    }

    async fn destroy_member(&self, member: &Member) -> Result<(), DriverError> {
        let mut members = self.members();

        if members.live.remove(member.name()).is_none() {
            return Err(DriverError::UnknownMember(member.name().to_string()));
        }
        members.destroyed.insert(member.name().to_string());

        info!(member = %member, "Member retired");
        Ok(())
    }

    async fn run_command(
        &self,
        member: &Member,
        args: &[&str],
    ) -> Result<CommandOutput, DriverError> {
        let endpoint = self.endpoint(member)?;

        debug!(member = %member, args = ?args, "Running fleetctl");

        let child = Command::new(&self.config.fleetctl_bin)
            .arg(format!("--endpoint={endpoint}"))
            .args(args)
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.config.command_timeout, child)
            .await
            .map_err(|_| DriverError::Timeout(self.config.command_timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            warn!(
                member = %member,
                status = ?output.status.code(),
                stderr = %stderr.trim(),
                "fleetctl failed"
            );
            return Err(DriverError::command_failed(output.status.code(), stdout, stderr));
        }

        Ok(CommandOutput::new(stdout, stderr))
    }
}
