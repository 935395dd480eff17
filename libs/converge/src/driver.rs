//! Cluster driver contract.
//!
//! The driver owns cluster members and executes `fleetctl`-equivalent
//! commands against them. The poller only ever calls [`ClusterDriver::run_command`]
//! with read-only listing arguments, so implementations must tolerate the same
//! command being repeated many times.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// Handle to a cluster member.
///
/// Created and destroyed by the driver; everything else only borrows it as a
/// query target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Member {
    name: String,
    endpoint: String,
}

impl Member {
    /// Create a member handle.
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
        }
    }

    /// Member name, unique within its driver.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Endpoint commands for this member are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Output of a successful command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Create output from stdout and stderr text.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Driver errors.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The command ran and exited unsuccessfully.
    #[error("command exited with status {status:?}: {stderr}")]
    CommandFailed {
        status: Option<i32>,
        stdout: String,
        stderr: String,
    },

    /// The command could not be spawned or its output read.
    #[error("failed to run command: {0}")]
    Io(#[from] std::io::Error),

    /// The command did not finish in time.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),

    /// The member was destroyed.
    #[error("member {0} has been destroyed")]
    MemberDestroyed(String),

    /// The member was never created by this driver.
    #[error("unknown member: {0}")]
    UnknownMember(String),

    /// No more members can be created.
    #[error("no member capacity left ({0} in use)")]
    Exhausted(usize),
}

impl DriverError {
    /// Returns true if retrying against the same member cannot succeed.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DriverError::MemberDestroyed(_) | DriverError::UnknownMember(_)
        )
    }

    /// Create a command failure from captured output.
    pub fn command_failed(
        status: Option<i32>,
        stdout: impl Into<String>,
        stderr: impl Into<String>,
    ) -> Self {
        Self::CommandFailed {
            status,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }
}

/// Cluster driver interface.
#[async_trait]
pub trait ClusterDriver: Send + Sync {
    /// Create a new member and return its handle.
    async fn create_member(&self) -> Result<Member, DriverError>;

    /// Destroy a member. Later commands against it fail with a fatal error.
    async fn destroy_member(&self, member: &Member) -> Result<(), DriverError>;

    /// Run a command against a member.
    async fn run_command(&self, member: &Member, args: &[&str])
        -> Result<CommandOutput, DriverError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(DriverError::MemberDestroyed("m0".to_string()).is_fatal());
        assert!(DriverError::UnknownMember("m9".to_string()).is_fatal());
        assert!(!DriverError::Timeout(Duration::from_secs(1)).is_fatal());
        assert!(!DriverError::command_failed(Some(1), "", "Error retrieving list").is_fatal());
        assert!(!DriverError::Exhausted(3).is_fatal());
    }

    #[test]
    fn test_member_display() {
        let member = Member::new("smoke0", "http://172.18.1.1:2379");
        assert_eq!(member.to_string(), "smoke0");
        assert_eq!(member.endpoint(), "http://172.18.1.1:2379");
    }
}
