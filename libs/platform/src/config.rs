//! Configuration for the fleetctl driver.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Default per-command timeout.
const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 30;

/// Fleetctl driver configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Path to the fleetctl binary.
    pub fleetctl_bin: PathBuf,

    /// Endpoints of pre-provisioned members, one per member.
    pub endpoints: Vec<String>,

    /// Hard limit on each command.
    pub command_timeout: Duration,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            fleetctl_bin: PathBuf::from("fleetctl"),
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
        }
    }
}

impl PlatformConfig {
    /// Load configuration from environment variables.
    ///
    /// - `FLEETCTL_BIN`: fleetctl binary (default `fleetctl`)
    /// - `FLEET_ENDPOINTS`: comma separated member endpoints
    /// - `FLEETCTL_COMMAND_TIMEOUT_SECS`: per-command timeout
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(bin) = std::env::var("FLEETCTL_BIN") {
            config.fleetctl_bin = PathBuf::from(bin);
        }

        if let Ok(endpoints) = std::env::var("FLEET_ENDPOINTS") {
            config.endpoints = parse_endpoints(&endpoints);
            if config.endpoints.is_empty() {
                anyhow::bail!("FLEET_ENDPOINTS is set but contains no endpoints");
            }
        }

        if let Ok(secs) = std::env::var("FLEETCTL_COMMAND_TIMEOUT_SECS") {
            let secs: u64 = secs
                .trim()
                .parse()
                .with_context(|| format!("Invalid FLEETCTL_COMMAND_TIMEOUT_SECS: {secs:?}"))?;
            config.command_timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

/// Split a comma separated endpoint list, dropping blanks.
pub(crate) fn parse_endpoints(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
