//! Persistent defaults.
//!
//! `config.json` in the platform config directory may hold defaults for
//! the global flags. Flags and their environment variables win over it.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

/// Configuration file name.
const CONFIG_FILE: &str = "config.json";

/// Get the config directory path.
fn config_dir() -> Result<PathBuf> {
    ProjectDirs::from("org", "fleet", "fleetwait")
        .map(|dirs| dirs.config_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
}

/// CLI configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Member endpoint to query.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Path to the fleetctl binary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fleetctl: Option<PathBuf>,

    /// Wait deadline in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Config {
    /// Load config from disk, or return default.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_dir()?.join(CONFIG_FILE))
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {:?}", path))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {:?}", path))
    }
}
