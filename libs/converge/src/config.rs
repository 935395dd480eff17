//! Poll configuration.

use std::time::Duration;

use thiserror::Error;

use crate::backoff::BackoffPolicy;

/// Default deadline for a wait call.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(15);

/// Default deadline for a single listing command.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable held a value that is not a valid number.
    #[error("invalid value for {var}: '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Wait configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    /// Deadline for each wait call.
    pub timeout: Duration,

    /// Deadline for each listing command inside a wait.
    pub query_timeout: Duration,

    /// Delay between attempts.
    pub backoff: BackoffPolicy,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_POLL_TIMEOUT,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl PollConfig {
    /// Load configuration from environment variables.
    ///
    /// - `FLEET_POLL_TIMEOUT_SECS`: wait deadline
    /// - `FLEET_POLL_QUERY_TIMEOUT_SECS`: per-command deadline
    /// - `FLEET_POLL_INTERVAL_MS`: fixed interval between attempts
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var(&lookup, "FLEET_POLL_TIMEOUT_SECS")? {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var(&lookup, "FLEET_POLL_QUERY_TIMEOUT_SECS")? {
            config.query_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var(&lookup, "FLEET_POLL_INTERVAL_MS")? {
            config.backoff = BackoffPolicy::fixed(Duration::from_millis(ms));
        }

        Ok(config)
    }

    /// Same configuration with a different wait deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_var<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_env() {
        let config = PollConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config, PollConfig::default());
        assert_eq!(config.timeout, Duration::from_secs(15));
    }

    #[test]
    fn test_overrides() {
        let config = PollConfig::from_lookup(|var| match var {
            "FLEET_POLL_TIMEOUT_SECS" => Some("30".to_string()),
            "FLEET_POLL_INTERVAL_MS" => Some("100".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.query_timeout, DEFAULT_QUERY_TIMEOUT);
        assert_eq!(config.backoff, BackoffPolicy::fixed(Duration::from_millis(100)));
    }

    #[test]
    fn test_invalid_value() {
        let err = PollConfig::from_lookup(|var| {
            (var == "FLEET_POLL_TIMEOUT_SECS").then(|| "soon".to_string())
        })
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::Invalid {
                var: "FLEET_POLL_TIMEOUT_SECS",
                value: "soon".to_string(),
            }
        );
    }
}
