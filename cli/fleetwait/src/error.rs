//! Error handling and display for the CLI.

use std::fmt;

use colored::Colorize;
use fleet_converge::{ConvergeError, OrderingError, QueryError};
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    NotConverged(String),

    #[error("{0}")]
    Unavailable(String),

    #[error("{0}")]
    Mismatch(String),

    #[error("listing is not sorted: {0}")]
    Unsorted(#[from] OrderingError),

    #[error("listing failed: {0}")]
    Query(#[from] QueryError),
}

impl<T: fmt::Debug> From<ConvergeError<T>> for CliError {
    fn from(err: ConvergeError<T>) -> Self {
        let message = err.to_string();
        match err {
            ConvergeError::ConvergenceTimeout {
                last_error: Some(last_error),
                ..
            } => Self::NotConverged(format!("{message}; last error: {last_error}")),
            ConvergeError::ConvergenceTimeout { .. } => Self::NotConverged(message),
            ConvergeError::TargetUnavailable { .. } => Self::Unavailable(message),
            ConvergeError::MembershipMismatch { .. } => Self::Mismatch(message),
        }
    }
}

/// Print an error in a user-friendly format.
pub fn print_error(err: &anyhow::Error) {
    eprintln!("{} {}", "Error:".red().bold(), err);

    if let Some(cli_err) = err.downcast_ref::<CliError>() {
        let hint = match cli_err {
            CliError::NotConverged(_) => {
                Some("Hint: Raise --timeout, or check the fleet agents with `fleetctl list-machines`.")
            }
            CliError::Unavailable(_) | CliError::Query(_) => {
                Some("Hint: Check --endpoint and that fleetctl can reach the cluster.")
            }
            CliError::Mismatch(_) => Some("Hint: Compare the expected names with `fleetctl list-unit-files`."),
            CliError::Unsorted(_) => None,
        };
        if let Some(hint) = hint {
            eprintln!("\n{}", hint.yellow());
        }
    }
}
