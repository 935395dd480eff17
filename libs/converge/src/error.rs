//! Error taxonomy for convergence waits.

use std::collections::BTreeSet;
use std::time::Duration;

use fleet_units::{ParseError, Snapshot};
use thiserror::Error;

use crate::driver::DriverError;

/// Failure of a single query attempt.
///
/// Inside a wait, every non-fatal `QueryError` is a transient failure: it is
/// logged, remembered for diagnostics and retried until the deadline.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The driver could not run the command.
    #[error(transparent)]
    Driver(#[from] DriverError),

    /// The command output could not be parsed.
    #[error("unparseable output: {0}")]
    Parse(#[from] ParseError),

    /// The command exceeded the per-query timeout.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
}

impl QueryError {
    /// Returns true if the target is gone and retrying is pointless.
    pub fn is_fatal(&self) -> bool {
        matches!(self, QueryError::Driver(err) if err.is_fatal())
    }
}

/// Terminal outcome of a wait call that did not converge.
///
/// Callers treat every variant as a scenario failure.
#[derive(Debug, Error)]
pub enum ConvergeError<T> {
    /// The predicate was never satisfied before the deadline.
    #[error(
        "{query} on {member} did not satisfy '{predicate}' within {elapsed:?} \
         ({attempts} attempts, last observed {observed} entries)"
    )]
    ConvergenceTimeout {
        member: String,
        query: &'static str,
        predicate: String,
        elapsed: Duration,
        attempts: u32,
        observed: usize,
        last_snapshot: Option<Snapshot<T>>,
        last_error: Option<String>,
    },

    /// The query target was destroyed or is unknown to the driver.
    #[error("member {member} is unavailable: {error}")]
    TargetUnavailable {
        member: String,
        #[source]
        error: QueryError,
    },

    /// The listing never held exactly the expected names.
    #[error(
        "{query} on {member} membership mismatch: missing {missing:?}, unexpected {unexpected:?}"
    )]
    MembershipMismatch {
        member: String,
        query: &'static str,
        missing: BTreeSet<String>,
        unexpected: BTreeSet<String>,
        last_snapshot: Snapshot<T>,
    },
}

impl<T> ConvergeError<T> {
    /// Returns true if this is a deadline expiry.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ConvergeError::ConvergenceTimeout { .. })
    }

    /// Last snapshot observed before failing, if any.
    pub fn last_snapshot(&self) -> Option<&Snapshot<T>> {
        match self {
            ConvergeError::ConvergenceTimeout { last_snapshot, .. } => last_snapshot.as_ref(),
            ConvergeError::MembershipMismatch { last_snapshot, .. } => Some(last_snapshot),
            ConvergeError::TargetUnavailable { .. } => None,
        }
    }
}
