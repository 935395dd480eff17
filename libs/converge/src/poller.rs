//! The convergence poller.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use fleet_units::{parse, MachineState, Snapshot, UnitFileState, UnitState};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::PollConfig;
use crate::driver::{ClusterDriver, Member};
use crate::error::{ConvergeError, QueryError};
use crate::predicate::{membership_diff, PollPredicate};
use crate::query::{ListActiveUnits, ListMachines, ListUnitFiles, ListUnits, Query};

/// Smallest budget a query gets, even when the wait deadline is closer.
const MIN_QUERY_BUDGET: Duration = Duration::from_millis(50);

/// Waits for cluster listings to satisfy predicates.
///
/// Cloning is cheap; clones share the driver but no poll state, so
/// independent scenarios may wait concurrently.
#[derive(Clone)]
pub struct Poller {
    driver: Arc<dyn ClusterDriver>,
    config: PollConfig,
}

impl Poller {
    /// Create a poller over a driver.
    pub fn new(driver: Arc<dyn ClusterDriver>, config: PollConfig) -> Self {
        Self { driver, config }
    }

    /// Get the configuration.
    pub fn config(&self) -> &PollConfig {
        &self.config
    }

    /// Get the driver.
    pub fn driver(&self) -> &Arc<dyn ClusterDriver> {
        &self.driver
    }

    /// Poll until `predicate` holds for a snapshot of `query`, or `timeout` elapses.
    ///
    /// Returns the satisfying snapshot. Transient query failures are retried;
    /// a fatal driver error returns [`ConvergeError::TargetUnavailable`] at once.
    pub async fn await_condition<Q: Query>(
        &self,
        member: &Member,
        query: &Q,
        predicate: &PollPredicate,
        timeout: Duration,
    ) -> Result<Snapshot<Q::Entry>, ConvergeError<Q::Entry>> {
        let start = Instant::now();
        let mut attempts: u32 = 0;
        let mut last_snapshot: Option<Snapshot<Q::Entry>> = None;
        let mut last_error: Option<String> = None;

        loop {
            attempts += 1;

            // A query never runs past the wait deadline by more than the floor.
            let remaining = timeout.saturating_sub(start.elapsed());
            let budget = self.config.query_timeout.min(remaining).max(MIN_QUERY_BUDGET);

            match self.attempt(member, query, budget).await {
                Ok(snapshot) if predicate.matches(&snapshot) => {
                    info!(
                        member = %member,
                        query = query.name(),
                        predicate = %predicate,
                        attempts,
                        elapsed_ms = start.elapsed().as_millis() as u64,
                        "Converged"
                    );
                    return Ok(snapshot);
                }
                Ok(snapshot) => {
                    debug!(
                        member = %member,
                        query = query.name(),
                        predicate = %predicate,
                        attempt = attempts,
                        observed = snapshot.len(),
                        "Predicate not yet satisfied"
                    );
                    last_snapshot = Some(snapshot);
                }
                Err(error) if error.is_fatal() => {
                    warn!(member = %member, query = query.name(), error = %error, "Target unavailable");
                    return Err(ConvergeError::TargetUnavailable {
                        member: member.name().to_string(),
                        error,
                    });
                }
                Err(error) => {
                    debug!(
                        member = %member,
                        query = query.name(),
                        attempt = attempts,
                        error = %error,
                        "Transient query failure, will retry"
                    );
                    last_error = Some(error.to_string());
                }
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                let observed = last_snapshot.as_ref().map_or(0, Snapshot::len);
                warn!(
                    member = %member,
                    query = query.name(),
                    predicate = %predicate,
                    attempts,
                    observed,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Timed out waiting for convergence"
                );
                return Err(ConvergeError::ConvergenceTimeout {
                    member: member.name().to_string(),
                    query: query.name(),
                    predicate: predicate.to_string(),
                    elapsed,
                    attempts,
                    observed,
                    last_snapshot,
                    last_error,
                });
            }

            let delay = self.config.backoff.delay(attempts - 1).min(timeout - elapsed);
            tokio::time::sleep(delay).await;
        }
    }

    /// Poll until the listing holds exactly `expected` names.
    ///
    /// On deadline, a listing that was observed but never matched is reported
    /// as [`ConvergeError::MembershipMismatch`] with missing and unexpected
    /// names split out.
    pub async fn await_exact_membership<Q, I, S>(
        &self,
        member: &Member,
        query: &Q,
        expected: I,
        timeout: Duration,
    ) -> Result<Snapshot<Q::Entry>, ConvergeError<Q::Entry>>
    where
        Q: Query,
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let expected: BTreeSet<String> = expected.into_iter().map(Into::into).collect();
        let predicate = PollPredicate::ExactKeys(expected.clone());

        match self.await_condition(member, query, &predicate, timeout).await {
            Err(ConvergeError::ConvergenceTimeout {
                member,
                query,
                last_snapshot: Some(snapshot),
                ..
            }) => {
                let (missing, unexpected) = membership_diff(&expected, &snapshot.key_set());
                Err(ConvergeError::MembershipMismatch {
                    member,
                    query,
                    missing,
                    unexpected,
                    last_snapshot: snapshot,
                })
            }
            other => other,
        }
    }

    /// Wait for exactly `count` machines.
    pub async fn wait_for_machines(
        &self,
        member: &Member,
        count: usize,
    ) -> Result<Snapshot<MachineState>, ConvergeError<MachineState>> {
        self.await_count(member, &ListMachines, count).await
    }

    /// Wait for exactly `count` loaded units.
    pub async fn wait_for_units(
        &self,
        member: &Member,
        count: usize,
    ) -> Result<Snapshot<UnitState>, ConvergeError<UnitState>> {
        self.await_count(member, &ListUnits, count).await
    }

    /// Wait for exactly `count` active units.
    pub async fn wait_for_active_units(
        &self,
        member: &Member,
        count: usize,
    ) -> Result<Snapshot<UnitState>, ConvergeError<UnitState>> {
        self.await_count(member, &ListActiveUnits, count).await
    }

    /// Wait for exactly `count` unit files.
    pub async fn wait_for_unit_files(
        &self,
        member: &Member,
        count: usize,
    ) -> Result<Snapshot<UnitFileState>, ConvergeError<UnitFileState>> {
        self.await_count(member, &ListUnitFiles, count).await
    }

    /// Run a listing once and return its first column in output order.
    ///
    /// No retry: this is meant for one-shot assertions on an already
    /// converged cluster, such as ordering checks.
    pub async fn list_names(&self, member: &Member, args: &[&str]) -> Result<Vec<String>, QueryError> {
        let output = self.run(member, args, self.config.query_timeout).await?;
        Ok(parse::parse_names(&output))
    }

    async fn await_count<Q: Query>(
        &self,
        member: &Member,
        query: &Q,
        count: usize,
    ) -> Result<Snapshot<Q::Entry>, ConvergeError<Q::Entry>> {
        self.await_condition(member, query, &PollPredicate::count(count), self.config.timeout)
            .await
    }

    async fn attempt<Q: Query>(
        &self,
        member: &Member,
        query: &Q,
        budget: Duration,
    ) -> Result<Snapshot<Q::Entry>, QueryError> {
        let stdout = self.run(member, query.args(), budget).await?;
        Ok(query.parse(&stdout)?)
    }

    async fn run(
        &self,
        member: &Member,
        args: &[&str],
        budget: Duration,
    ) -> Result<String, QueryError> {
        let output = tokio::time::timeout(budget, self.driver.run_command(member, args))
            .await
            .map_err(|_| QueryError::Timeout(budget))??;

        Ok(output.stdout)
    }
}

impl std::fmt::Debug for Poller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Poller")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
