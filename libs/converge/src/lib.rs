//! Convergence polling primitives.
//!
//! A cluster driven through `fleetctl` is eventually consistent: a `submit`
//! returns before the unit shows up in `list-unit-files`, a `start` returns
//! before the unit is `active`. This library provides the wait-until-true
//! loop that turns those listings into deterministic assertions.
//!
//! - **Query**: a listing command plus its parser ([`query`]).
//! - **Predicate**: a pure condition over one snapshot ([`PollPredicate`]).
//! - **Poller**: runs query → parse → predicate until satisfied or the
//!   deadline passes ([`Poller`]).
//!
//! # Invariants
//!
//! - At most one query is in flight per wait call
//! - A returned snapshot always satisfies the predicate it was awaited with
//! - Snapshots are never reused between attempts
//! - Transient query failures are retried; only terminal outcomes are returned

mod backoff;
mod config;
mod driver;
mod error;
mod order;
mod poller;
mod predicate;
pub mod query;

pub use backoff::BackoffPolicy;
pub use config::{ConfigError, PollConfig, DEFAULT_POLL_TIMEOUT, DEFAULT_QUERY_TIMEOUT};
pub use driver::{ClusterDriver, CommandOutput, DriverError, Member};
pub use error::{ConvergeError, QueryError};
pub use order::{check_sorted, OrderingError};
pub use poller::Poller;
pub use predicate::{membership_diff, PollPredicate};
pub use query::Query;

pub use fleet_units as units;
