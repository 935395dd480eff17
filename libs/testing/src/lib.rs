//! # fleet-testing
//!
//! Test support for convergence scenarios.
//!
//! - [`SimulatedCluster`]: an in-memory [`ClusterDriver`](fleet_converge::ClusterDriver)
//!   that answers `fleetctl` commands with a configurable propagation lag,
//!   so waits have something to wait for.
//! - [`fixtures`]: unit file helpers for submit/replace scenarios.

pub mod fixtures;
mod sim;

pub use sim::{SimConfig, SimulatedCluster};
