//! # fleet-platform
//!
//! Runs `fleetctl` against real cluster members.
//!
//! Members are not provisioned here. The driver hands out handles for a fixed
//! list of endpoints that already run fleet, and every command is executed as
//! `fleetctl --endpoint <endpoint> <args...>`.

mod config;
mod fleetctl;

pub use config::PlatformConfig;
pub use fleetctl::FleetctlDriver;
