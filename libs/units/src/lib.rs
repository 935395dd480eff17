//! # fleet-units
//!
//! Observable cluster state as reported by `fleetctl` listings.
//!
//! ## Records
//!
//! - [`UnitState`]: one row of `list-units` (load/active/sub state, machine)
//! - [`UnitFileState`]: one row of `list-unit-files` (desired vs current state)
//! - [`MachineState`]: one row of `list-machines`
//!
//! ## Snapshots
//!
//! A [`Snapshot`] maps entry name to record. It is built fresh from a single
//! command output and never mutated afterwards; callers re-query instead of
//! patching an old snapshot.
//!
//! The parsers in [`parse`] are pure functions over `--no-legend --full`
//! output. Empty output yields an empty snapshot.

mod error;
pub mod parse;
mod snapshot;
mod types;

pub use error::ParseError;
pub use snapshot::{ClusterSnapshot, Keyed, Snapshot};
pub use types::*;
