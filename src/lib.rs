//! Start-up resolution for the PBS init script.
//!
//! Decides which daemons (server, scheduler, comm, mom) to start from
//! `pbs.conf` and `PBS_START_*` environment overrides, then hands the plan
//! to a launcher.

pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::{ConfigSource, EnvironmentOverrides, Subsystem};
pub use lifecycle::{resolve, ResolvedStartSet};
