//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load pbs.conf → Validate → Resolve (resolver.rs) → Launch (launcher.rs)
//!
//! Resolver (resolver.rs):
//!     ConfigSource + EnvironmentOverrides → ResolvedStartSet
//!
//! Launcher (launcher.rs):
//!     ResolvedStartSet → one label line per started subsystem → daemon exec
//! ```
//!
//! # Design Decisions
//! - Resolution is pure; only the launcher touches the outside world
//! - Ordered startup: comm, mom, sched, server

pub mod launcher;
pub mod resolver;
pub mod startup;

pub use launcher::{ConsoleLauncher, LaunchMode, RecordingLauncher, SubsystemLauncher};
pub use resolver::{resolve, ResolvedStartSet};
pub use startup::{start, StartReport, StartupError};
