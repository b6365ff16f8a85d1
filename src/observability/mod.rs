//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! config loading, resolution, launching
//!     → logging.rs (structured log events on stderr)
//! ```
//!
//! # Design Decisions
//! - Log events go to stderr so stdout carries only the launcher transcript
//! - Log level configurable via CLI flag and `RUST_LOG`

pub mod logging;
