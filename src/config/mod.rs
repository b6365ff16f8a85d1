//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! pbs.conf (KEY=VALUE or TOML)
//!     → loader.rs (parse into raw entries)
//!     → schema.rs (typed ConfigSource)
//!     → validation.rs (semantic checks)
//!
//! process environment
//!     → env.rs (EnvironmentOverrides, PBS_CONF_FILE)
//! ```
//!
//! # Design Decisions
//! - ConfigSource is immutable once loaded
//! - Validation separates syntactic (parser) from semantic checks
//! - Environment is read in one place and passed around explicitly

pub mod env;
pub mod loader;
pub mod schema;
pub mod validation;

pub use env::EnvironmentOverrides;
pub use loader::{load_config, ConfigError};
pub use schema::{ConfigSource, Subsystem};
pub use validation::ValidationError;
