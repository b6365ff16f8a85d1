//! Configuration validation.
//!
//! # Responsibilities
//! - Every subsystem has a start flag
//! - Installation and home paths are absolute
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConfigSource → Result<(), Vec<ValidationError>>

use std::path::PathBuf;

use thiserror::Error;

use crate::config::schema::{ConfigSource, Subsystem, KEY_EXEC, KEY_HOME};

/// A semantic problem with a loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{} is not set", .0.config_key())]
    MissingStartFlag(Subsystem),

    #[error("{key}={value:?} is not a boolean value")]
    InvalidFlag { key: String, value: String },

    #[error("{key} must be an absolute path, got {}", .path.display())]
    RelativePath { key: &'static str, path: PathBuf },
}

/// Check a configuration for completeness and sane paths.
pub fn validate_config(config: &ConfigSource) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for subsystem in Subsystem::ALL {
        if config.start(subsystem).is_none() {
            errors.push(ValidationError::MissingStartFlag(subsystem));
        }
    }

    for (key, path) in [(KEY_EXEC, config.exec()), (KEY_HOME, config.home())] {
        if let Some(path) = path {
            if !path.is_absolute() {
                errors.push(ValidationError::RelativePath {
                    key,
                    path: path.to_path_buf(),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
