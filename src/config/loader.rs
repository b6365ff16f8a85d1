//! Configuration loading from disk.
//!
//! `pbs.conf` is normally a shell-style `KEY=VALUE` file. A flat TOML table
//! with the same keys is accepted when the file name ends in `.toml`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::ConfigSource;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("unsupported value type for {key}, expected string, integer or boolean")]
    UnsupportedValue { key: String },

    #[error("environment override {key}={value:?} is not a boolean value")]
    InvalidOverride { key: String, value: String },

    #[error("environment variable {key} is not valid UTF-8")]
    NonUnicode { key: String },

    #[error("validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// On-disk syntax of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Shell-style `KEY=VALUE` lines.
    Conf,
    /// Flat TOML table.
    Toml,
}

impl ConfigFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => ConfigFormat::Toml,
            _ => ConfigFormat::Conf,
        }
    }
}

/// Load and validate configuration from a file.
pub fn load_config(path: &Path) -> Result<ConfigSource, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let config = config_from_str(&content, ConfigFormat::from_path(path))?;
    tracing::debug!(path = %path.display(), "Configuration loaded");
    Ok(config)
}

/// Parse and validate configuration text.
pub fn config_from_str(content: &str, format: ConfigFormat) -> Result<ConfigSource, ConfigError> {
    let entries = match format {
        ConfigFormat::Conf => parse_conf_str(content)?,
        ConfigFormat::Toml => parse_toml_str(content)?,
    };

    let (config, mut errors) = ConfigSource::from_entries(entries);

    if let Err(semantic) = validate_config(&config) {
        // A flag that failed to parse also shows up as missing; report it once.
        let already_reported = errors.clone();
        errors.extend(semantic.into_iter().filter(|e| match e {
            ValidationError::MissingStartFlag(s) => !already_reported.iter().any(
                |r| matches!(r, ValidationError::InvalidFlag { key, .. } if key == s.config_key()),
            ),
            _ => true,
        }));
    }

    if errors.is_empty() {
        Ok(config)
    } else {
        Err(ConfigError::Validation(errors))
    }
}

/// Parse `KEY=VALUE` lines.
///
/// Blank lines and `#` comments are skipped, including trailing comments
/// after a value. A leading `export` is allowed, and values may be wrapped in
/// single or double quotes.
pub fn parse_conf_str(content: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let mut entries = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line
            .strip_prefix("export")
            .filter(|rest| rest.starts_with(char::is_whitespace))
            .map(str::trim_start)
            .unwrap_or(line);

        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Parse {
                line: idx + 1,
                message: format!("expected KEY=VALUE, got {:?}", line),
            });
        };

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::Parse {
                line: idx + 1,
                message: "empty key".to_string(),
            });
        }

        entries.push((key.to_string(), parse_value(value).to_string()));
    }

    Ok(entries)
}

/// Parse a flat TOML table into `KEY=VALUE` entries.
pub fn parse_toml_str(content: &str) -> Result<Vec<(String, String)>, ConfigError> {
    let table: toml::Table = toml::from_str(content)?;

    table
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                toml::Value::String(s) => s,
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => b.to_string(),
                _ => return Err(ConfigError::UnsupportedValue { key }),
            };
            Ok((key, value))
        })
        .collect()
}

/// Value part of a `KEY=VALUE` line, as a shell would read it.
///
/// Quoted values end at the closing quote. Unquoted values end at a `#`
/// that follows whitespace.
fn parse_value(raw: &str) -> &str {
    let value = raw.trim();

    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return &rest[..end];
            }
        }
    }

    let comment = value
        .char_indices()
        .find(|&(i, c)| c == '#' && value[..i].ends_with(char::is_whitespace));
    match comment {
        Some((i, _)) => value[..i].trim_end(),
        None => value,
    }
}
