//! Environment overrides for `pbs.conf` settings.
//!
//! The init script lets `PBS_START_*`, `PBS_EXEC` and `PBS_HOME` in the
//! environment take precedence over the values in the configuration file.
//! Only the binary reads the process environment; everything else takes an
//! explicit [`EnvironmentOverrides`].

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::loader::ConfigError;
use crate::config::schema::{parse_flag, Subsystem, KEY_EXEC, KEY_HOME};
use crate::config::validation::ValidationError;

/// Environment variable naming the configuration file.
pub const ENV_CONF_FILE: &str = "PBS_CONF_FILE";

/// Configuration file used when `PBS_CONF_FILE` is not set.
pub const DEFAULT_CONF_PATH: &str = "/etc/pbs.conf";

/// Per-invocation overrides taken from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvironmentOverrides {
    starts: BTreeMap<Subsystem, bool>,
    exec: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl EnvironmentOverrides {
    /// No overrides at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for a start override.
    pub fn with_start(mut self, subsystem: Subsystem, start: bool) -> Self {
        self.starts.insert(subsystem, start);
        self
    }

    /// Builder-style setter for a `PBS_EXEC` override.
    pub fn with_exec(mut self, exec: impl Into<PathBuf>) -> Self {
        self.exec = Some(exec.into());
        self
    }

    /// Collect overrides from `(name, value)` pairs.
    ///
    /// Unrelated variables are ignored. Empty values count as unset.
    /// `PBS_EXEC` and `PBS_HOME` must be absolute paths.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut overrides = Self::new();

        for (key, value) in vars {
            let (key, value) = (key.as_ref(), value.as_ref());
            if value.trim().is_empty() {
                continue;
            }

            if let Some(subsystem) = Subsystem::from_config_key(key) {
                let start = parse_flag(value).ok_or_else(|| ConfigError::InvalidOverride {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                overrides.starts.insert(subsystem, start);
                continue;
            }

            match key {
                KEY_EXEC => overrides.exec = Some(absolute_path(KEY_EXEC, value)?),
                KEY_HOME => overrides.home = Some(absolute_path(KEY_HOME, value)?),
                _ => {}
            }
        }

        Ok(overrides)
    }

    /// Collect overrides from the current process environment.
    pub fn from_process_env() -> Result<Self, ConfigError> {
        Self::from_vars(utf8_vars(std::env::vars_os())?)
    }

    /// Override for a subsystem, if one was given.
    pub fn start(&self, subsystem: Subsystem) -> Option<bool> {
        self.starts.get(&subsystem).copied()
    }

    pub fn exec(&self) -> Option<&Path> {
        self.exec.as_deref()
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.starts.is_empty() && self.exec.is_none() && self.home.is_none()
    }
}

/// Same rule `pbs.conf` validation applies to installation paths.
fn absolute_path(key: &'static str, value: &str) -> Result<PathBuf, ConfigError> {
    let path = PathBuf::from(value.trim());
    if path.is_absolute() {
        Ok(path)
    } else {
        Err(ConfigError::Validation(vec![ValidationError::RelativePath { key, path }]))
    }
}

/// Resolve the configuration file path from `PBS_CONF_FILE`.
pub fn conf_path_from_vars<I, K, V>(vars: I) -> PathBuf
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    vars.into_iter()
        .find(|(k, v)| k.as_ref() == ENV_CONF_FILE && !v.as_ref().trim().is_empty())
        .map(|(_, v)| PathBuf::from(v.as_ref().trim()))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONF_PATH))
}

/// Resolve the configuration file path from the process environment.
pub fn conf_path_from_process_env() -> Result<PathBuf, ConfigError> {
    Ok(conf_path_from_vars(utf8_vars(std::env::vars_os())?))
}

/// Keep UTF-8 variables, failing on non-UTF-8 values for keys we read.
fn utf8_vars<I>(vars: I) -> Result<Vec<(String, String)>, ConfigError>
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut out = Vec::new();
    for (key, value) in vars {
        let Ok(key) = key.into_string() else {
            continue;
        };
        match value.into_string() {
            Ok(value) => out.push((key, value)),
            Err(_) if is_recognised(&key) => return Err(ConfigError::NonUnicode { key }),
            Err(_) => {}
        }
    }
    Ok(out)
}

fn is_recognised(key: &str) -> bool {
    Subsystem::from_config_key(key).is_some()
        || matches!(key, KEY_EXEC | KEY_HOME | ENV_CONF_FILE)
}
