//! Configuration schema definitions.
//!
//! This module defines the subsystem identifiers managed by the init script
//! and the persisted start settings read from `pbs.conf`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::validation::ValidationError;

/// Installation prefix key. Daemons live under `$PBS_EXEC/sbin`.
pub const KEY_EXEC: &str = "PBS_EXEC";

/// Spool/home directory key.
pub const KEY_HOME: &str = "PBS_HOME";

/// A daemon the init script knows how to start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Subsystem {
    Server,
    Scheduler,
    Comm,
    Mom,
}

impl Subsystem {
    /// Every subsystem, in declaration order.
    pub const ALL: [Subsystem; 4] = [
        Subsystem::Server,
        Subsystem::Scheduler,
        Subsystem::Comm,
        Subsystem::Mom,
    ];

    /// Order in which daemons are brought up.
    ///
    /// The communication agent comes first so the others can reach each
    /// other; the server comes last.
    pub const START_ORDER: [Subsystem; 4] = [
        Subsystem::Comm,
        Subsystem::Mom,
        Subsystem::Scheduler,
        Subsystem::Server,
    ];

    /// Key used both in `pbs.conf` and in the environment.
    pub const fn config_key(self) -> &'static str {
        match self {
            Subsystem::Server => "PBS_START_SERVER",
            Subsystem::Scheduler => "PBS_START_SCHED",
            Subsystem::Comm => "PBS_START_COMM",
            Subsystem::Mom => "PBS_START_MOM",
        }
    }

    /// Line printed by the launcher when this subsystem is started.
    pub const fn label(self) -> &'static str {
        match self {
            Subsystem::Server => "PBS server",
            Subsystem::Scheduler => "PBS sched",
            Subsystem::Comm => "PBS comm",
            Subsystem::Mom => "PBS mom",
        }
    }

    /// Daemon binary name under `$PBS_EXEC/sbin`.
    pub const fn daemon(self) -> &'static str {
        match self {
            Subsystem::Server => "pbs_server",
            Subsystem::Scheduler => "pbs_sched",
            Subsystem::Comm => "pbs_comm",
            Subsystem::Mom => "pbs_mom",
        }
    }

    /// Look up the subsystem owning a `PBS_START_*` key.
    pub fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.config_key() == key)
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Subsystem::Server => "server",
            Subsystem::Scheduler => "scheduler",
            Subsystem::Comm => "comm",
            Subsystem::Mom => "mom",
        };
        f.write_str(name)
    }
}

/// Parse a boolean-like start flag.
///
/// Accepts `1/0`, `true/false`, `yes/no`, `on/off` (case-insensitive) and
/// any other integer, which counts as true when greater than zero.
pub fn parse_flag(raw: &str) -> Option<bool> {
    let value = raw.trim();
    if value.is_empty() {
        return None;
    }

    let lowered = value.to_ascii_lowercase();
    match lowered.as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => other.parse::<i64>().ok().map(|n| n > 0),
    }
}

/// Start settings persisted in `pbs.conf`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    starts: BTreeMap<Subsystem, bool>,
    exec: Option<PathBuf>,
    home: Option<PathBuf>,
}

impl ConfigSource {
    /// Create an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style setter for a start flag.
    pub fn with_start(mut self, subsystem: Subsystem, start: bool) -> Self {
        self.starts.insert(subsystem, start);
        self
    }

    /// Builder-style setter for `PBS_EXEC`.
    pub fn with_exec(mut self, exec: impl Into<PathBuf>) -> Self {
        self.exec = Some(exec.into());
        self
    }

    /// Build a configuration from raw `KEY=VALUE` entries.
    ///
    /// Start flags that are not boolean-like are left unset and reported in
    /// the returned error list. Later entries win over earlier ones.
    pub fn from_entries<I, K, V>(entries: I) -> (Self, Vec<ValidationError>)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut config = Self::new();
        let mut invalid: BTreeMap<Subsystem, ValidationError> = BTreeMap::new();

        for (key, value) in entries {
            let key = key.into();
            let value = value.into();

            if let Some(subsystem) = Subsystem::from_config_key(&key) {
                match parse_flag(&value) {
                    Some(start) => {
                        invalid.remove(&subsystem);
                        config.starts.insert(subsystem, start);
                    }
                    None => {
                        config.starts.remove(&subsystem);
                        invalid.insert(subsystem, ValidationError::InvalidFlag { key, value });
                    }
                }
                continue;
            }

            match key.as_str() {
                KEY_EXEC => config.exec = Some(PathBuf::from(value)),
                KEY_HOME => config.home = Some(PathBuf::from(value)),
                // Server name, ports and the like are read by the daemons.
                _ => {}
            }
        }

        (config, invalid.into_values().collect())
    }

    /// Start flag for a subsystem, if the file sets one.
    pub fn start(&self, subsystem: Subsystem) -> Option<bool> {
        self.starts.get(&subsystem).copied()
    }

    /// All start flags present in the file.
    pub fn flags(&self) -> &BTreeMap<Subsystem, bool> {
        &self.starts
    }

    pub fn exec(&self) -> Option<&Path> {
        self.exec.as_deref()
    }

    pub fn home(&self) -> Option<&Path> {
        self.home.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert_eq!(parse_flag("1"), Some(true));
        assert_eq!(parse_flag("0"), Some(false));
        assert_eq!(parse_flag(" TRUE "), Some(true));
        assert_eq!(parse_flag("off"), Some(false));
        assert_eq!(parse_flag("2"), Some(true));
        assert_eq!(parse_flag("-1"), Some(false));
        assert_eq!(parse_flag(""), None);
        assert_eq!(parse_flag("maybe"), None);
    }

    #[test]
    fn test_config_keys_round_trip() {
        for subsystem in Subsystem::ALL {
            assert_eq!(Subsystem::from_config_key(subsystem.config_key()), Some(subsystem));
        }
        assert_eq!(Subsystem::from_config_key("PBS_START_FOO"), None);
    }

    #[test]
    fn test_from_entries() {
        let (config, errors) = ConfigSource::from_entries([
            ("PBS_EXEC", "/opt/pbs"),
            ("PBS_SERVER", "head01"),
            ("PBS_START_SERVER", "1"),
            ("PBS_START_MOM", "bogus"),
            ("PBS_START_COMM", "0"),
            ("PBS_START_COMM", "1"),
        ]);

        assert_eq!(config.start(Subsystem::Server), Some(true));
        assert_eq!(config.start(Subsystem::Comm), Some(true)); // last one wins
        assert_eq!(config.start(Subsystem::Mom), None);
        assert_eq!(config.exec(), Some(Path::new("/opt/pbs")));

        assert_eq!(
            errors,
            vec![ValidationError::InvalidFlag {
                key: "PBS_START_MOM".into(),
                value: "bogus".into(),
            }]
        );
    }

    #[test]
    fn test_later_valid_flag_clears_error() {
        let (config, errors) =
            ConfigSource::from_entries([("PBS_START_MOM", "bogus"), ("PBS_START_MOM", "0")]);
        assert!(errors.is_empty());
        assert_eq!(config.start(Subsystem::Mom), Some(false));
    }
}
