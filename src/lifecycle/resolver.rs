//! Start decision for each subsystem.
//!
//! An environment override, when present, always wins over the value in
//! `pbs.conf`. Resolution is a pure function of its two inputs.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::config::{ConfigSource, EnvironmentOverrides, Subsystem};

/// Where a start decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Environment,
    ConfigFile,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Environment => f.write_str("environment"),
            Origin::ConfigFile => f.write_str("config file"),
        }
    }
}

/// Resolved start setting for one subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub start: bool,
    pub origin: Origin,
}

/// Start decisions for every subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResolvedStartSet {
    decisions: BTreeMap<Subsystem, Decision>,
}

impl ResolvedStartSet {
    pub fn get(&self, subsystem: Subsystem) -> Option<Decision> {
        self.decisions.get(&subsystem).copied()
    }

    /// Whether the subsystem should be started.
    pub fn should_start(&self, subsystem: Subsystem) -> bool {
        self.get(subsystem).is_some_and(|d| d.start)
    }

    /// Subsystems to start, in start order.
    pub fn started(&self) -> impl Iterator<Item = Subsystem> + '_ {
        Subsystem::START_ORDER
            .into_iter()
            .filter(|s| self.should_start(*s))
    }

    /// Plain start flags, without origins.
    pub fn flags(&self) -> BTreeMap<Subsystem, bool> {
        self.decisions.iter().map(|(s, d)| (*s, d.start)).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Subsystem, Decision)> + '_ {
        self.decisions.iter().map(|(s, d)| (*s, *d))
    }
}

/// Raised when neither source has a value for some subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("no start setting for: {}", join_keys(.0))]
    MissingSubsystem(Vec<Subsystem>),
}

fn join_keys(subsystems: &[Subsystem]) -> String {
    subsystems
        .iter()
        .map(|s| s.config_key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Combine file settings and environment overrides.
///
/// For every subsystem the override is used when present, otherwise the
/// config value. A subsystem missing from both is an error.
pub fn resolve(
    config: &ConfigSource,
    overrides: &EnvironmentOverrides,
) -> Result<ResolvedStartSet, ConfigurationError> {
    let mut decisions = BTreeMap::new();
    let mut missing = Vec::new();

    for subsystem in Subsystem::ALL {
        let decision = match (overrides.start(subsystem), config.start(subsystem)) {
            (Some(start), _) => Decision {
                start,
                origin: Origin::Environment,
            },
            (None, Some(start)) => Decision {
                start,
                origin: Origin::ConfigFile,
            },
            (None, None) => {
                missing.push(subsystem);
                continue;
            }
        };
        decisions.insert(subsystem, decision);
    }

    if !missing.is_empty() {
        return Err(ConfigurationError::MissingSubsystem(missing));
    }

    Ok(ResolvedStartSet { decisions })
}
