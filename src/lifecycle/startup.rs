//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate `pbs.conf`
//! - Apply environment overrides
//! - Hand the resolved plan to a launcher
//!
//! # Design Decisions
//! - Fail fast: any error before launch is fatal and nothing is started
//! - Each decision is logged with its origin

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::config::{load_config, ConfigError, ConfigSource, EnvironmentOverrides};
use crate::lifecycle::launcher::{LaunchError, LaunchMode, LaunchReport, SubsystemLauncher};
use crate::lifecycle::resolver::{resolve, ConfigurationError, ResolvedStartSet};

/// Anything that can stop a startup run.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Resolve(#[from] ConfigurationError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error("PBS_EXEC is not set in {} or the environment", .conf.display())]
    MissingExec { conf: PathBuf },
}

/// Outcome of a startup run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartReport {
    pub resolved: ResolvedStartSet,
    pub launched: LaunchReport,
}

/// Resolve the start plan from an already loaded configuration.
pub fn plan_from_config(
    config: &ConfigSource,
    overrides: &EnvironmentOverrides,
) -> Result<ResolvedStartSet, ConfigurationError> {
    let resolved = resolve(config, overrides)?;

    for (subsystem, decision) in resolved.iter() {
        tracing::info!(
            %subsystem,
            start = decision.start,
            origin = %decision.origin,
            "Start setting resolved"
        );
    }

    Ok(resolved)
}

/// Load `pbs.conf` and resolve the start plan without launching anything.
pub fn plan(
    conf_path: &Path,
    overrides: &EnvironmentOverrides,
) -> Result<ResolvedStartSet, StartupError> {
    let config = load_config(conf_path)?;
    Ok(plan_from_config(&config, overrides)?)
}

/// Resolve and launch from an already loaded configuration.
pub fn launch<L>(
    config: &ConfigSource,
    overrides: &EnvironmentOverrides,
    launcher: &mut L,
) -> Result<StartReport, StartupError>
where
    L: SubsystemLauncher + ?Sized,
{
    let resolved = plan_from_config(config, overrides)?;
    let launched = launcher.launch(&resolved)?;

    tracing::info!(started = launched.started.len(), "Startup complete");
    Ok(StartReport { resolved, launched })
}

/// Load `pbs.conf`, resolve, and launch.
pub fn start<L>(
    conf_path: &Path,
    overrides: &EnvironmentOverrides,
    launcher: &mut L,
) -> Result<StartReport, StartupError>
where
    L: SubsystemLauncher + ?Sized,
{
    let config = load_config(conf_path)?;
    tracing::info!(path = %conf_path.display(), "Configuration loaded");
    launch(&config, overrides, launcher)
}

/// Effective installation prefix: environment first, then `pbs.conf`.
pub fn exec_dir(config: &ConfigSource, overrides: &EnvironmentOverrides) -> Option<PathBuf> {
    overrides
        .exec()
        .or_else(|| config.exec())
        .map(Path::to_path_buf)
}

/// `PBS_EXEC` and `PBS_HOME` after applying environment overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InstallPaths {
    pub exec: Option<PathBuf>,
    pub home: Option<PathBuf>,
}

pub fn install_paths(config: &ConfigSource, overrides: &EnvironmentOverrides) -> InstallPaths {
    InstallPaths {
        exec: exec_dir(config, overrides),
        home: overrides
            .home()
            .or_else(|| config.home())
            .map(Path::to_path_buf),
    }
}

/// Pick how the console launcher runs.
///
/// A dry run never needs `PBS_EXEC`; a real start fails with
/// [`StartupError::MissingExec`] when neither source sets it.
pub fn launch_mode(
    config: &ConfigSource,
    overrides: &EnvironmentOverrides,
    dry_run: bool,
    conf_path: &Path,
) -> Result<LaunchMode, StartupError> {
    if dry_run {
        return Ok(LaunchMode::DryRun);
    }

    let exec = exec_dir(config, overrides).ok_or_else(|| StartupError::MissingExec {
        conf: conf_path.to_path_buf(),
    })?;
    Ok(LaunchMode::Spawn { exec })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Subsystem;
    use crate::lifecycle::launcher::RecordingLauncher;

    fn all_on() -> ConfigSource {
        Subsystem::ALL
            .into_iter()
            .fold(ConfigSource::new(), |c, s| c.with_start(s, true))
    }

    #[test]
    fn test_launch_passes_plan_to_launcher() {
        let overrides = EnvironmentOverrides::new().with_start(Subsystem::Server, false);
        let mut launcher = RecordingLauncher::new();

        let report = launch(&all_on(), &overrides, &mut launcher).unwrap();

        assert_eq!(
            report.launched.started,
            vec![Subsystem::Comm, Subsystem::Mom, Subsystem::Scheduler]
        );
        assert_eq!(launcher.plans(), &[report.resolved]);
    }

    #[test]
    fn test_launch_fails_before_launcher_on_missing_flag() {
        let config = ConfigSource::new().with_start(Subsystem::Mom, true);
        let mut launcher = RecordingLauncher::new();

        let err = launch(&config, &EnvironmentOverrides::new(), &mut launcher).unwrap_err();
        assert!(matches!(err, StartupError::Resolve(_)));
        assert!(launcher.plans().is_empty());
    }

    #[test]
    fn test_exec_dir_prefers_environment() {
        let config = all_on().with_exec("/opt/pbs");
        assert_eq!(
            exec_dir(&config, &EnvironmentOverrides::new()),
            Some(PathBuf::from("/opt/pbs"))
        );

        let overrides = EnvironmentOverrides::new().with_exec("/opt/pbs-dev");
        assert_eq!(exec_dir(&config, &overrides), Some(PathBuf::from("/opt/pbs-dev")));

        assert_eq!(exec_dir(&all_on(), &EnvironmentOverrides::new()), None);
    }

    #[test]
    fn test_launch_mode_requires_exec() {
        let conf = Path::new("/etc/pbs.conf");
        let err = launch_mode(&all_on(), &EnvironmentOverrides::new(), false, conf).unwrap_err();

        assert!(matches!(err, StartupError::MissingExec { ref conf } if conf == Path::new("/etc/pbs.conf")));
        assert_eq!(
            err.to_string(),
            "PBS_EXEC is not set in /etc/pbs.conf or the environment"
        );
    }

    #[test]
    fn test_launch_mode_dry_run_without_exec() {
        let conf = Path::new("/etc/pbs.conf");
        let mode = launch_mode(&all_on(), &EnvironmentOverrides::new(), true, conf).unwrap();
        assert_eq!(mode, LaunchMode::DryRun);
    }

    #[test]
    fn test_launch_mode_prefers_environment_exec() {
        let conf = Path::new("/etc/pbs.conf");
        let config = all_on().with_exec("/opt/pbs");
        let overrides = EnvironmentOverrides::new().with_exec("/opt/pbs-dev");

        assert_eq!(
            launch_mode(&config, &overrides, false, conf).unwrap(),
            LaunchMode::Spawn {
                exec: PathBuf::from("/opt/pbs-dev")
            }
        );
        assert_eq!(
            launch_mode(&config, &EnvironmentOverrides::new(), false, conf).unwrap(),
            LaunchMode::Spawn {
                exec: PathBuf::from("/opt/pbs")
            }
        );
    }

    #[test]
    fn test_install_paths() {
        let (config, _) = ConfigSource::from_entries([
            ("PBS_EXEC", "/opt/pbs"),
            ("PBS_HOME", "/var/spool/pbs"),
        ]);
        let overrides = EnvironmentOverrides::from_vars([("PBS_HOME", "/scratch/pbs")]).unwrap();

        let paths = install_paths(&config, &overrides);
        assert_eq!(paths.exec, Some(PathBuf::from("/opt/pbs")));
        assert_eq!(paths.home, Some(PathBuf::from("/scratch/pbs")));

        let json = serde_json::to_value(&paths).unwrap();
        assert_eq!(json["home"], "/scratch/pbs");
    }

    #[test]
    fn test_dyn_launcher() {
        let mut recording = RecordingLauncher::new();
        let launcher: &mut dyn SubsystemLauncher = &mut recording;
        assert!(launch(&all_on(), &EnvironmentOverrides::new(), launcher).is_ok());
    }
}
