//! Subsystem launching.
//!
//! # Responsibilities
//! - Announce each started subsystem with its label, in start order
//! - Mark a subsystem that failed to start with `<label> failed`
//! - Optionally exec the daemon binary from `$PBS_EXEC/sbin`
//!
//! # Design Decisions
//! - Launcher is a trait so callers can inject a recording double
//! - Daemons background themselves; the launcher waits for the parent only
//! - First failure stops the sequence

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use thiserror::Error;

use crate::config::Subsystem;
use crate::lifecycle::resolver::ResolvedStartSet;

/// Errors that can occur while starting subsystems.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to write launcher output: {0}")]
    Write(#[from] io::Error),

    #[error("failed to start {subsystem} ({}): {source}", .program.display())]
    Spawn {
        subsystem: Subsystem,
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{subsystem} exited with {}", describe_code(.code))]
    Exited {
        subsystem: Subsystem,
        code: Option<i32>,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

/// Which subsystems a launcher actually started.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LaunchReport {
    pub started: Vec<Subsystem>,
}

/// Starts the subsystems marked for start in a resolved plan.
pub trait SubsystemLauncher {
    fn launch(&mut self, plan: &ResolvedStartSet) -> Result<LaunchReport, LaunchError>;
}

/// What the console launcher does besides printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LaunchMode {
    /// Print labels only.
    DryRun,
    /// Run `<exec>/sbin/<daemon>` for each started subsystem.
    Spawn { exec: PathBuf },
}

/// Launcher that prints an init-script style transcript to a writer.
pub struct ConsoleLauncher<W: Write> {
    out: W,
    mode: LaunchMode,
}

impl<W: Write> ConsoleLauncher<W> {
    pub fn new(out: W, mode: LaunchMode) -> Self {
        Self { out, mode }
    }

    /// Recover the writer, e.g. to inspect captured output.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> SubsystemLauncher for ConsoleLauncher<W> {
    fn launch(&mut self, plan: &ResolvedStartSet) -> Result<LaunchReport, LaunchError> {
        writeln!(self.out, "Starting PBS")?;

        let mut report = LaunchReport::default();
        for subsystem in plan.started() {
            if let LaunchMode::Spawn { exec } = &self.mode {
                if let Err(err) = spawn_daemon(subsystem, exec) {
                    writeln!(self.out, "{} failed", subsystem.label())?;
                    self.out.flush()?;
                    return Err(err);
                }
            }

            writeln!(self.out, "{}", subsystem.label())?;
            self.out.flush()?;
            tracing::info!(%subsystem, daemon = subsystem.daemon(), "Subsystem started");
            report.started.push(subsystem);
        }

        Ok(report)
    }
}

/// Path of a subsystem's daemon under an installation prefix.
pub fn daemon_path(exec: &Path, subsystem: Subsystem) -> PathBuf {
    exec.join("sbin").join(subsystem.daemon())
}

fn spawn_daemon(subsystem: Subsystem, exec: &Path) -> Result<(), LaunchError> {
    let program = daemon_path(exec, subsystem);
    tracing::debug!(%subsystem, program = %program.display(), "Spawning daemon");

    let status: ExitStatus = Command::new(&program)
        .stdin(Stdio::null())
        .status()
        .map_err(|source| LaunchError::Spawn {
            subsystem,
            program: program.clone(),
            source,
        })?;

    if !status.success() {
        tracing::error!(%subsystem, code = ?status.code(), "Daemon failed to start");
        return Err(LaunchError::Exited {
            subsystem,
            code: status.code(),
        });
    }

    Ok(())
}

/// Launcher that records plans instead of starting anything.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    plans: Vec<ResolvedStartSet>,
}

impl RecordingLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every plan passed to `launch`, oldest first.
    pub fn plans(&self) -> &[ResolvedStartSet] {
        &self.plans
    }
}

impl SubsystemLauncher for RecordingLauncher {
    fn launch(&mut self, plan: &ResolvedStartSet) -> Result<LaunchReport, LaunchError> {
        self.plans.push(plan.clone());
        Ok(LaunchReport {
            started: plan.started().collect(),
        })
    }
}
