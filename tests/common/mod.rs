//! Shared helpers for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Write a `pbs.conf` with the given start flags (server, sched, comm, mom).
pub fn write_conf(dir: &TempDir, flags: [u8; 4], extra: &str) -> PathBuf {
    let [server, sched, comm, mom] = flags;
    let content = format!(
        "PBS_START_SERVER={server}\nPBS_START_SCHED={sched}\nPBS_START_COMM={comm}\nPBS_START_MOM={mom}\n{extra}"
    );
    let path = dir.path().join("pbs.conf");
    fs::write(&path, content).unwrap();
    path
}

/// Install a fake daemon script under `<exec>/sbin`.
#[cfg(unix)]
#[allow(dead_code)]
pub fn install_daemon(exec: &Path, daemon: &str, exit_code: i32) {
    use std::os::unix::fs::PermissionsExt;

    let sbin = exec.join("sbin");
    fs::create_dir_all(&sbin).unwrap();
    let path = sbin.join(daemon);
    fs::write(&path, format!("#!/bin/sh\nexit {exit_code}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
}
