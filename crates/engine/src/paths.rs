// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! On-disk layout for runtime state: per-run log files and PID files.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

/// Per-run stdout/stderr capture files live here.
pub const LOG_DIR: &str = "/tmp/goku/logs";

/// Active and draining PID files live here.
pub const PID_DIR: &str = "/tmp/goku/pids";

/// Create the runtime directories, world-writable so children running under
/// other users can be managed.
pub fn ensure_runtime_dirs() -> std::io::Result<()> {
    for dir in [LOG_DIR, PID_DIR] {
        fs::create_dir_all(dir)?;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o777))?;
    }
    Ok(())
}

/// Path of one per-run capture file: `<name>_<ts>_{stdout,stderr}.log`.
pub(crate) fn log_path(name: &str, timestamp: i64, stream: &str) -> PathBuf {
    PathBuf::from(LOG_DIR).join(format!("{}_{}_{}.log", name, timestamp, stream))
}

/// Path of the active PID file for a program.
pub(crate) fn pid_path(name: &str) -> PathBuf {
    PathBuf::from(PID_DIR).join(format!("{}.pid", name))
}
