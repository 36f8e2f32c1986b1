// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! PID files kept under `/tmp/goku/pids` for diagnostics and load-time
//! takeover checks.

use std::fs::OpenOptions;
use std::io::Write;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::paths::pid_path;

/// A small file holding one decimal PID.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The active PID file for a program: `<PID_DIR>/<name>.pid`.
    pub fn for_program(name: &str) -> Self {
        Self::new(pid_path(name))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored PID. Returns 0 on any I/O or parse error; a trailing
    /// newline is tolerated.
    pub fn read(&self) -> i32 {
        let Ok(data) = std::fs::read_to_string(&self.path) else {
            return 0;
        };
        data.trim().parse().unwrap_or(0)
    }

    /// Create or truncate the file with the decimal PID, mode 0660.
    pub fn write(&self, pid: i32) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o660)
            .open(&self.path)?;
        file.write_all(pid.to_string().as_bytes())
    }

    /// Remove the file. Missing file is success.
    pub fn delete(&self) -> bool {
        if !self.path.exists() {
            return true;
        }
        std::fs::remove_file(&self.path).is_ok()
    }

    /// Move `<name>.pid` to `<name>_<ts>.pid`, freeing the active slot for
    /// a replacement generation.
    pub fn rename(&self, timestamp: i64) -> std::io::Result<PidFile> {
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let renamed = self
            .path
            .with_file_name(format!("{}_{}.pid", stem, timestamp));
        std::fs::rename(&self.path, &renamed)?;
        Ok(PidFile::new(renamed))
    }
}

#[cfg(test)]
#[path = "pidfile_tests.rs"]
mod tests;
