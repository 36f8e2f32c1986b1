// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawn-time helpers: executable resolution, identity lookups, per-run
//! capture files, and the process-wide lock serializing identity-switching
//! spawns.

use std::fs::{File, OpenOptions};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::EngineError;

/// Serializes spawns that switch uid/gid, so at most one child is launched
/// under an identity override at a time. Passed in explicitly so tests can
/// build their own.
#[derive(Clone, Default)]
pub struct SpawnLock(Arc<tokio::sync::Mutex<()>>);

impl SpawnLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self) -> tokio::sync::MutexGuard<'_, ()> {
        self.0.lock().await
    }
}

/// Resolve a command against PATH. Commands containing a separator, and
/// commands that cannot be resolved, are returned as given — the caller may
/// have supplied an absolute path.
pub(crate) fn lookup_path(command: &str) -> PathBuf {
    if command.contains('/') {
        return PathBuf::from(command);
    }

    if let Some(paths) = std::env::var_os("PATH") {
        for dir in std::env::split_paths(&paths) {
            let candidate = dir.join(command);
            if candidate.is_file() {
                return candidate;
            }
        }
    }

    PathBuf::from(command)
}

/// Resolve a user name to its uid via the passwd database.
pub(crate) fn lookup_user_id(user: &str) -> Result<u32, EngineError> {
    match nix::unistd::User::from_name(user) {
        Ok(Some(entry)) => Ok(entry.uid.as_raw()),
        _ => Err(EngineError::UserLookup(user.to_string())),
    }
}

/// Resolve a group name to its gid by scanning `/etc/group`.
pub(crate) fn lookup_group_id(group: &str) -> Result<u32, EngineError> {
    lookup_group_id_in(Path::new("/etc/group"), group)
}

// lines look like `name:x:gid:members`
pub(crate) fn lookup_group_id_in(path: &Path, group: &str) -> Result<u32, EngineError> {
    let data =
        std::fs::read_to_string(path).map_err(|_| EngineError::GroupLookup(group.to_string()))?;

    for line in data.lines() {
        let fields: Vec<&str> = line.split(':').collect();
        if fields.len() >= 3 && fields[0] == group {
            return fields[2]
                .parse()
                .map_err(|_| EngineError::GroupLookup(group.to_string()));
        }
    }

    Err(EngineError::GroupLookup(group.to_string()))
}

/// Open a per-run capture file: created if missing, append-only, mode 0660.
pub(crate) fn open_log_file(path: &Path) -> std::io::Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .mode(0o660)
        .open(path)
}

#[cfg(test)]
#[path = "spawn_tests.rs"]
mod tests;
