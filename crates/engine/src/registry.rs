// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process-wide collection of ProcessSets, bootstrapped from a directory of
//! TOML files and extended at runtime via the Load RPC.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use goku_core::{read_config, ProcessSetSnapshot};

use crate::error::EngineError;
use crate::notifier::EventSender;
use crate::paths::{ensure_runtime_dirs, pid_path, PID_DIR};
use crate::pidfile::PidFile;
use crate::process::{pid_alive, pid_command};
use crate::process_set::ProcessSet;
use crate::spawn::SpawnLock;

/// What the on-disk PID files say about a program we are about to take
/// over: generations found alive and adoptable.
#[derive(Default)]
struct PidProbe {
    active: Option<i32>,
    draining: Vec<i32>,
}

/// The daemon's set collection, keyed by unique program name.
pub struct Registry {
    config_dir: PathBuf,
    autorecover: bool,
    events: EventSender,
    spawn_lock: SpawnLock,
    sets: Mutex<Vec<Arc<ProcessSet>>>,
}

impl Registry {
    pub fn new(config_dir: PathBuf, autorecover: bool, events: EventSender) -> Arc<Self> {
        Arc::new(Self {
            config_dir,
            autorecover,
            events,
            spawn_lock: SpawnLock::new(),
            sets: Mutex::new(Vec::new()),
        })
    }

    /// Bootstrap: decode every `*.toml` in the configuration directory
    /// concurrently and admit the sets that pass the PID takeover check.
    /// Failures are logged and skipped, never fatal.
    pub async fn load_all(self: &Arc<Self>, autostart: bool) {
        if let Err(err) = ensure_runtime_dirs() {
            warn!(error = %err, "cannot create runtime directories");
        }

        let files = match list_config_files(&self.config_dir) {
            Ok(files) => files,
            Err(err) => {
                error!(dir = %self.config_dir.display(), error = %err, "cannot list configurations");
                return;
            }
        };

        info!(dir = %self.config_dir.display(), count = files.len(), "loading configurations");

        let handles: Vec<_> = files
            .into_iter()
            .map(|file| {
                let registry = Arc::clone(self);
                tokio::spawn(async move {
                    match registry.load_file(&file).await {
                        Ok(set) => {
                            if autostart {
                                if let Err(err) = set.start().await {
                                    error!(name = set.name(), error = %err, "autostart failed");
                                }
                            }
                        }
                        Err(err) => {
                            error!(file = %file.display(), error = %err, "configuration not loaded")
                        }
                    }
                })
            })
            .collect();

        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Load one configuration by file basename from the daemon's directory.
    pub async fn load(self: &Arc<Self>, basename: &str) -> Result<ProcessSetSnapshot, EngineError> {
        let set = self.load_file(&self.config_dir.join(basename)).await?;
        Ok(set.snapshot().await)
    }

    async fn load_file(self: &Arc<Self>, path: &Path) -> Result<Arc<ProcessSet>, EngineError> {
        let config = read_config(path)?;

        let probe = verify_pids(&config.name, &config.command, self.autorecover)?;

        let set = ProcessSet::from_config(
            &config,
            path.to_path_buf(),
            self.events.clone(),
            self.spawn_lock.clone(),
            self.autorecover,
        );

        {
            let mut sets = self.sets.lock().await;
            if sets.iter().any(|existing| existing.name() == config.name) {
                return Err(EngineError::DuplicateName(config.name));
            }
            sets.push(Arc::clone(&set));
        }

        if let Some(pid) = probe.active {
            info!(name = set.name(), pid, "recovering live process");
            set.adopt_active(pid).await;
        }
        for pid in probe.draining {
            info!(name = set.name(), pid, "recovering draining process");
            set.adopt_draining(pid).await;
        }

        info!(name = set.name(), file = %path.display(), "configuration loaded");
        Ok(set)
    }

    /// Look a set up by its unique name.
    pub async fn find(&self, name: &str) -> Option<Arc<ProcessSet>> {
        let sets = self.sets.lock().await;
        sets.iter().find(|set| set.name() == name).cloned()
    }

    /// Snapshots of every admitted set.
    pub async fn snapshots(&self) -> Vec<ProcessSetSnapshot> {
        let sets: Vec<Arc<ProcessSet>> = self.sets.lock().await.clone();
        let mut snapshots = Vec::with_capacity(sets.len());
        for set in sets {
            snapshots.push(set.snapshot().await);
        }
        snapshots
    }

    /// Retire every set. Used on daemon shutdown.
    pub async fn sunset_all(&self) {
        let sets: Vec<Arc<ProcessSet>> = self.sets.lock().await.clone();
        let handles: Vec<_> = sets
            .into_iter()
            .map(|set| tokio::spawn(async move { set.sunset().await }))
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }
}

/// All `*.toml` files in a directory, sorted for stable load order.
pub(crate) fn list_config_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.extension().map(|ext| ext == "toml").unwrap_or(false))
        .collect();
    files.sort();
    Ok(files)
}

/// Takeover guard run before a set is admitted.
///
/// A live PID recorded for this program refuses the load, unless
/// autorecover is on and the PID is running the configured command — then
/// it is adopted instead of re-spawned. A live PID under a different
/// command always refuses.
fn verify_pids(name: &str, command: &str, autorecover: bool) -> Result<PidProbe, EngineError> {
    let mut probe = PidProbe::default();

    let active = PidFile::new(pid_path(name));
    if let Some(pid) = live_pid(&active, command)? {
        if !autorecover {
            return Err(EngineError::PidInUse {
                pid,
                path: active.path().to_path_buf(),
            });
        }
        probe.active = Some(pid);
    }

    for path in drained_pid_files(name) {
        let pidfile = PidFile::new(&path);
        if let Some(pid) = live_pid(&pidfile, command)? {
            if !autorecover {
                return Err(EngineError::PidInUse { pid, path });
            }
            probe.draining.push(pid);
        }
    }

    Ok(probe)
}

/// The live PID recorded in a file, if any. Errors when the PID is running
/// a different command than the one configured.
fn live_pid(pidfile: &PidFile, command: &str) -> Result<Option<i32>, EngineError> {
    let pid = pidfile.read();
    if pid == 0 || !pid_alive(pid) {
        return Ok(None);
    }

    let expected = command.rsplit('/').next().unwrap_or(command);
    if let Some(found) = pid_command(pid) {
        if found != expected {
            return Err(EngineError::PidCommandMismatch { pid, found });
        }
    }

    Ok(Some(pid))
}

/// Drained-generation PID files: `<name>_<ts>.pid`.
fn drained_pid_files(name: &str) -> Vec<PathBuf> {
    let prefix = format!("{}_", name);
    let Ok(entries) = std::fs::read_dir(PID_DIR) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().map(|ext| ext == "pid").unwrap_or(false)
                && path
                    .file_stem()
                    .and_then(|stem| stem.to_str())
                    .map(|stem| {
                        stem.strip_prefix(&prefix)
                            .map(|ts| !ts.is_empty() && ts.chars().all(|c| c.is_ascii_digit()))
                            .unwrap_or(false)
                    })
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
