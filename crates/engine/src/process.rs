// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! One supervised OS child: spawn, signal, liveness, wait-reap, and bounded
//! crash recovery.
//!
//! A `Process` is owned by its `ProcessSet`; the back-reference here is a
//! weak handle used for exactly one thing — asking the set to drop this
//! process from its draining list once the reaper has finished with it.

use std::process::Stdio;
use std::sync::{Arc, Weak};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use goku_core::{
    default_stop_sequence, signal_name, Config, Instruction, Notification, ProcessSnapshot,
    ProcessStatus,
};

use crate::error::EngineError;
use crate::notifier::EventSender;
use crate::paths::{ensure_runtime_dirs, log_path};
use crate::pidfile::PidFile;
use crate::process_set::ProcessSet;
use crate::spawn::{lookup_group_id, lookup_path, lookup_user_id, open_log_file, SpawnLock};

/// Cap on consecutive automatic recovery attempts for a flapping child.
pub const MAX_START_COUNTS: u32 = 5;

/// Pause after the post-sequence SIGKILL before the final liveness probe.
const KILL_SETTLE: Duration = Duration::from_millis(100);

/// Granularity of the early-exit poll inside a stop instruction's wait.
const EXIT_POLL: Duration = Duration::from_millis(50);

/// The descriptive subset shared by Config, ProcessSet and Process. Copied
/// (never referenced) at each hand-off so a reload cannot mutate a running
/// generation behind its back.
#[derive(Debug, Clone)]
pub struct ProgramSpec {
    pub name: String,
    pub callback_id: String,
    pub tags: Vec<String>,
    pub command: String,
    pub args: Vec<String>,
    pub directory: String,
    pub stop_sequence: Vec<Instruction>,
    pub drain_signal: Option<Instruction>,
    pub use_env: bool,
    pub envs: Vec<String>,
    pub allow_drain: bool,
    pub user: String,
    pub group: String,
    pub use_std_pipe: bool,
}

impl ProgramSpec {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.name.clone(),
            callback_id: config.callback_id.clone(),
            tags: config.tags.clone(),
            command: config.command.clone(),
            args: config.args.clone(),
            directory: config.directory.clone(),
            stop_sequence: config
                .stop_sequence
                .iter()
                .map(|spec| spec.to_instruction())
                .collect(),
            drain_signal: config.drain_signal.as_ref().map(|spec| spec.to_instruction()),
            use_env: config.use_env,
            envs: config.envs.clone(),
            allow_drain: config.allow_drain,
            user: config.user.clone(),
            group: config.group.clone(),
            use_std_pipe: config.use_std_pipe,
        }
    }

    /// The configured stop sequence, or the default quit-then-kill
    /// escalation when none was configured.
    pub fn effective_stop_sequence(&self) -> Vec<Instruction> {
        if self.stop_sequence.is_empty() {
            default_stop_sequence()
        } else {
            self.stop_sequence.clone()
        }
    }
}

#[derive(Default)]
struct ProcessInner {
    uid: String,
    pid: i32,
    /// Unix seconds of the current generation's start.
    timestamp: i64,
    status: ProcessStatus,
    last_status: ProcessStatus,
    last_action_at: u64,
    /// Automatic recovery attempts since the last intentional action.
    start_count: u32,
    /// Set by stop/drain so the reaper treats the exit as intentional.
    dont_recover: bool,
    pidfile: Option<PidFile>,
}

/// One OS child. A fresh UID is generated at every (re)start; crash
/// recovery restarts the same `Process` object in its set slot, but the new
/// generation is observable as a new UID.
pub struct Process {
    spec: ProgramSpec,
    owner: Weak<ProcessSet>,
    events: EventSender,
    spawn_lock: SpawnLock,
    /// Whether unintentional exits are recovered automatically. Set from
    /// the daemon's autorecover flag.
    recover: bool,
    inner: Mutex<ProcessInner>,
}

impl Process {
    pub fn new(
        spec: ProgramSpec,
        owner: Weak<ProcessSet>,
        events: EventSender,
        spawn_lock: SpawnLock,
        recover: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            spec,
            owner,
            events,
            spawn_lock,
            recover,
            inner: Mutex::new(ProcessInner::default()),
        })
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub fn uid(&self) -> String {
        self.inner.lock().uid.clone()
    }

    pub fn pid(&self) -> i32 {
        self.inner.lock().pid
    }

    pub fn status(&self) -> ProcessStatus {
        self.inner.lock().status
    }

    #[cfg(test)]
    pub(crate) fn start_count(&self) -> u32 {
        self.inner.lock().start_count
    }

    #[cfg(test)]
    pub(crate) fn force_uid(&self, uid: &str) {
        self.inner.lock().uid = uid.to_string();
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        let inner = self.inner.lock();
        ProcessSnapshot {
            uid: inner.uid.clone(),
            pid: inner.pid,
            timestamp: inner.timestamp,
            last_action_at: inner.last_action_at,
            status: inner.status.into(),
        }
    }

    /// Pure liveness probe: signal 0 to the recorded PID.
    pub fn is_alive(&self) -> bool {
        pid_alive(self.inner.lock().pid)
    }

    /// Record a state transition and emit it on the event channel. The sole
    /// status writer, so `last_status` edge detection stays coherent.
    fn set_status_locked(&self, inner: &mut ProcessInner, new_status: ProcessStatus) {
        debug!(
            name = %self.spec.name,
            uid = %inner.uid,
            from = %inner.status,
            to = %new_status,
            "status change"
        );
        inner.last_status = inner.status;
        inner.status = new_status;
        inner.last_action_at = unix_now();

        let notification = Notification {
            uid: inner.uid.clone(),
            name: self.spec.name.clone(),
            callback_id: self.spec.callback_id.clone(),
            tags: self.spec.tags.clone(),
            pid: inner.pid,
            last_action_at: inner.last_action_at,
            last_status: inner.last_status.code(),
            status_code: inner.status.code(),
        };
        let _ = self.events.send(notification);
    }

    fn set_status(&self, new_status: ProcessStatus) {
        let mut inner = self.inner.lock();
        self.set_status_locked(&mut inner, new_status);
    }

    /// Launch the child. Refuses when the previous generation is still
    /// alive. Returns once the spawn task is off; spawn failures surface as
    /// the `unknown` status.
    pub fn start(self: &Arc<Self>) -> Result<(), EngineError> {
        {
            let mut inner = self.inner.lock();
            if inner.pid != 0 && pid_alive(inner.pid) {
                return Err(EngineError::AlreadyRunning);
            }

            self.set_status_locked(&mut inner, ProcessStatus::Starting);
            inner.timestamp = unix_now() as i64;
            inner.uid = Uuid::new_v4().to_string();
            inner.pid = 0;

            info!(
                name = %self.spec.name,
                uid = %inner.uid,
                timestamp = inner.timestamp,
                "starting process"
            );
        }

        if let Err(err) = ensure_runtime_dirs() {
            warn!(error = %err, "cannot create runtime directories");
        }

        let process = Arc::clone(self);
        tokio::spawn(async move {
            match process.spawn_child().await {
                Ok(child) => {
                    process.set_status(ProcessStatus::Up);
                    let reaper = Arc::clone(&process);
                    tokio::spawn(async move { reaper.wait_for_child(child).await });
                }
                Err(err) => {
                    process.set_status(ProcessStatus::Unknown);
                    error!(
                        name = %process.spec.name,
                        uid = %process.uid(),
                        error = %err,
                        "failed to start"
                    );
                }
            }
        });

        Ok(())
    }

    async fn spawn_child(&self) -> Result<tokio::process::Child, EngineError> {
        let timestamp = self.inner.lock().timestamp;

        let full_path = lookup_path(&self.spec.command);
        debug!(command = %self.spec.command, resolved = %full_path.display(), "resolved command");

        let user_id = match self.spec.user.as_str() {
            "" => None,
            user => Some(lookup_user_id(user)?),
        };
        let group_id = match self.spec.group.as_str() {
            "" => None,
            group => Some(lookup_group_id(group)?),
        };

        let mut cmd = tokio::process::Command::new(&full_path);
        cmd.args(&self.spec.args);
        cmd.stdin(Stdio::inherit());
        cmd.kill_on_drop(false);

        if !self.spec.directory.is_empty() {
            cmd.current_dir(&self.spec.directory);
        }

        if !self.spec.use_env {
            cmd.env_clear();
            for entry in &self.spec.envs {
                if let Some((key, value)) = entry.split_once('=') {
                    cmd.env(key, value);
                }
            }
        }

        if self.spec.use_std_pipe {
            cmd.stdout(Stdio::inherit());
            cmd.stderr(Stdio::inherit());
        } else {
            let stdout = open_log_file(&log_path(&self.spec.name, timestamp, "stdout"))?;
            let stderr = open_log_file(&log_path(&self.spec.name, timestamp, "stderr"))?;
            cmd.stdout(stdout);
            cmd.stderr(stderr);
        }

        if let Some(uid) = user_id {
            cmd.uid(uid);
        }
        if let Some(gid) = group_id {
            cmd.gid(gid);
        }

        // Identity-switching spawns are serialized process-wide.
        let spawned = if user_id.is_some() || group_id.is_some() {
            let _guard = self.spawn_lock.acquire().await;
            cmd.spawn()
        } else {
            cmd.spawn()
        };

        let child = spawned.map_err(|source| EngineError::SpawnFailed {
            command: self.spec.command.clone(),
            source,
        })?;

        let pid = child.id().map(|id| id as i32).unwrap_or(0);
        let pidfile = PidFile::for_program(&self.spec.name);
        if let Err(err) = pidfile.write(pid) {
            warn!(path = %pidfile.path().display(), error = %err, "cannot write pid file");
        }

        {
            let mut inner = self.inner.lock();
            inner.pid = pid;
            inner.pidfile = Some(pidfile);
        }

        info!(name = %self.spec.name, uid = %self.uid(), pid, "process started");
        Ok(child)
    }

    /// Reaper: block on the child's wait, then recover or retire.
    async fn wait_for_child(self: Arc<Self>, mut child: tokio::process::Child) {
        info!(name = %self.spec.name, uid = %self.uid(), "watching for close");
        let _ = child.wait().await;
        self.on_exit(Some(child)).await;
    }

    /// Shared exit handling for reaped and adopted children.
    ///
    /// An exit while the status is not `stopping` — and recovery is neither
    /// exhausted nor disabled — is unintentional: the same slot restarts
    /// with a fresh UID. Everything else is the terminal path.
    async fn on_exit(self: Arc<Self>, child: Option<tokio::process::Child>) {
        let recover = {
            let mut inner = self.inner.lock();
            if self.recover
                && inner.status != ProcessStatus::Stopping
                && inner.start_count < MAX_START_COUNTS
                && !inner.dont_recover
            {
                self.set_status_locked(&mut inner, ProcessStatus::Stopped);
                inner.start_count += 1;
                true
            } else {
                false
            }
        };

        if recover {
            let attempt = self.inner.lock().start_count;
            info!(
                name = %self.spec.name,
                attempt,
                "unintentional exit, attempting recovery"
            );
            if let Err(err) = self.start() {
                error!(name = %self.spec.name, error = %err, "recovery start failed");
            }
            return;
        }

        if let Some(mut child) = child {
            let _ = child.start_kill();
        }

        let uid = {
            let mut inner = self.inner.lock();
            if let Some(pidfile) = inner.pidfile.take() {
                pidfile.delete();
            }
            self.set_status_locked(&mut inner, ProcessStatus::Unmonitored);
            inner.start_count = 0;
            inner.uid.clone()
        };

        if let Some(owner) = self.owner.upgrade() {
            owner.remove_drained(&uid).await;
        }

        info!(name = %self.spec.name, uid = %uid, "process closed");
    }

    /// Send a signal to the retained child.
    pub fn send_signal(&self, sig: Signal) -> Result<(), EngineError> {
        let pid = self.inner.lock().pid;
        if pid <= 0 {
            return Err(EngineError::NotRunning);
        }
        debug!(name = %self.spec.name, uid = %self.uid(), signal = signal_name(sig), "sending signal");
        signal::kill(Pid::from_raw(pid), sig).map_err(|source| EngineError::Signal { pid, source })
    }

    /// Send one instruction's signal and wait out its bound, returning
    /// early (true) as soon as the child is observed dead.
    pub async fn send_signal_and_wait(&self, instruction: Instruction) -> Result<bool, EngineError> {
        self.send_signal(instruction.signal)?;
        Ok(self.wait_for_exit(instruction.wait).await)
    }

    /// Poll liveness up to `bound`; true when the child died within it.
    async fn wait_for_exit(&self, bound: Duration) -> bool {
        let mut remaining = bound;
        loop {
            if !self.is_alive() {
                return true;
            }
            if remaining.is_zero() {
                return !self.is_alive();
            }
            let slice = remaining.min(EXIT_POLL);
            tokio::time::sleep(slice).await;
            remaining -= slice;
        }
    }

    /// Run the stop sequence, escalating to SIGKILL if it is exhausted.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let pid = self.inner.lock().pid;
        if !pid_alive(pid) {
            return Err(EngineError::NotRunning);
        }

        {
            let mut inner = self.inner.lock();
            inner.dont_recover = true;
            self.set_status_locked(&mut inner, ProcessStatus::Stopping);
        }

        for instruction in self.spec.effective_stop_sequence() {
            info!(
                name = %self.spec.name,
                signal = signal_name(instruction.signal),
                pid,
                "sending stop instruction"
            );

            let died = match self.send_signal_and_wait(instruction).await {
                Ok(died) => died,
                Err(err) => {
                    self.set_status(ProcessStatus::Unknown);
                    return Err(err);
                }
            };

            if died {
                self.set_status(ProcessStatus::Unmonitored);
                info!(name = %self.spec.name, uid = %self.uid(), "process stopped");
                return Ok(());
            }
        }

        if self.is_alive() {
            info!(name = %self.spec.name, uid = %self.uid(), "still running, using force");
            let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
            tokio::time::sleep(KILL_SETTLE).await;
        }

        if self.is_alive() {
            self.set_status(ProcessStatus::Unknown);
            return Err(EngineError::CannotStop);
        }

        self.set_status(ProcessStatus::Unmonitored);
        Ok(())
    }

    /// Tell the child to stop accepting new work. Renames the PID file so
    /// the active slot is free for a replacement. With `stop`, waits out
    /// the drain grace and then runs the stop sequence.
    pub async fn drain(&self, stop: bool) -> Result<(), EngineError> {
        if !self.is_alive() {
            return Err(EngineError::NotRunning);
        }

        let drain_signal = {
            let mut inner = self.inner.lock();
            inner.dont_recover = true;
            self.set_status_locked(&mut inner, ProcessStatus::Draining);

            let timestamp = inner.timestamp;
            if let Some(pidfile) = inner.pidfile.take() {
                match pidfile.rename(timestamp) {
                    Ok(renamed) => inner.pidfile = Some(renamed),
                    Err(err) => {
                        warn!(path = %pidfile.path().display(), error = %err, "cannot rename pid file");
                        inner.pidfile = Some(pidfile);
                    }
                }
            }

            self.spec.drain_signal
        };

        let Some(instruction) = drain_signal else {
            // no drain signal configured; nothing to announce
            if stop {
                self.stop().await?;
            }
            return Ok(());
        };

        if let Err(err) = self.send_signal(instruction.signal) {
            self.set_status(ProcessStatus::Unknown);
            return Err(err);
        }

        if stop {
            tokio::time::sleep(instruction.wait).await;
            self.stop().await?;
        }

        Ok(())
    }

    /// Best-effort retirement regardless of drain policy, used when the
    /// daemon itself is going away.
    pub async fn sunset(&self) {
        if !self.is_alive() {
            return;
        }

        self.inner.lock().dont_recover = true;

        if self.spec.allow_drain {
            if let Some(instruction) = self.spec.drain_signal {
                if self.send_signal(instruction.signal).is_ok() {
                    tokio::time::sleep(instruction.wait).await;
                }
            }
        }

        match self.stop().await {
            Ok(()) | Err(EngineError::NotRunning) => {}
            Err(err) => {
                warn!(name = %self.spec.name, error = %err, "sunset stop failed, forcing kill");
                let pid = self.inner.lock().pid;
                if pid > 0 {
                    let _ = signal::kill(Pid::from_raw(pid), Signal::SIGKILL);
                }
            }
        }
    }

    /// Take over a pre-existing child found alive at load time. No spawn
    /// happens; liveness is polled since the child is not ours to wait on.
    pub fn adopt(self: &Arc<Self>, pid: i32) {
        {
            let mut inner = self.inner.lock();
            inner.pid = pid;
            inner.timestamp = unix_now() as i64;
            inner.uid = Uuid::new_v4().to_string();
            inner.pidfile = Some(PidFile::for_program(&self.spec.name));
            self.set_status_locked(&mut inner, ProcessStatus::Up);
        }

        info!(name = %self.spec.name, pid, "adopted running process");

        let process = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(1)).await;
                if !process.is_alive() {
                    break;
                }
            }
            process.on_exit(None).await;
        });
    }
}

/// Signal-0 probe for an arbitrary PID.
pub(crate) fn pid_alive(pid: i32) -> bool {
    pid > 0 && signal::kill(Pid::from_raw(pid), None).is_ok()
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Basename of the command a PID is running, from procfs. `None` when the
/// probe is unavailable (no procfs, no permission).
pub(crate) fn pid_command(pid: i32) -> Option<String> {
    let data = std::fs::read(format!("/proc/{}/cmdline", pid)).ok()?;
    let first = data.split(|b| *b == 0).next()?;
    let arg0 = String::from_utf8_lossy(first);
    let basename = arg0.rsplit('/').next().unwrap_or(&arg0);
    if basename.is_empty() {
        return None;
    }
    Some(basename.to_string())
}

#[cfg(test)]
#[path = "process_tests.rs"]
mod tests;
