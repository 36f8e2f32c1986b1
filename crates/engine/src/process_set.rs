// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The cohort for one managed program: at most one active generation plus
//! any number of older generations still draining.
//!
//! Every public lifecycle method serializes on the set's async mutex and
//! holds it across the waits it contains, so concurrent transitions observe
//! each other's state instead of racing.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::{info, warn};

use goku_core::{read_config, Config, ProcessSetSnapshot};

use crate::error::EngineError;
use crate::notifier::EventSender;
use crate::process::{Process, ProgramSpec};
use crate::spawn::SpawnLock;

/// Grace between draining the old active and spawning its replacement, so
/// the drain signal lands before the new generation takes traffic.
const RECYCLE_GRACE: Duration = Duration::from_secs(1);

struct SetState {
    spec: ProgramSpec,
    active: Option<Arc<Process>>,
    draining: Vec<Arc<Process>>,
}

/// Cohort orchestration for one program name.
pub struct ProcessSet {
    name: String,
    config_path: PathBuf,
    events: EventSender,
    spawn_lock: SpawnLock,
    /// Passed through to every generation: recover unintentional exits.
    recover: bool,
    state: Mutex<SetState>,
}

impl ProcessSet {
    /// Build a fresh set from a decoded configuration record. Fields are
    /// copied; the path is kept for reload.
    pub fn from_config(
        config: &Config,
        config_path: PathBuf,
        events: EventSender,
        spawn_lock: SpawnLock,
        recover: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: config.name.clone(),
            config_path,
            events,
            spawn_lock,
            recover,
            state: Mutex::new(SetState {
                spec: ProgramSpec::from_config(config),
                active: None,
                draining: Vec::new(),
            }),
        })
    }

    /// The program name this set was loaded under.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn build_process(self: &Arc<Self>, spec: ProgramSpec) -> Arc<Process> {
        Process::new(
            spec,
            Arc::downgrade(self),
            self.events.clone(),
            self.spawn_lock.clone(),
            self.recover,
        )
    }

    // not thread-safe, call with the state lock held
    fn do_start(self: &Arc<Self>, state: &mut SetState) -> Result<(), EngineError> {
        if state.active.is_some() {
            return Err(EngineError::AlreadyStarted);
        }

        let process = self.build_process(state.spec.clone());
        process.start()?;
        state.active = Some(process);
        Ok(())
    }

    /// Start a new active generation.
    pub async fn start(self: &Arc<Self>) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        self.do_start(&mut state)
    }

    /// Stop the active generation and clear the slot.
    pub async fn stop(&self) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let active = state.active.clone().ok_or(EngineError::NotStarted)?;

        active.stop().await?;
        state.active = None;
        Ok(())
    }

    /// Stop every generation, draining included, concurrently. Errors are
    /// collected, not short-circuited.
    pub async fn stop_all(&self) -> Vec<EngineError> {
        let mut state = self.state.lock().await;
        self.stop_all_locked(&mut state).await
    }

    // not thread-safe, call with the state lock held
    async fn stop_all_locked(&self, state: &mut SetState) -> Vec<EngineError> {
        let mut processes: Vec<Arc<Process>> = state.draining.clone();
        if let Some(active) = state.active.take() {
            processes.push(active);
        }

        let handles: Vec<_> = processes
            .into_iter()
            .map(|process| tokio::spawn(async move { process.stop().await }))
            .collect();

        let mut errors = Vec::new();
        for handle in handles {
            if let Ok(Err(err)) = handle.await {
                errors.push(err);
            }
        }
        errors
    }

    /// Zero-downtime replacement: drain the old active in the background,
    /// move it to the draining cohort, and start a successor after a short
    /// grace.
    pub async fn recycle(self: &Arc<Self>) -> Result<(), EngineError> {
        let mut state = self.state.lock().await;
        let old = state.active.take().ok_or(EngineError::NotStarted)?;
        state.draining.push(Arc::clone(&old));

        let name = self.name.clone();
        tokio::spawn(async move {
            if let Err(err) = old.drain(true).await {
                warn!(name = %name, error = %err, "drain of recycled process failed");
            }
        });

        tokio::time::sleep(RECYCLE_GRACE).await;
        self.do_start(&mut state)
    }

    /// Re-read the configuration file. Changes to the identity of the child
    /// (command, name, directory, environment, user, group) force a full
    /// restart; anything else is refreshed in place.
    pub async fn reload(self: &Arc<Self>) -> Result<(), EngineError> {
        let config = read_config(&self.config_path)?;
        let new_spec = ProgramSpec::from_config(&config);

        let mut state = self.state.lock().await;
        if requires_restart(&state.spec, &new_spec) {
            info!(name = %self.name, "reload requires restart");
            for err in self.stop_all_locked(&mut state).await {
                warn!(name = %self.name, error = %err, "stop during reload failed");
            }
            state.spec = new_spec;
            return self.do_start(&mut state);
        }

        info!(name = %self.name, "reload applied in place");
        state.spec.tags = new_spec.tags;
        state.spec.allow_drain = new_spec.allow_drain;
        state.spec.use_std_pipe = new_spec.use_std_pipe;
        state.spec.drain_signal = new_spec.drain_signal;
        state.spec.args = new_spec.args;
        state.spec.stop_sequence = new_spec.stop_sequence;
        Ok(())
    }

    /// Drop the drained generation with this UID. Called by a process's
    /// reaper once it has fully retired; no-op for unknown UIDs.
    pub async fn remove_drained(&self, uid: &str) {
        let mut state = self.state.lock().await;
        state.draining.retain(|process| process.uid() != uid);
    }

    /// Retire every generation regardless of drain policy. Used when the
    /// daemon shuts down.
    pub async fn sunset(&self) {
        let mut state = self.state.lock().await;
        let mut processes: Vec<Arc<Process>> = state.draining.clone();
        state.draining.clear();
        if let Some(active) = state.active.take() {
            processes.push(active);
        }
        drop(state);

        let handles: Vec<_> = processes
            .into_iter()
            .map(|process| tokio::spawn(async move { process.sunset().await }))
            .collect();
        for handle in handles {
            let _ = handle.await;
        }
    }

    /// Take over a pre-existing live child as the active generation.
    pub(crate) async fn adopt_active(self: &Arc<Self>, pid: i32) {
        let mut state = self.state.lock().await;
        let process = self.build_process(state.spec.clone());
        process.adopt(pid);
        state.active = Some(process);
    }

    /// Take over a pre-existing live child as a draining generation.
    pub(crate) async fn adopt_draining(self: &Arc<Self>, pid: i32) {
        let mut state = self.state.lock().await;
        let process = self.build_process(state.spec.clone());
        process.adopt(pid);
        state.draining.push(process);
    }

    /// Transport-safe copy of the descriptive fields plus generation
    /// summaries.
    pub async fn snapshot(&self) -> ProcessSetSnapshot {
        let state = self.state.lock().await;
        ProcessSetSnapshot {
            name: state.spec.name.clone(),
            callback_id: state.spec.callback_id.clone(),
            tags: state.spec.tags.clone(),
            command: state.spec.command.clone(),
            args: state.spec.args.clone(),
            directory: state.spec.directory.clone(),
            use_env: state.spec.use_env,
            envs: state.spec.envs.clone(),
            allow_drain: state.spec.allow_drain,
            user: state.spec.user.clone(),
            group: state.spec.group.clone(),
            use_std_pipe: state.spec.use_std_pipe,
            active: state.active.as_ref().map(|process| process.snapshot()),
            draining: state
                .draining
                .iter()
                .map(|process| process.snapshot())
                .collect(),
        }
    }
}

/// True when the new configuration changes fields the running child was
/// built from, so an in-place refresh is not enough.
fn requires_restart(old: &ProgramSpec, new: &ProgramSpec) -> bool {
    old.command != new.command
        || old.name != new.name
        || old.directory != new.directory
        || old.use_env != new.use_env
        || old.envs != new.envs
        || old.user != new.user
        || old.group != new.group
}

#[cfg(test)]
#[path = "process_set_tests.rs"]
mod tests;
