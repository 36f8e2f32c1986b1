// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Transport-safe snapshots of supervised state, carried over the control
//! plane and rendered by the client.

use serde::{Deserialize, Serialize};

use crate::status::ProcessStatus;

/// `{code, message}` pair for a process status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusTuple {
    pub code: i32,
    pub message: String,
}

impl From<ProcessStatus> for StatusTuple {
    fn from(status: ProcessStatus) -> Self {
        Self {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}

/// Summary of one OS child: identity, liveness timestamps and status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSnapshot {
    pub uid: String,
    pub pid: i32,
    /// Unix seconds of the generation's start.
    pub timestamp: i64,
    /// Unix seconds of the last observed state transition.
    pub last_action_at: u64,
    pub status: StatusTuple,
}

/// Snapshot of a whole program cohort: the descriptive configuration subset
/// plus summaries of the active and draining generations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSetSnapshot {
    pub name: String,
    #[serde(default)]
    pub callback_id: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub directory: String,
    #[serde(default)]
    pub use_env: bool,
    #[serde(default)]
    pub envs: Vec<String>,
    #[serde(default)]
    pub allow_drain: bool,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub use_std_pipe: bool,
    pub active: Option<ProcessSnapshot>,
    #[serde(default)]
    pub draining: Vec<ProcessSnapshot>,
}

impl ProcessSetSnapshot {
    /// Set-level status shown in listings: the active generation's status,
    /// or "unmonitored" when nothing is running.
    pub fn status(&self) -> StatusTuple {
        match &self.active {
            Some(active) => active.status.clone(),
            None => ProcessStatus::Unmonitored.into(),
        }
    }

    /// PID shown in listings; 0 when nothing is active.
    pub fn pid(&self) -> i32 {
        self.active.as_ref().map(|a| a.pid).unwrap_or(0)
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
