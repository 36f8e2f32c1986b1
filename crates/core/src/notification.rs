// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Flattened state-change record posted to the HTTP callback.

use serde::{Deserialize, Serialize};

/// Snapshot of one process state transition. Emitted by the supervision
/// path on every `set_status`; the notifier forwards only edges where
/// `last_status != status_code`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub uid: String,
    pub name: String,
    pub callback_id: String,
    pub tags: Vec<String>,
    pub pid: i32,
    /// Unix seconds of the transition.
    pub last_action_at: u64,
    pub last_status: i32,
    pub status_code: i32,
}

impl Notification {
    /// True when the status actually changed.
    pub fn is_edge(&self) -> bool {
        self.last_status != self.status_code
    }
}

#[cfg(test)]
#[path = "notification_tests.rs"]
mod tests;
