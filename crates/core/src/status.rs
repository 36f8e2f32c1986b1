// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process status codes for the supervision state machine.

use std::fmt;

/// Lifecycle state of one supervised OS child.
///
/// `Unmonitored` is the clean terminal state, `Unknown` the error sink.
/// `Stopped` is transient: it marks a detected crash before the recovery
/// attempt transitions back to `Starting`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStatus {
    Unmonitored,
    Unknown,
    Starting,
    Up,
    Stopping,
    Stopped,
    Draining,
}

impl ProcessStatus {
    /// Numeric code carried on the wire and in notifications.
    pub fn code(self) -> i32 {
        match self {
            ProcessStatus::Unmonitored => 0,
            ProcessStatus::Unknown => 1,
            ProcessStatus::Starting => 2,
            ProcessStatus::Up => 3,
            ProcessStatus::Stopping => 4,
            ProcessStatus::Stopped => 5,
            ProcessStatus::Draining => 6,
        }
    }

    /// Human-readable name shown in listings and logs.
    pub fn message(self) -> &'static str {
        match self {
            ProcessStatus::Unmonitored => "unmonitored",
            ProcessStatus::Unknown => "unknown",
            ProcessStatus::Starting => "starting",
            ProcessStatus::Up => "up",
            ProcessStatus::Stopping => "stopping",
            ProcessStatus::Stopped => "stopped",
            ProcessStatus::Draining => "draining",
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(ProcessStatus::Unmonitored),
            1 => Some(ProcessStatus::Unknown),
            2 => Some(ProcessStatus::Starting),
            3 => Some(ProcessStatus::Up),
            4 => Some(ProcessStatus::Stopping),
            5 => Some(ProcessStatus::Stopped),
            6 => Some(ProcessStatus::Draining),
            _ => None,
        }
    }
}

impl Default for ProcessStatus {
    fn default() -> Self {
        ProcessStatus::Unmonitored
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
