// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the supervision engine

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by process, set and registry operations. Precondition
/// violations are returned to the control-plane caller verbatim; spawn-time
/// failures additionally push the process into the `unknown` status.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("process is already running")]
    AlreadyRunning,

    #[error("process is not running")]
    NotRunning,

    #[error("process is already started")]
    AlreadyStarted,

    #[error("no process is started")]
    NotStarted,

    #[error("user not found: {0}")]
    UserLookup(String),

    #[error("group not found: {0}")]
    GroupLookup(String),

    #[error("cannot spawn {command}: {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("cannot signal pid {pid}: {source}")]
    Signal { pid: i32, source: nix::Error },

    #[error("cannot stop the process")]
    CannotStop,

    #[error("process not found: {0}")]
    ProcessNotFound(String),

    #[error("duplicate process name: {0}")]
    DuplicateName(String),

    #[error("pid {pid} from {path} is still running")]
    PidInUse { pid: i32, path: PathBuf },

    #[error("pid {pid} is running a different command: {found}")]
    PidCommandMismatch { pid: i32, found: String },

    #[error(transparent)]
    Config(#[from] goku_core::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
