// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Managed-program configuration records, decoded from TOML files.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::instruction::InstructionSpec;

/// Errors from reading or decoding a program configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("cannot decode {path}: {source}")]
    Decode {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// One managed program as declared by the operator.
///
/// `name` and `command` are required; everything else defaults. The record
/// is immutable per load — reload re-reads the file and produces a fresh
/// record.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
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
    pub stop_sequence: Vec<InstructionSpec>,
    #[serde(default)]
    pub drain_signal: Option<InstructionSpec>,
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
}

/// Read and decode one program configuration file.
pub fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&data).map_err(|source| ConfigError::Decode {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
