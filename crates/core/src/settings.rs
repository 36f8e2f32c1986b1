// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared daemon/client settings from `$HOME/.goku/goku.toml`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::ConfigError;

/// Settings shared by `gokud` and the `goku` client. A missing file yields
/// the defaults; a present but undecodable file is an error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Address the control plane binds and the client dials.
    pub server_address: String,
    /// Control plane TCP port.
    pub server_port: u16,
    /// Outbound endpoint for state-change notifications, if any.
    pub http_notifier_endpoint: Option<String>,
    /// Error-reporting API key echoed from the original deployment tooling.
    pub honeybadger_api: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_address: "127.0.0.1".to_string(),
            server_port: 9800,
            http_notifier_endpoint: None,
            honeybadger_api: "2188ca35".to_string(),
        }
    }
}

impl Settings {
    /// Load from `$HOME/.goku/goku.toml`.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&goku_home().join("goku.toml"))
    }

    /// Load from an explicit path. Missing file means defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        toml::from_str(&data).map_err(|source| ConfigError::Decode {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `host:port` address of the control plane.
    pub fn control_addr(&self) -> String {
        format!("{}:{}", self.server_address, self.server_port)
    }
}

/// The goku settings directory, `$HOME/.goku`.
pub fn goku_home() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".goku")
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
