// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Prefix-insensitive process name resolution for `-p`.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ResolveError {
    #[error("no match found for {0}")]
    NoMatch(String),

    #[error("more than one match found for {0}")]
    Ambiguous(String),
}

/// Find `query` in `names`, case-insensitively. An exact match wins; failing
/// that, a single unique prefix match. Zero or multiple candidates is an
/// error.
pub fn fuzzy_find(names: &[String], query: &str) -> Result<usize, ResolveError> {
    let wanted = query.to_lowercase();

    let exact: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.to_lowercase() == wanted)
        .map(|(i, _)| i)
        .collect();

    match exact.len() {
        1 => return Ok(exact[0]),
        n if n > 1 => return Err(ResolveError::Ambiguous(query.to_string())),
        _ => {}
    }

    let prefixed: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| name.to_lowercase().starts_with(&wanted))
        .map(|(i, _)| i)
        .collect();

    match prefixed.len() {
        0 => Err(ResolveError::NoMatch(query.to_string())),
        1 => Ok(prefixed[0]),
        _ => Err(ResolveError::Ambiguous(query.to_string())),
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
