// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[parameterized(
    exact = { &["web", "worker"], "web", 0 },
    exact_case_insensitive = { &["Web", "worker"], "web", 0 },
    unique_prefix = { &["web", "database"], "da", 1 },
    exact_wins_over_prefix = { &["web", "web-admin"], "web", 0 },
)]
fn resolves(names_list: &[&str], query: &str, expected: usize) {
    assert_eq!(fuzzy_find(&names(names_list), query), Ok(expected));
}

#[test]
fn no_match_is_an_error() {
    assert_eq!(
        fuzzy_find(&names(&["web"]), "api"),
        Err(ResolveError::NoMatch("api".to_string()))
    );
}

#[test]
fn ambiguous_prefix_is_an_error() {
    assert_eq!(
        fuzzy_find(&names(&["worker-a", "worker-b"]), "worker"),
        Err(ResolveError::Ambiguous("worker".to_string()))
    );
}

#[test]
fn duplicate_exact_matches_are_ambiguous() {
    assert_eq!(
        fuzzy_find(&names(&["Web", "web"]), "web"),
        Err(ResolveError::Ambiguous("web".to_string()))
    );
}

#[test]
fn empty_name_list_never_matches() {
    assert_eq!(
        fuzzy_find(&[], "web"),
        Err(ResolveError::NoMatch("web".to_string()))
    );
}
