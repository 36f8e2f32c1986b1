// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn sample_process(status: ProcessStatus) -> ProcessSnapshot {
    ProcessSnapshot {
        uid: "uid-1".to_string(),
        pid: 4242,
        timestamp: 1_700_000_000,
        last_action_at: 1_700_000_100,
        status: status.into(),
    }
}

fn sample_set(active: Option<ProcessSnapshot>) -> ProcessSetSnapshot {
    ProcessSetSnapshot {
        name: "web".to_string(),
        callback_id: "cb".to_string(),
        tags: vec!["edge".to_string()],
        command: "sleep".to_string(),
        args: vec!["5".to_string()],
        directory: "/tmp".to_string(),
        use_env: true,
        envs: vec![],
        allow_drain: false,
        user: String::new(),
        group: String::new(),
        use_std_pipe: false,
        active,
        draining: vec![],
    }
}

#[test]
fn status_tuple_from_process_status() {
    let tuple: StatusTuple = ProcessStatus::Up.into();
    assert_eq!(tuple.code, 3);
    assert_eq!(tuple.message, "up");
}

#[test]
fn set_status_follows_active() {
    let set = sample_set(Some(sample_process(ProcessStatus::Up)));
    assert_eq!(set.status().message, "up");
    assert_eq!(set.pid(), 4242);
}

#[test]
fn set_without_active_is_unmonitored() {
    let set = sample_set(None);
    assert_eq!(set.status().code, 0);
    assert_eq!(set.status().message, "unmonitored");
    assert_eq!(set.pid(), 0);
}

#[test]
fn snapshot_round_trips_through_json() {
    let set = sample_set(Some(sample_process(ProcessStatus::Draining)));
    let json = serde_json::to_string(&set).unwrap();
    let back: ProcessSetSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, set);
}
