// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::notifier::{notification_channel, EventReceiver};
use std::time::Instant;

fn spec(name: &str, command: &str, args: &[&str]) -> ProgramSpec {
    ProgramSpec {
        name: name.to_string(),
        callback_id: String::new(),
        tags: Vec::new(),
        command: command.to_string(),
        args: args.iter().map(|a| a.to_string()).collect(),
        directory: String::new(),
        stop_sequence: Vec::new(),
        drain_signal: None,
        use_env: true,
        envs: Vec::new(),
        allow_drain: false,
        user: String::new(),
        group: String::new(),
        use_std_pipe: false,
    }
}

fn build(spec: ProgramSpec) -> (Arc<Process>, EventReceiver) {
    build_with_recover(spec, false)
}

fn build_with_recover(spec: ProgramSpec, recover: bool) -> (Arc<Process>, EventReceiver) {
    let (tx, rx) = notification_channel();
    (
        Process::new(spec, Weak::new(), tx, SpawnLock::new(), recover),
        rx,
    )
}

async fn wait_for_status(process: &Arc<Process>, wanted: ProcessStatus, deadline: Duration) {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if process.status() == wanted {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!(
        "status never became {}, still {}",
        wanted,
        process.status()
    );
}

#[tokio::test]
async fn clean_start_then_natural_exit() {
    let (process, mut events) = build(spec("proc-clean-exit", "sleep", &["1"]));

    process.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(process.is_alive());
    assert_eq!(process.status(), ProcessStatus::Up);
    assert!(process.pid() > 0);
    assert!(!process.uid().is_empty());

    tokio::time::sleep(Duration::from_millis(1200)).await;
    assert!(!process.is_alive());
    assert_eq!(process.status(), ProcessStatus::Unmonitored);

    // starting -> up -> unmonitored, all edges
    let mut codes = Vec::new();
    while let Ok(n) = events.try_recv() {
        assert!(n.is_edge());
        codes.push(n.status_code);
    }
    assert_eq!(codes, vec![2, 3, 0]);
}

#[tokio::test]
async fn start_refuses_running_process() {
    let (process, _events) = build(spec("proc-double-start", "sleep", &["3"]));

    process.start().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(matches!(
        process.start(),
        Err(EngineError::AlreadyRunning)
    ));

    process.stop().await.unwrap();
}

#[tokio::test]
async fn stop_before_start_is_not_running() {
    let (process, _events) = build(spec("proc-stop-fresh", "sleep", &["1"]));
    assert!(matches!(process.stop().await, Err(EngineError::NotRunning)));
}

#[tokio::test]
async fn stop_after_exit_is_not_running() {
    let (process, _events) = build(spec("proc-stop-dead", "true", &[]));

    process.start().unwrap();
    wait_for_status(&process, ProcessStatus::Unmonitored, Duration::from_secs(3)).await;

    assert!(matches!(process.stop().await, Err(EngineError::NotRunning)));
}

#[tokio::test]
async fn graceful_stop_on_quit() {
    // exits on QUIT; default stop sequence applies
    let (process, _events) = build(spec(
        "proc-stops-with-quit",
        "sh",
        &["-c", "trap 'exit 0' QUIT; sleep 5 & wait $!"],
    ));

    process.start().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(process.is_alive());

    let begun = Instant::now();
    process.stop().await.unwrap();

    // the 5s instruction bound is an upper limit, not a fixed sleep
    assert!(begun.elapsed() < Duration::from_secs(2));
    assert_eq!(process.status(), ProcessStatus::Unmonitored);
    assert!(!process.is_alive());
}

#[tokio::test]
async fn stop_escalates_to_term() {
    let mut program = spec(
        "proc-stops-with-term",
        "sh",
        &["-c", "trap '' QUIT; sleep 5 & wait $!"],
    );
    program.stop_sequence = vec![
        Instruction::new(Signal::SIGQUIT, Duration::from_millis(500)),
        Instruction::new(Signal::SIGTERM, Duration::from_secs(1)),
    ];
    let (process, _events) = build(program);

    process.start().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    let begun = Instant::now();
    process.stop().await.unwrap();

    // the first instruction must time out before TERM lands
    assert!(begun.elapsed() >= Duration::from_millis(500));
    assert_eq!(process.status(), ProcessStatus::Unmonitored);
    assert!(!process.is_alive());
}

#[tokio::test]
async fn stop_falls_back_to_kill() {
    let mut program = spec(
        "proc-stops-with-none",
        "sh",
        &["-c", "trap '' QUIT TERM INT; while :; do sleep 0.2; done"],
    );
    program.stop_sequence = vec![
        Instruction::new(Signal::SIGQUIT, Duration::from_millis(300)),
        Instruction::new(Signal::SIGTERM, Duration::from_millis(300)),
    ];
    let (process, _events) = build(program);

    process.start().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    process.stop().await.unwrap();
    assert_eq!(process.status(), ProcessStatus::Unmonitored);
    assert!(!process.is_alive());
}

#[tokio::test]
async fn drain_renames_pid_file_and_keeps_running() {
    let mut program = spec(
        "proc-drain-rename",
        "sh",
        &["-c", "trap '' USR1; sleep 5 & wait $!"],
    );
    program.drain_signal = Some(Instruction::new(Signal::SIGUSR1, Duration::from_millis(100)));
    let (process, _events) = build(program);

    process.start().unwrap();
    tokio::time::sleep(Duration::from_millis(150)).await;

    process.drain(false).await.unwrap();
    assert_eq!(process.status(), ProcessStatus::Draining);
    assert!(process.is_alive());

    // active slot is free, the drained generation keeps its renamed file
    let active = std::path::Path::new(crate::PID_DIR).join("proc-drain-rename.pid");
    assert!(!active.exists());

    process.stop().await.unwrap();
}

#[tokio::test]
async fn drain_refuses_dead_process() {
    let (process, _events) = build(spec("proc-drain-dead", "sleep", &["1"]));
    assert!(matches!(
        process.drain(true).await,
        Err(EngineError::NotRunning)
    ));
}

#[tokio::test]
async fn crash_loop_is_bounded() {
    let (process, mut events) = build_with_recover(spec("proc-crash-loop", "false", &[]), true);

    process.start().unwrap();

    // initial start plus five recovery attempts, then a terminal state
    let deadline = Instant::now() + Duration::from_secs(15);
    loop {
        if process.status() == ProcessStatus::Unmonitored && !process.is_alive() {
            let settled = process.start_count();
            if settled == 0 {
                break;
            }
        }
        if Instant::now() > deadline {
            panic!("crash loop never settled, status {}", process.status());
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // no further restarts once the cap is hit
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(process.status(), ProcessStatus::Unmonitored);

    let starts = {
        let mut count = 0;
        while let Ok(n) = events.try_recv() {
            if n.status_code == ProcessStatus::Starting.code() {
                count += 1;
            }
        }
        count
    };
    assert_eq!(starts, 1 + MAX_START_COUNTS as usize);
}

#[tokio::test]
async fn clean_exit_without_recover_stays_down() {
    let (process, _events) = build(spec("proc-no-recover", "true", &[]));

    process.start().unwrap();
    wait_for_status(&process, ProcessStatus::Unmonitored, Duration::from_secs(3)).await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(!process.is_alive());
    assert_eq!(process.status(), ProcessStatus::Unmonitored);
}

#[tokio::test]
async fn spawn_failure_becomes_unknown() {
    let (process, _events) = build(spec(
        "proc-spawn-fail",
        "definitely-not-a-command-xyz",
        &[],
    ));

    process.start().unwrap();
    wait_for_status(&process, ProcessStatus::Unknown, Duration::from_secs(3)).await;
}

#[tokio::test]
async fn unknown_user_fails_spawn() {
    let mut program = spec("proc-bad-user", "sleep", &["1"]);
    program.user = "no-such-user-xyz".to_string();
    let (process, _events) = build(program);

    process.start().unwrap();
    wait_for_status(&process, ProcessStatus::Unknown, Duration::from_secs(3)).await;
}

#[test]
fn effective_stop_sequence_defaults() {
    let program = spec("proc-default-seq", "sleep", &["1"]);
    let seq = program.effective_stop_sequence();
    assert_eq!(seq.len(), 2);
    assert_eq!(seq[0].signal, Signal::SIGQUIT);
    assert_eq!(seq[1].signal, Signal::SIGKILL);

    let mut custom = spec("proc-custom-seq", "sleep", &["1"]);
    custom.stop_sequence = vec![Instruction::new(Signal::SIGTERM, Duration::from_secs(1))];
    assert_eq!(custom.effective_stop_sequence(), custom.stop_sequence);
}

#[test]
fn pid_command_reads_own_process() {
    let me = std::process::id() as i32;
    match pid_command(me) {
        Some(command) => assert!(!command.is_empty()),
        // procfs may be unavailable on some hosts
        None => {}
    }
}
