//! End-to-end supervision scenarios, driven through the engine the same way
//! the daemon drives it: a configuration file on disk, a ProcessSet built
//! from it, real children on the host.

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use goku_core::read_config;
use goku_engine::{notification_channel, EventReceiver, ProcessSet, SpawnLock};

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("prog.toml");
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

fn load_set(dir: &Path, contents: &str) -> (Arc<ProcessSet>, EventReceiver) {
    let path = write_config(dir, contents);
    let config = read_config(&path).unwrap();
    let (events, receiver) = notification_channel();
    (
        ProcessSet::from_config(&config, path, events, SpawnLock::new(), false),
        receiver,
    )
}

// probe via procfs so this test crate stays signal-free
fn pid_alive(pid: i32) -> bool {
    pid > 0 && Path::new(&format!("/proc/{}", pid)).exists()
}

async fn active_status(set: &Arc<ProcessSet>) -> Option<(i32, String)> {
    set.snapshot()
        .await
        .active
        .map(|a| (a.pid, a.status.message))
}

#[tokio::test]
async fn clean_start_and_natural_exit() {
    let dir = tempfile::tempdir().unwrap();
    let (set, _events) = load_set(
        dir.path(),
        "name = \"TestStart\"\ncommand = \"sleep\"\nargs = [\"1\"]\n",
    );

    let begun = Instant::now();
    set.start().await.unwrap();

    loop {
        if let Some((pid, status)) = active_status(&set).await {
            if status == "up" && pid_alive(pid) {
                break;
            }
        }
        assert!(begun.elapsed() < Duration::from_millis(500), "child never up");
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    // sleep 1 runs out on its own
    loop {
        if let Some((pid, status)) = active_status(&set).await {
            if status == "unmonitored" && !pid_alive(pid) {
                break;
            }
        }
        assert!(begun.elapsed() < Duration::from_secs(3), "child never exited");
        tokio::time::sleep(Duration::from_millis(25)).await;
    }

    assert!(begun.elapsed() >= Duration::from_millis(900));
}

#[tokio::test]
async fn graceful_stop_on_quit() {
    let dir = tempfile::tempdir().unwrap();
    // exits as soon as QUIT arrives; the default stop sequence applies
    let (set, _events) = load_set(
        dir.path(),
        r#"
name = "StopsWithQuit"
command = "sh"
args = ["-c", "trap 'exit 0' QUIT; sleep 5 & wait $!"]
"#,
    );

    set.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let begun = Instant::now();
    set.stop().await.unwrap();
    // well under the 5s instruction bound
    assert!(begun.elapsed() < Duration::from_secs(2));

    let snapshot = set.snapshot().await;
    assert!(snapshot.active.is_none());
    assert_eq!(snapshot.status().message, "unmonitored");
}

#[tokio::test]
async fn stop_escalates_to_term() {
    let dir = tempfile::tempdir().unwrap();
    let (set, mut events) = load_set(
        dir.path(),
        r#"
name = "StopsWithTerm"
command = "sh"
args = ["-c", "trap '' QUIT; sleep 5 & wait $!"]

[[stop_sequence]]
signal = "quit"
wait = "1s"

[[stop_sequence]]
signal = "term"
wait = "1s"
"#,
    );

    set.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let begun = Instant::now();
    set.stop().await.unwrap();

    // the ignored QUIT must run out its full bound before TERM lands
    assert!(begun.elapsed() >= Duration::from_secs(1));
    assert!(begun.elapsed() < Duration::from_secs(4));

    // status path: up -> stopping -> unmonitored. The reaper and the stop
    // sequence may both record the final state; only edges count.
    let mut codes = Vec::new();
    while let Ok(n) = events.try_recv() {
        if n.is_edge() {
            codes.push(n.status_code);
        }
    }
    let tail: Vec<i32> = codes.iter().copied().skip_while(|&c| c != 3).collect();
    assert_eq!(tail, vec![3, 4, 0]);
}

#[tokio::test]
async fn stop_falls_back_to_sigkill() {
    let dir = tempfile::tempdir().unwrap();
    let (set, _events) = load_set(
        dir.path(),
        r#"
name = "StopsWithNone"
command = "sh"
args = ["-c", "trap '' QUIT TERM INT; while :; do sleep 0.2; done"]

[[stop_sequence]]
signal = "quit"
wait = "300ms"

[[stop_sequence]]
signal = "term"
wait = "300ms"
"#,
    );

    set.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let pid = set.snapshot().await.active.unwrap().pid;
    assert!(pid_alive(pid));

    set.stop().await.unwrap();

    assert!(!pid_alive(pid));
    assert_eq!(set.snapshot().await.status().message, "unmonitored");
}

#[tokio::test]
async fn recycle_keeps_service_continuity() {
    let dir = tempfile::tempdir().unwrap();
    let (set, _events) = load_set(
        dir.path(),
        r#"
name = "Recycled"
command = "sleep"
args = ["5"]
drain_signal = { signal = "usr1", wait = "100ms" }
"#,
    );

    set.start().await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;
    let old = set.snapshot().await.active.unwrap();

    let begun = Instant::now();
    set.recycle().await.unwrap();
    assert!(begun.elapsed() < Duration::from_millis(1500));

    let snapshot = set.snapshot().await;
    let new = snapshot.active.clone().unwrap();
    assert_ne!(new.pid, old.pid);

    // any still-listed old generation is draining, stopping or done
    for drained in &snapshot.draining {
        assert!([0, 4, 6].contains(&drained.status.code));
    }

    // the old generation eventually leaves the cohort entirely
    let removal_deadline = Instant::now() + Duration::from_secs(5);
    while !set.snapshot().await.draining.is_empty() {
        assert!(
            Instant::now() < removal_deadline,
            "drained generation never removed"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    set.stop().await.unwrap();
}
