// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use goku_engine::notification_channel;
use std::io::Write as _;
use std::time::{Duration, Instant};

fn write_config(dir: &std::path::Path, file: &str, name: &str, args: &[&str]) {
    let mut f = std::fs::File::create(dir.join(file)).unwrap();
    let rendered: Vec<String> = args.iter().map(|a| format!("\"{}\"", a)).collect();
    writeln!(
        f,
        "name = \"{}\"\ncommand = \"sleep\"\nargs = [{}]",
        name,
        rendered.join(", ")
    )
    .unwrap();
}

fn test_ctx(dir: &std::path::Path) -> ListenCtx {
    let (events, _rx) = notification_channel();
    ListenCtx {
        registry: Registry::new(dir.to_path_buf(), false, events),
    }
}

#[tokio::test]
async fn version_reports_build_info() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path());

    match handle_request(Request::Version, &ctx).await {
        Response::Version { version, build } => {
            assert_eq!(version, VERSION);
            assert_eq!(build, BUILD);
        }
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn list_is_empty_before_any_load() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path());

    match handle_request(Request::List, &ctx).await {
        Response::Sets { sets } => assert!(sets.is_empty()),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn load_returns_the_new_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "web.toml", "listener-load", &["1"]);
    let ctx = test_ctx(dir.path());

    match handle_request(
        Request::Load {
            config: "web.toml".to_string(),
        },
        &ctx,
    )
    .await
    {
        Response::Set { set } => {
            assert_eq!(set.name, "listener-load");
            assert!(set.active.is_none());
        }
        other => panic!("unexpected response: {:?}", other),
    }

    // duplicate rejected
    match handle_request(
        Request::Load {
            config: "web.toml".to_string(),
        },
        &ctx,
    )
    .await
    {
        Response::Error { message } => assert!(message.contains("duplicate")),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn unknown_process_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let ctx = test_ctx(dir.path());

    for request in [
        Request::Start {
            name: "ghost".to_string(),
        },
        Request::Stop {
            name: "ghost".to_string(),
        },
        Request::Reload {
            name: "ghost".to_string(),
        },
        Request::Recycle {
            name: "ghost".to_string(),
        },
    ] {
        match handle_request(request, &ctx).await {
            Response::Error { message } => {
                assert!(message.contains("process not found"), "{}", message)
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }
}

#[tokio::test]
async fn start_then_stop_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "web.toml", "listener-lifecycle", &["3"]);
    let ctx = test_ctx(dir.path());
    ctx.registry.load_all(false).await;

    let name = "listener-lifecycle".to_string();

    assert!(matches!(
        handle_request(Request::Start { name: name.clone() }, &ctx).await,
        Response::Ok
    ));

    // second start is a precondition violation, surfaced verbatim
    match handle_request(Request::Start { name: name.clone() }, &ctx).await {
        Response::Error { message } => assert!(message.contains("already started")),
        other => panic!("unexpected response: {:?}", other),
    }

    // stop acknowledges acceptance; the sequence finishes in background
    assert!(matches!(
        handle_request(Request::Stop { name: name.clone() }, &ctx).await,
        Response::Ok
    ));

    let set = ctx.registry.find(&name).await.unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        if set.snapshot().await.active.is_none() {
            break;
        }
        if Instant::now() > deadline {
            panic!("stop never completed");
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    // now stopped, a second stop is rejected up front
    match handle_request(Request::Stop { name: name.clone() }, &ctx).await {
        Response::Error { message } => assert!(message.contains("no process is started")),
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn recycle_requires_an_active_process() {
    let dir = tempfile::tempdir().unwrap();
    write_config(dir.path(), "web.toml", "listener-recycle-none", &["1"]);
    let ctx = test_ctx(dir.path());
    ctx.registry.load_all(false).await;

    match handle_request(
        Request::Recycle {
            name: "listener-recycle-none".to_string(),
        },
        &ctx,
    )
    .await
    {
        Response::Error { message } => assert!(message.contains("no process is started")),
        other => panic!("unexpected response: {:?}", other),
    }
}
