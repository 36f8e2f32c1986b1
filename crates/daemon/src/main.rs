// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! gokud — the goku supervision daemon.
//!
//! Loads every program configuration from a directory, supervises the
//! children, and serves the control plane on a local TCP socket until it
//! receives SIGTERM/SIGINT, at which point every managed process is
//! retired.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use goku_core::Settings;
use goku_daemon::listener::{ListenCtx, Listener};
use goku_daemon::protocol::{BUILD, VERSION};
use goku_engine::{notification_channel, Notifier, Registry};

#[derive(Parser)]
#[command(
    name = "gokud",
    version = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH")),
    about = "goku supervision daemon"
)]
struct Args {
    /// Configuration file directory (TOML format)
    #[arg(short = 'd', value_name = "DIR")]
    config_dir: PathBuf,

    /// Start the loaded configurations automatically
    #[arg(long)]
    autostart: bool,

    /// Adopt live PID-file processes at load and recover crashed children
    #[arg(long)]
    autorecover: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    setup_logging();
    info!(version = VERSION, build = BUILD, "starting gokud");

    if !args.config_dir.is_dir() {
        return Err(format!(
            "configuration directory not found: {}",
            args.config_dir.display()
        )
        .into());
    }

    let settings = Settings::load()?;

    let (events, receiver) = notification_channel();
    let registry = Registry::new(args.config_dir, args.autorecover, events);
    registry.load_all(args.autostart).await;

    let notifier = Notifier::new(settings.http_notifier_endpoint.clone());
    tokio::spawn(notifier.run(receiver));

    let socket = TcpListener::bind(settings.control_addr()).await?;
    info!(addr = %settings.control_addr(), "control plane listening");

    let ctx = Arc::new(ListenCtx {
        registry: Arc::clone(&registry),
    });
    tokio::spawn(Listener::new(socket, ctx).run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
        _ = sigint.recv() => info!("received SIGINT, shutting down"),
    }

    registry.sunset_all().await;
    info!("daemon stopped");
    Ok(())
}

fn setup_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
