// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! goku — client for the goku supervision daemon.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod resolve;
mod table;

use anyhow::Result;
use clap::{Parser, Subcommand};

use goku_core::{ProcessSetSnapshot, Settings};

use crate::client::RpcClient;
use crate::resolve::fuzzy_find;
use crate::table::{format_elapsed, render_rows};

#[derive(Parser)]
#[command(name = "goku", version, about = "Process supervisor client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all processes under supervision
    List {
        /// Also list every active and draining generation
        #[arg(short = 'v', long)]
        verbose: bool,
    },
    /// Load a new configuration without starting it
    Load {
        /// Configuration file name in the daemon's directory (with the
        /// .toml extension, not the full path)
        #[arg(short = 'c', value_name = "FILE")]
        config: String,
    },
    /// Start a process
    Start {
        /// Process name (prefix match supported)
        #[arg(short = 'p', value_name = "PROCESS")]
        process: String,
    },
    /// Stop a process by sending it the stop sequence
    Stop {
        /// Process name (prefix match supported)
        #[arg(short = 'p', value_name = "PROCESS")]
        process: String,
    },
    /// Reload configuration for a process
    Reload {
        /// Process name (prefix match supported)
        #[arg(short = 'p', value_name = "PROCESS")]
        process: String,
    },
    /// Recycle a process: drain the active generation, start a new one
    Recycle {
        /// Process name (prefix match supported)
        #[arg(short = 'p', value_name = "PROCESS")]
        process: String,
    },
    /// Show client and daemon versions
    Version,
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;
    let client = RpcClient::new(settings.control_addr());

    match cli.command {
        Commands::List { verbose } => {
            let mut sets = client.list().await?;
            sets.sort_by(|a, b| a.name.cmp(&b.name));
            print!("{}", render_list(&sets, verbose));
        }

        Commands::Load { config } => {
            let set = client.load(&config).await?;
            print!("{}", render_list(std::slice::from_ref(&set), false));
        }

        Commands::Start { process } => {
            let name = resolve_process(&client, &process).await?;
            client.start(&name).await?;
        }

        Commands::Stop { process } => {
            let name = resolve_process(&client, &process).await?;
            client.stop(&name).await?;
        }

        Commands::Reload { process } => {
            let name = resolve_process(&client, &process).await?;
            client.reload(&name).await?;
        }

        Commands::Recycle { process } => {
            let name = resolve_process(&client, &process).await?;
            client.recycle(&name).await?;
        }

        Commands::Version => {
            println!("goku {}", env!("CARGO_PKG_VERSION"));
            match client.version().await {
                Ok((version, build)) => println!("gokud {} ({})", version, build),
                Err(err) => println!("gokud unreachable: {}", err),
            }
        }
    }

    Ok(())
}

/// Resolve `-p` against the daemon's live process names.
async fn resolve_process(client: &RpcClient, query: &str) -> Result<String> {
    let sets = client.list().await?;
    let names: Vec<String> = sets.into_iter().map(|set| set.name).collect();
    let index = fuzzy_find(&names, query)?;
    let name = names[index].clone();
    println!("Process: {}", name);
    Ok(name)
}

/// One row per set; with `verbose`, indented rows for every generation.
fn render_list(sets: &[ProcessSetSnapshot], verbose: bool) -> String {
    let mut rows: Vec<Vec<String>> = Vec::new();

    for set in sets {
        if set.name.is_empty() {
            continue;
        }

        rows.push(vec![
            set.name.clone(),
            set.pid().to_string(),
            set.tags.join(","),
            set.status().message,
        ]);

        if verbose {
            let generations = set.active.iter().chain(set.draining.iter());
            for process in generations {
                rows.push(vec![
                    format!("  {}", process.uid),
                    process.pid.to_string(),
                    format_elapsed(process.last_action_at),
                    process.status.message.clone(),
                ]);
            }
        }
    }

    render_rows(&rows)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
