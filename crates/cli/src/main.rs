// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! sim - cluster simulator CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod daemon_process;
mod env;
mod output;
mod poll;
mod table;
#[cfg(test)]
mod test_daemon;

use output::OutputFormat;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{clean, daemon, instances, simulator, version, workspace};

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(
    name = "sim",
    version,
    about = "Build, run, and query Kubernetes cluster simulators"
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Workspace management
    Workspace(workspace::WorkspaceArgs),
    /// Version management (support bundles and runtime kubeconfigs)
    Version(version::VersionArgs),
    /// Start the simulator for a version
    Start(simulator::StartArgs),
    /// Stop the simulator for a version
    Stop(simulator::TargetArgs),
    /// Show simulator status for a version
    Status(simulator::TargetArgs),
    /// Print the admin kubeconfig of a running simulator
    Kubeconfig(simulator::TargetArgs),
    /// Remove simulator containers and images
    Clean(clean::CleanArgs),
    /// List simulator containers known to the runtime
    Instances,
    /// Run kubectl against a workspace's simulated cluster
    Kubectl(instances::KubectlArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(1);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains the source error text, the
/// "Caused by" chain is skipped. Otherwise the full chain is rendered so
/// context isn't lost.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));

    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Dispatch commands with appropriate client semantics:
    // - Action commands: auto-start daemon, max 1 restart
    // - Query commands: connect only, no restart
    match command {
        Commands::Daemon(args) => daemon::daemon(args, format).await?,

        Commands::Workspace(args) => {
            let client = if args.command.is_query() {
                DaemonClient::for_query()?
            } else {
                DaemonClient::for_action()?
            };
            workspace::handle(args.command, &client, format).await?
        }
        Commands::Version(args) => {
            let client = DaemonClient::for_action()?;
            version::handle(args.command, &client, format).await?
        }

        Commands::Start(args) => {
            let client = DaemonClient::for_action()?;
            simulator::start(args, &client, format).await?
        }
        Commands::Stop(target) => {
            let client = DaemonClient::for_action()?;
            simulator::stop(target, &client, format).await?
        }
        Commands::Clean(args) => {
            let client = DaemonClient::for_action()?;
            clean::handle(args, &client, format).await?
        }

        Commands::Status(target) => {
            let client = DaemonClient::for_query()?;
            simulator::status(target, &client, format).await?
        }
        Commands::Kubeconfig(target) => {
            let client = DaemonClient::for_query()?;
            simulator::kubeconfig(target, &client, format).await?
        }
        Commands::Instances => {
            let client = DaemonClient::for_query()?;
            instances::list(&client, format).await?
        }
        Commands::Kubectl(args) => {
            let client = DaemonClient::for_query()?;
            instances::kubectl(args, &client).await?
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
