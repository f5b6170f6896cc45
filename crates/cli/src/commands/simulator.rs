// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sim start|stop|status|kubeconfig` - Simulator lifecycle commands

use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Args;
use sim_core::{InstanceState, ShortId};
use sim_engine::{StartAction, StartOutcome};

use crate::client::{DaemonClient, SimulatorStatus};
use crate::color;
use crate::output::{print_json, OutputFormat};
use crate::poll::{Poller, Tick};

/// A (workspace, version) pair naming one simulator
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Workspace name
    pub workspace: String,
    /// Version id (e.g. v1)
    pub version: String,
}

#[derive(Args)]
pub struct StartArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Block until the simulator has loaded its bundle
    #[arg(long)]
    pub wait: bool,

    /// Give up waiting after this many seconds (default: 600)
    #[arg(long, default_value = "600")]
    pub timeout: u64,
}

pub async fn start(args: StartArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let TargetArgs { workspace, version } = &args.target;
    let outcome = client.start(workspace, version).await?;

    if format == OutputFormat::Text {
        println!("{}", start_message(&outcome));
    }

    let final_status = if args.wait {
        Some(wait_until_ready(client, &args.target, Duration::from_secs(args.timeout)).await?)
    } else {
        None
    };

    match format {
        OutputFormat::Text => {
            if let Some(status) = final_status {
                print_status_text(&status);
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "instance": outcome.instance,
            "container_id": outcome.container_id,
            "action": outcome.action,
            "monitoring": outcome.monitoring,
            "state": final_status.map(|s| s.state),
        }))?,
    }
    Ok(())
}

fn start_message(outcome: &StartOutcome) -> String {
    let verb = match outcome.action {
        StartAction::AlreadyRunning => "Already running",
        StartAction::Restarted => "Restarted",
        StartAction::Created => "Created",
    };
    format!(
        "{} {} {}",
        verb,
        outcome.instance,
        color::muted(&format!("({})", outcome.container_id.short(12)))
    )
}

/// Poll the daemon until the simulator is ready.
///
/// Fails if the container stops while loading or the timeout elapses.
async fn wait_until_ready(
    client: &DaemonClient,
    target: &TargetArgs,
    timeout: Duration,
) -> Result<SimulatorStatus> {
    let interval = crate::env::wait_poll_ms().unwrap_or(Duration::from_secs(2));
    let mut poller = Poller::new(interval, timeout);

    loop {
        let status = client
            .simulator_status(&target.workspace, &target.version)
            .await?;
        match status.state {
            InstanceState::Ready => return Ok(status),
            InstanceState::Initializing => {}
            other => {
                return Err(anyhow!(
                    "{} stopped while loading (state: {})",
                    status.instance,
                    other
                ))
            }
        }

        match poller.tick().await {
            Tick::Again => {}
            Tick::Expired => {
                return Err(anyhow!(
                    "timed out after {}s waiting for {} to become ready",
                    poller.elapsed().as_secs(),
                    status.instance
                ))
            }
            Tick::Interrupted => return Err(anyhow!("interrupted")),
        }
    }
}

pub async fn stop(target: TargetArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    client.stop(&target.workspace, &target.version).await?;
    match format {
        OutputFormat::Text => println!("Stopped {}/{}", target.workspace, target.version),
        OutputFormat::Json => print_json(&serde_json::json!({
            "stopped": format!("{}/{}", target.workspace, target.version),
        }))?,
    }
    Ok(())
}

pub async fn status(target: TargetArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let status = client
        .simulator_status(&target.workspace, &target.version)
        .await?;
    match format {
        OutputFormat::Text => print_status_text(&status),
        OutputFormat::Json => print_json(&serde_json::json!({
            "instance": status.instance,
            "running": status.status.running,
            "ready": status.status.ready,
            "state": status.state,
            "endpoint": status.endpoint,
        }))?,
    }
    Ok(())
}

fn print_status_text(status: &SimulatorStatus) {
    for line in status_lines(status) {
        println!("{line}");
    }
}

fn status_lines(status: &SimulatorStatus) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", color::header("Instance:"), status.instance),
        format!(
            "  {} {}",
            color::context("State:"),
            color::status(&status.state.to_string())
        ),
    ];
    if let Some(endpoint) = &status.endpoint {
        lines.push(format!("  {} {}", color::context("Endpoint:"), endpoint));
    }
    if status.state == InstanceState::Initializing {
        lines.push(color::muted("  Loading bundle; use `sim start --wait` to block until ready"));
    }
    lines
}

pub async fn kubeconfig(
    target: TargetArgs,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    let content = client
        .kubeconfig(&target.workspace, &target.version)
        .await?;
    match format {
        OutputFormat::Text => {
            print!("{content}");
            if !content.ends_with('\n') {
                println!();
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "kubeconfig": content }))?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "simulator_tests.rs"]
mod tests;
