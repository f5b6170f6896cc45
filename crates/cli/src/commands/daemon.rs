// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sim daemon` - Daemon management commands

use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};

use crate::client::{daemon_stop, ClientError, DaemonClient, DaemonStatus};
use crate::daemon_process::{find_simd_binary, StateFiles};
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop,
    /// Check daemon status
    Status,
    /// Stop and restart the daemon
    Restart,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Show all lines (no limit)
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Restart => restart().await,
        DaemonCommand::Status => status(format).await,
        DaemonCommand::Logs { limit, no_limit } => {
            logs(if no_limit { None } else { Some(limit) }, format)
        }
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let simd_path = find_simd_binary()?;
        let status = Command::new(&simd_path).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok(status) = client.status().await {
            println!("Daemon already running (uptime: {}s)", status.uptime_secs);
            return Ok(());
        }
    }

    DaemonClient::connect_or_start()?;
    println!("Daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    match daemon_stop().await {
        Ok(true) => println!("Daemon stopped"),
        Ok(false) => println!("Daemon not running"),
        Err(e) => return Err(anyhow!("Failed to stop daemon: {}", e)),
    }
    Ok(())
}

async fn restart() -> Result<()> {
    let was_running = daemon_stop()
        .await
        .map_err(|e| anyhow!("Failed to stop daemon: {}", e))?;

    if was_running {
        // Grace period for the OS to release the socket
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }

    DaemonClient::connect_or_start()?;
    println!("Daemon restarted");
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || -> Result<()> {
        match format {
            OutputFormat::Text => println!("Daemon not running"),
            OutputFormat::Json => print_json(&serde_json::json!({ "status": "not_running" }))?,
        }
        Ok(())
    };

    let Ok(client) = DaemonClient::connect() else {
        return not_running();
    };

    // Socket file present but nobody listening
    let status = match client.status().await {
        Ok(status) => status,
        Err(ClientError::DaemonNotRunning) => return not_running(),
        Err(ClientError::Io(ref e))
            if matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ) =>
        {
            return not_running();
        }
        Err(e) => return Err(e.into()),
    };
    let version = client
        .hello()
        .await
        .unwrap_or_else(|_| "unknown".to_string());

    match format {
        OutputFormat::Text => {
            for line in status_lines(&status, &version) {
                println!("{line}");
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "running",
            "version": version,
            "uptime_secs": status.uptime_secs,
            "uptime": format_uptime(status.uptime_secs),
            "workspaces": status.workspaces,
            "versions": status.versions,
            "monitors_active": status.monitors_active,
        }))?,
    }
    Ok(())
}

fn status_lines(status: &DaemonStatus, version: &str) -> Vec<String> {
    vec![
        "Status: running".to_string(),
        format!("Version: {version}"),
        format!("Uptime: {}", format_uptime(status.uptime_secs)),
        format!("Workspaces: {}", status.workspaces),
        format!("Versions: {}", status.versions),
        format!("Readiness monitors: {} active", status.monitors_active),
    ]
}

fn logs(limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let log_path = StateFiles::locate()?.log();

    if !log_path.exists() {
        match format {
            OutputFormat::Text => println!("No log file found at {}", log_path.display()),
            OutputFormat::Json => print_json(&serde_json::json!({
                "log_path": log_path.to_string_lossy(),
                "lines": [],
            }))?,
        }
        return Ok(());
    }

    let lines = read_last_lines(&log_path, limit)?;
    match format {
        OutputFormat::Text => {
            for line in &lines {
                println!("{line}");
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "log_path": log_path.to_string_lossy(),
            "lines": lines,
        }))?,
    }
    Ok(())
}

fn read_last_lines(path: &Path, limit: Option<usize>) -> Result<Vec<String>> {
    use std::io::{BufRead, BufReader};
    let file = std::fs::File::open(path)?;
    let mut lines: Vec<String> = BufReader::new(file)
        .lines()
        .collect::<std::io::Result<_>>()?;
    if let Some(n) = limit {
        let start = lines.len().saturating_sub(n);
        lines.drain(..start);
    }
    Ok(lines)
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
