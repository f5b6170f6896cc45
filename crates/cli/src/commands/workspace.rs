// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sim workspace` - Workspace management commands

use std::io::Write;

use anyhow::Result;
use clap::{Args, Subcommand};
use sim_daemon::{WorkspaceDetail, WorkspaceSummary};

use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_time_ago, print_json, print_warnings, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct WorkspaceArgs {
    #[command(subcommand)]
    pub command: WorkspaceCommand,
}

#[derive(Subcommand)]
pub enum WorkspaceCommand {
    /// Create a workspace
    Create {
        /// Workspace name (letters, digits, '-', '_', '.')
        name: String,
        /// Human-friendly name (defaults to the workspace name)
        #[arg(long)]
        display_name: Option<String>,
    },
    /// List all workspaces
    List,
    /// Show a workspace and its versions
    Show {
        /// Workspace name
        name: String,
    },
    /// Change a workspace's display name
    Rename {
        /// Workspace name
        name: String,
        /// New display name
        display_name: String,
    },
    /// Delete a workspace, its versions, and their simulators
    Delete {
        /// Workspace name
        name: String,
    },
}

impl WorkspaceCommand {
    /// Read-only commands do not auto-start the daemon.
    pub fn is_query(&self) -> bool {
        matches!(self, Self::List | Self::Show { .. })
    }
}

pub async fn handle(
    command: WorkspaceCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        WorkspaceCommand::Create { name, display_name } => {
            let workspace = client
                .create_workspace(&name, display_name.as_deref())
                .await?;
            match format {
                OutputFormat::Text => println!("Created workspace {}", workspace.name),
                OutputFormat::Json => print_json(&workspace)?,
            }
        }
        WorkspaceCommand::List => {
            let mut workspaces = client.list_workspaces().await?;
            workspaces.sort_by(|a, b| a.name.cmp(&b.name));
            match format {
                OutputFormat::Text => {
                    if workspaces.is_empty() {
                        println!("No workspaces");
                    } else {
                        render_list(&workspaces, &mut std::io::stdout());
                    }
                }
                OutputFormat::Json => print_json(&workspaces)?,
            }
        }
        WorkspaceCommand::Show { name } => {
            let workspace = client.get_workspace(&name).await?;
            match format {
                OutputFormat::Text => render_detail(&workspace, &mut std::io::stdout()),
                OutputFormat::Json => print_json(&workspace)?,
            }
        }
        WorkspaceCommand::Rename { name, display_name } => {
            let workspace = client.rename_workspace(&name, &display_name).await?;
            match format {
                OutputFormat::Text => println!(
                    "Renamed workspace {} to \"{}\"",
                    workspace.name, workspace.display_name
                ),
                OutputFormat::Json => print_json(&workspace)?,
            }
        }
        WorkspaceCommand::Delete { name } => {
            let warnings = client.delete_workspace(&name).await?;
            match format {
                OutputFormat::Text => {
                    print_warnings(&warnings);
                    println!("Deleted workspace {}", name);
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "deleted": name,
                    "warnings": warnings,
                }))?,
            }
        }
    }

    Ok(())
}

fn render_list(workspaces: &[WorkspaceSummary], out: &mut impl Write) {
    let mut table = Table::new(vec![
        Column::left("NAME"),
        Column::left("DISPLAY NAME"),
        Column::right("VERSIONS"),
        Column::muted("CREATED"),
    ]);
    for ws in workspaces {
        table.row(vec![
            ws.name.clone(),
            ws.display_name.clone(),
            ws.version_count.to_string(),
            format_time_ago(ws.created_at_ms),
        ]);
    }
    table.render(out);
}

fn render_detail(workspace: &WorkspaceDetail, out: &mut impl Write) {
    let _ = writeln!(out, "{} {}", color::header("Workspace:"), workspace.name);
    let _ = writeln!(
        out,
        "  {} {}",
        color::context("Display name:"),
        workspace.display_name
    );
    if workspace.created_at_ms > 0 {
        let _ = writeln!(
            out,
            "  {} {} ago",
            color::context("Created:"),
            format_time_ago(workspace.created_at_ms)
        );
    }

    if workspace.versions.is_empty() {
        let _ = writeln!(out, "\n{}", color::muted("No versions"));
        return;
    }

    let _ = writeln!(out);
    let mut table = Table::new(vec![
        Column::left("VERSION"),
        Column::left("NAME"),
        Column::left("KIND"),
        Column::status("READY"),
        Column::left("SOURCE"),
    ]);
    for v in &workspace.versions {
        table.row(vec![
            v.id.clone(),
            v.name.clone(),
            v.kind.to_string(),
            if v.ready { "ready" } else { "-" }.to_string(),
            v.support_bundle_name.clone(),
        ]);
    }
    table.render(out);
}

#[cfg(test)]
#[path = "workspace_tests.rs"]
mod tests;
