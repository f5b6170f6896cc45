// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sim version` - Add and delete workspace versions

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand, ValueEnum};
use sim_core::VersionKind;

use crate::client::DaemonClient;
use crate::output::{print_json, print_warnings, OutputFormat};

#[derive(Args)]
pub struct VersionArgs {
    #[command(subcommand)]
    pub command: VersionCommand,
}

#[derive(Subcommand)]
pub enum VersionCommand {
    /// Add a version from a support bundle or a kubeconfig
    Add {
        /// Workspace name
        workspace: String,
        /// Path to the support bundle archive or kubeconfig file
        source: PathBuf,
        /// What the source file is
        #[arg(long, value_enum, default_value_t)]
        kind: KindArg,
        /// Display name (defaults to the version id)
        #[arg(long)]
        name: Option<String>,
    },
    /// Delete a version and its simulator
    Delete {
        /// Workspace name
        workspace: String,
        /// Version id (e.g. v1)
        version: String,
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum KindArg {
    #[default]
    SupportBundle,
    Runtime,
}

impl From<KindArg> for VersionKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::SupportBundle => VersionKind::SupportBundle,
            KindArg::Runtime => VersionKind::Runtime,
        }
    }
}

pub async fn handle(
    command: VersionCommand,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    match command {
        VersionCommand::Add {
            workspace,
            source,
            kind,
            name,
        } => {
            // The daemon reads the file itself, so it needs an absolute path
            let source = std::fs::canonicalize(&source)
                .map_err(|e| anyhow!("cannot read {}: {}", source.display(), e))?;
            let version = client
                .add_version(&workspace, &source, kind.into(), name.as_deref())
                .await?;
            match format {
                OutputFormat::Text => {
                    println!(
                        "Added {} {} to workspace {}",
                        version.kind, version.id, workspace
                    );
                    if version.kind == VersionKind::SupportBundle {
                        println!("Start it with: sim start {} {}", workspace, version.id);
                    }
                }
                OutputFormat::Json => print_json(&version)?,
            }
        }
        VersionCommand::Delete { workspace, version } => {
            let warnings = client.delete_version(&workspace, &version).await?;
            match format {
                OutputFormat::Text => {
                    print_warnings(&warnings);
                    println!("Deleted version {}/{}", workspace, version);
                }
                OutputFormat::Json => print_json(&serde_json::json!({
                    "deleted": format!("{workspace}/{version}"),
                    "warnings": warnings,
                }))?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
