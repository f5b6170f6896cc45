// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sim clean` - Remove simulator containers and images

use std::io::Write;

use anyhow::{anyhow, Result};
use clap::Args;
use sim_engine::{CleanResult, CleanScope};

use crate::client::DaemonClient;
use crate::output::{print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct CleanArgs {
    /// Workspace to clean (every version unless VERSION is given)
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub workspace: Option<String>,

    /// Clean only this version
    pub version: Option<String>,

    /// Clean every version of every workspace
    #[arg(long)]
    pub all: bool,
}

impl CleanArgs {
    pub fn scope(&self) -> Result<CleanScope> {
        match (&self.workspace, &self.version, self.all) {
            (None, None, true) => Ok(CleanScope::All),
            (Some(workspace), None, false) => Ok(CleanScope::Workspace {
                workspace: workspace.clone(),
            }),
            (Some(workspace), Some(version), false) => Ok(CleanScope::Instance {
                workspace: workspace.clone(),
                version: version.clone(),
            }),
            _ => Err(anyhow!("specify a workspace (and optional version) or --all")),
        }
    }
}

pub async fn handle(args: CleanArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let outcome = client.clean(args.scope()?).await?;

    match format {
        OutputFormat::Text => {
            if outcome.results.is_empty() {
                println!("Nothing to clean");
            } else {
                render_results(&outcome.results, &mut std::io::stdout());
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "results": outcome.results,
            "error": outcome.failure,
        }))?,
    }

    match outcome.failure {
        Some(message) => Err(anyhow!(message)),
        None => Ok(()),
    }
}

fn render_results(results: &[CleanResult], out: &mut impl Write) {
    let mut table = Table::new(vec![Column::left("INSTANCE"), Column::status("RESULT")]);
    for r in results {
        let result = match &r.error {
            Some(e) => format!("error: {e}"),
            None => "cleaned".to_string(),
        };
        table.row(vec![r.id.clone(), result]);
    }
    table.render(out);
}

#[cfg(test)]
#[path = "clean_tests.rs"]
mod tests;
