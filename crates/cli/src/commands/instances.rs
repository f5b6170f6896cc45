// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `sim instances` and `sim kubectl` - Runtime-facing queries

use std::io::Write;

use anyhow::Result;
use clap::Args;
use sim_daemon::InstanceEntry;

use crate::client::DaemonClient;
use crate::output::{print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct KubectlArgs {
    /// Workspace whose cluster to query
    pub workspace: String,

    /// Arguments passed through to kubectl
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true)]
    pub args: Vec<String>,
}

pub async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let mut instances = client.instances().await?;
    instances.sort_by(|a, b| a.name.cmp(&b.name));

    match format {
        OutputFormat::Text => {
            if instances.is_empty() {
                println!("No simulators");
            } else {
                render_list(&instances, &mut std::io::stdout());
            }
        }
        OutputFormat::Json => print_json(&instances)?,
    }
    Ok(())
}

fn render_list(instances: &[InstanceEntry], out: &mut impl Write) {
    let mut table = Table::new(vec![
        Column::left("NAME"),
        Column::muted("ID").with_max(12),
        Column::status("STATUS"),
        Column::left("ENDPOINT"),
    ]);
    for i in instances {
        table.row(vec![
            i.name.clone(),
            i.id.clone(),
            i.status.clone(),
            i.endpoint.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }
    table.render(out);
}

/// kubectl output is passed through untouched, stderr to stderr.
pub async fn kubectl(args: KubectlArgs, client: &DaemonClient) -> Result<()> {
    let (stdout, stderr) = client.kubectl(&args.workspace, &args.args).await?;
    print!("{stdout}");
    eprint!("{stderr}");
    Ok(())
}

#[cfg(test)]
#[path = "instances_tests.rs"]
mod tests;
