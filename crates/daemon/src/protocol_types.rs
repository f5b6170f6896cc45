// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Summary DTOs carried in daemon responses.

use serde::{Deserialize, Serialize};
use sim_adapters::ContainerSummary;
use sim_core::{VersionKind, SIMULATOR_API_PORT};
use sim_storage::{Version, Workspace};
use std::path::PathBuf;

/// Summary of a workspace for listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceSummary {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub created_at_ms: u64,
    pub version_count: usize,
}

impl From<&Workspace> for WorkspaceSummary {
    fn from(ws: &Workspace) -> Self {
        WorkspaceSummary {
            name: ws.name.to_string(),
            display_name: ws.display_name.clone(),
            created_at_ms: epoch_ms(ws.created_at),
            version_count: ws.versions.len(),
        }
    }
}

/// A workspace with all of its versions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceDetail {
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub created_at_ms: u64,
    pub versions: Vec<VersionSummary>,
}

impl From<&Workspace> for WorkspaceDetail {
    fn from(ws: &Workspace) -> Self {
        WorkspaceDetail {
            name: ws.name.to_string(),
            display_name: ws.display_name.clone(),
            created_at_ms: epoch_ms(ws.created_at),
            versions: ws.versions.iter().map(VersionSummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VersionSummary {
    pub id: String,
    pub name: String,
    pub kind: VersionKind,
    #[serde(default)]
    pub created_at_ms: u64,
    pub ready: bool,
    #[serde(default)]
    pub support_bundle_name: String,
    pub path: PathBuf,
}

impl From<&Version> for VersionSummary {
    fn from(ver: &Version) -> Self {
        VersionSummary {
            id: ver.id.to_string(),
            name: ver.name.clone(),
            kind: ver.kind,
            created_at_ms: epoch_ms(ver.created_at),
            ready: ver.ready,
            support_bundle_name: ver.support_bundle_name.clone(),
            path: ver.path.clone(),
        }
    }
}

/// A managed container as the runtime reports it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstanceEntry {
    pub name: String,
    pub id: String,
    pub state: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl From<&ContainerSummary> for InstanceEntry {
    fn from(c: &ContainerSummary) -> Self {
        let endpoint = c
            .host_port(SIMULATOR_API_PORT)
            .filter(|_| c.is_running())
            .map(|port| format!("https://localhost:{port}"));
        InstanceEntry {
            name: c.name.trim_start_matches('/').to_string(),
            id: c.id.chars().take(12).collect(),
            state: c.state.clone(),
            status: c.status.clone(),
            endpoint,
        }
    }
}

fn epoch_ms(at: chrono::DateTime<chrono::Utc>) -> u64 {
    u64::try_from(at.timestamp_millis()).unwrap_or(0)
}
