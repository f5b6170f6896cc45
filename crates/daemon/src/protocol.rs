// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC Protocol for daemon communication.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sim_core::{InstanceState, InstanceStatus, VersionKind};
use sim_engine::{CleanResult, CleanScope, StartAction};

#[path = "protocol_types.rs"]
mod types;
pub use types::{InstanceEntry, VersionSummary, WorkspaceDetail, WorkspaceSummary};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, within, write_message, write_response,
    ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Request daemon shutdown
    Shutdown,

    /// Get daemon status
    Status,

    CreateWorkspace {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        display_name: Option<String>,
    },

    ListWorkspaces,

    GetWorkspace { name: String },

    /// Change a workspace's display name
    RenameWorkspace { name: String, display_name: String },

    /// Delete a workspace with its versions, files and instances
    DeleteWorkspace { name: String },

    /// Copy a bundle or kubeconfig into a new version
    AddVersion {
        workspace: String,
        /// File or directory on the daemon's host
        source: PathBuf,
        #[serde(default)]
        kind: VersionKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },

    DeleteVersion { workspace: String, version: String },

    /// Start the simulator for a version, building its image if needed
    Start { workspace: String, version: String },

    Stop { workspace: String, version: String },

    SimulatorStatus { workspace: String, version: String },

    /// Admin kubeconfig from a running simulator
    Kubeconfig { workspace: String, version: String },

    /// Stop and remove containers and images
    Clean { scope: CleanScope },

    /// Managed containers known to the runtime
    Instances,

    /// Run kubectl against the newest usable cluster of a workspace
    Kubectl { workspace: String, args: Vec<String> },
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    /// Daemon status
    Status {
        uptime_secs: u64,
        workspaces: usize,
        versions: usize,
        monitors_active: usize,
    },

    /// Error response
    Error { message: String },

    Workspace { workspace: WorkspaceDetail },

    Workspaces { workspaces: Vec<WorkspaceSummary> },

    VersionAdded {
        workspace: String,
        version: VersionSummary,
    },

    /// A delete went through; warnings are secondary failures
    Deleted {
        #[serde(default)]
        warnings: Vec<String>,
    },

    Started {
        instance: String,
        container_id: String,
        action: StartAction,
        monitoring: bool,
    },

    SimulatorStatus {
        instance: String,
        status: InstanceStatus,
        state: InstanceState,
        /// `https://host:port` while running
        #[serde(default, skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },

    Kubeconfig { content: String },

    Cleaned { results: Vec<CleanResult> },

    /// Some items could not be cleaned; the others were
    CleanFailed {
        message: String,
        results: Vec<CleanResult>,
    },

    Instances { instances: Vec<InstanceEntry> },

    /// Captured command output
    Output { stdout: String, stderr: String },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
