// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Container runtime adapters

mod docker;
mod parse;

pub use docker::DockerAdapter;

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeContainer, FakeRuntimeAdapter, RuntimeCall, RuntimeOp};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors from container runtime operations
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("no running container named {0}")]
    NotFound(String),
    #[error("expected one container matching name {name}, got {count}")]
    Ambiguous { name: String, count: usize },
    #[error("command failed with exit code {code}: {stderr}")]
    CommandFailed { code: i32, stderr: String },
    #[error("image build failed: {0}")]
    BuildFailed(String),
    #[error("runtime unavailable: {0}")]
    Unavailable(String),
    #[error("unexpected runtime output: {0}")]
    Parse(String),
}

/// A published port of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_ip: String,
    pub host_port: u16,
    pub container_port: u16,
    pub protocol: String,
}

/// A container as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSummary {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Runtime state, e.g. `running`, `exited`, `created`.
    pub state: String,
    pub status: String,
    pub ports: Vec<PortMapping>,
    pub labels: Vec<(String, String)>,
}

impl ContainerSummary {
    pub fn is_running(&self) -> bool {
        self.state == "running"
    }

    /// Host port published for `container_port`, if any.
    pub fn host_port(&self, container_port: u16) -> Option<u16> {
        self.ports
            .iter()
            .find(|p| p.container_port == container_port && p.host_port != 0)
            .map(|p| p.host_port)
    }

    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// An image as reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSummary {
    pub id: String,
    pub reference: String,
}

/// Parameters for creating a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    pub command: Vec<String>,
    /// Container port published on a host-assigned port on all interfaces.
    pub exposed_port: u16,
    pub labels: Vec<(String, String)>,
}

/// Parameters for an image build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub tag: String,
    pub context_dir: PathBuf,
    pub labels: Vec<(String, String)>,
}

/// Captured output of a command run inside a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Live stream of container log lines.
///
/// Ends (`None`) when the container exits or the stream is closed.
/// A read failure is delivered as a final `Err` item.
pub struct LogStream {
    rx: mpsc::Receiver<Result<String, RuntimeError>>,
}

impl LogStream {
    pub fn new(rx: mpsc::Receiver<Result<String, RuntimeError>>) -> Self {
        Self { rx }
    }

    /// Create a connected sender/stream pair.
    pub fn channel(buffer: usize) -> (mpsc::Sender<Result<String, RuntimeError>>, Self) {
        let (tx, rx) = mpsc::channel(buffer);
        (tx, Self::new(rx))
    }

    pub async fn next_line(&mut self) -> Option<Result<String, RuntimeError>> {
        self.rx.recv().await
    }
}

/// Adapter over a Docker-compatible container engine.
///
/// `name` arguments are instance names; implementations match containers by
/// exact name and images by the managed tag derived from the name.
#[async_trait]
pub trait RuntimeAdapter: Clone + Send + Sync + 'static {
    /// Containers named exactly `name`; running only unless `include_stopped`.
    async fn find_containers(
        &self,
        name: &str,
        include_stopped: bool,
    ) -> Result<Vec<ContainerSummary>, RuntimeError>;

    /// Create and start a container, returning its ID.
    async fn create_and_start(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    /// Start an existing (stopped) container.
    async fn start(&self, container_id: &str) -> Result<(), RuntimeError>;

    /// Kill every running container named `name`. No-op if none.
    async fn stop(&self, name: &str) -> Result<(), RuntimeError>;

    /// Stop and force-remove every container named `name`. No-op if none.
    async fn remove(&self, name: &str) -> Result<(), RuntimeError>;

    /// Build an image from a context directory.
    async fn build(&self, spec: &BuildSpec) -> Result<(), RuntimeError>;

    /// Images tagged for instance `name`.
    async fn find_images(&self, name: &str) -> Result<Vec<ImageSummary>, RuntimeError>;

    /// Remove every image tagged for instance `name`. No-op if none.
    async fn remove_images(&self, name: &str) -> Result<(), RuntimeError>;

    /// Read a file from the single running container named `name`.
    async fn read_file(&self, name: &str, path: &str) -> Result<Vec<u8>, RuntimeError>;

    /// Follow the logs of the running container named `name`.
    async fn tail_logs(&self, name: &str) -> Result<LogStream, RuntimeError>;

    /// Run a command inside the container named `name`.
    ///
    /// A non-zero exit is an error carrying the captured stderr.
    async fn exec(
        &self,
        name: &str,
        cmd: &[String],
        env: &[(String, String)],
    ) -> Result<ExecOutput, RuntimeError>;

    /// Every container carrying the managed ownership label, running or not.
    async fn list_managed(&self) -> Result<Vec<ContainerSummary>, RuntimeError>;
}
