// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::daemon_process::{
    daemon_socket, force_kill_daemon, probe_socket, process_exists, read_startup_error,
    start_daemon_background, stop_if_outdated, wait_for_exit, wrap_with_startup_error,
    StateFiles,
};

use sim_core::VersionKind;
use sim_daemon::protocol::{self, ProtocolError};
use sim_daemon::{
    InstanceEntry, Request, Response, VersionSummary, WorkspaceDetail, WorkspaceSummary,
    PROTOCOL_VERSION,
};
use sim_engine::{CleanResult, CleanScope, StartOutcome};
use thiserror::Error;
use tokio::net::UnixStream;

/// Timeout for IPC requests (hello, status, queries, shutdown)
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for requests that may build images or touch many containers
pub fn timeout_build() -> Duration {
    crate::env::timeout_build_ms().unwrap_or(Duration::from_secs(15 * 60))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

/// Outcome of a clean request: per-item results plus the failure summary
/// when some items could not be cleaned.
#[derive(Debug)]
pub struct CleanOutcome {
    pub results: Vec<CleanResult>,
    pub failure: Option<String>,
}

/// Daemon status counters
#[derive(Debug)]
pub struct DaemonStatus {
    pub uptime_secs: u64,
    pub workspaces: usize,
    pub versions: usize,
    pub monitors_active: usize,
}

/// Simulator status as reported by the daemon
#[derive(Debug)]
pub struct SimulatorStatus {
    pub instance: String,
    pub status: sim_core::InstanceStatus,
    pub state: sim_core::InstanceState,
    pub endpoint: Option<String>,
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands - auto-start with version check, max 1 restart per process
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once()
    }

    /// For query commands - connect only, no restart
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    /// Client bound to an explicit socket path
    #[cfg(test)]
    pub fn at(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Internal: connect_or_start with restart limit (max 1 restart per process)
    fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }

        if stop_if_outdated(&StateFiles::locate()?, PROTOCOL_VERSION) {
            RESTARTED.store(true, Ordering::SeqCst);
        }

        Self::connect_or_start_inner()
    }

    /// Connect to daemon, auto-starting if not running
    pub fn connect_or_start() -> Result<Self, ClientError> {
        stop_if_outdated(&StateFiles::locate()?, PROTOCOL_VERSION);
        Self::connect_or_start_inner()
    }

    fn connect_or_start_inner() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                // Verify the socket is actually accepting connections
                // (daemon may have crashed, leaving a stale socket file)
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    StateFiles::locate()?.remove_stale();
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;

        if !socket_path.exists() {
            let err = ClientError::DaemonNotRunning;
            log_connection_error(&err);
            return Err(err);
        }

        Ok(Self { socket_path })
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            // Check if daemon process exited early (startup failure)
            if let Ok(Some(status)) = child.try_wait() {
                // Poll for startup error in log (filesystem may need to sync)
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect() {
                Ok(client) if probe_socket(&client.socket_path) => return Ok(client),
                Ok(_) | Err(ClientError::DaemonNotRunning) => {
                    std::thread::sleep(poll_interval());
                }
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    /// Send a request and receive a response with specific timeouts
    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Duration,
        write_timeout: Duration,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        let body = protocol::encode(request)?;
        protocol::within(write_timeout, protocol::write_message(&mut writer, &body)).await?;

        let reply = protocol::within(read_timeout, protocol::read_message(&mut reader)).await?;
        Ok(protocol::decode(&reply)?)
    }

    /// Send a request and receive a response
    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_logged(request, timeout_ipc()).await
    }

    /// Send a request whose reply may take minutes (builds, cleanup)
    async fn send_long(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_logged(request, timeout_build()).await
    }

    async fn send_logged(
        &self,
        request: &Request,
        read_timeout: Duration,
    ) -> Result<Response, ClientError> {
        match self
            .send_with_timeout(request, read_timeout, timeout_ipc())
            .await
        {
            Ok(response) => Ok(response),
            Err(e) => {
                log_connection_error(&e);
                Err(e)
            }
        }
    }

    /// Helper for simple requests that expect Ok or Error responses
    async fn send_simple(&self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon status
    pub async fn status(&self) -> Result<DaemonStatus, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status {
                uptime_secs,
                workspaces,
                versions,
                monitors_active,
            } => Ok(DaemonStatus {
                uptime_secs,
                workspaces,
                versions,
                monitors_active,
            }),
            other => Err(unexpected(other)),
        }
    }

    /// Request daemon shutdown
    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Get daemon version via Hello handshake
    pub async fn hello(&self) -> Result<String, ClientError> {
        let request = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.send(&request).await? {
            Response::Hello { version } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    // -- workspaces --

    pub async fn create_workspace(
        &self,
        name: &str,
        display_name: Option<&str>,
    ) -> Result<WorkspaceDetail, ClientError> {
        let request = Request::CreateWorkspace {
            name: name.to_string(),
            display_name: display_name.map(String::from),
        };
        expect_workspace(self.send(&request).await?)
    }

    pub async fn list_workspaces(&self) -> Result<Vec<WorkspaceSummary>, ClientError> {
        match self.send(&Request::ListWorkspaces).await? {
            Response::Workspaces { workspaces } => Ok(workspaces),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_workspace(&self, name: &str) -> Result<WorkspaceDetail, ClientError> {
        let request = Request::GetWorkspace {
            name: name.to_string(),
        };
        expect_workspace(self.send(&request).await?)
    }

    pub async fn rename_workspace(
        &self,
        name: &str,
        display_name: &str,
    ) -> Result<WorkspaceDetail, ClientError> {
        let request = Request::RenameWorkspace {
            name: name.to_string(),
            display_name: display_name.to_string(),
        };
        expect_workspace(self.send(&request).await?)
    }

    /// Delete a workspace; returns warnings for secondary failures
    pub async fn delete_workspace(&self, name: &str) -> Result<Vec<String>, ClientError> {
        let request = Request::DeleteWorkspace {
            name: name.to_string(),
        };
        expect_deleted(self.send_long(&request).await?)
    }

    // -- versions --

    pub async fn add_version(
        &self,
        workspace: &str,
        source: &Path,
        kind: VersionKind,
        name: Option<&str>,
    ) -> Result<VersionSummary, ClientError> {
        let request = Request::AddVersion {
            workspace: workspace.to_string(),
            source: source.to_path_buf(),
            kind,
            name: name.map(String::from),
        };
        // Large bundles take a while to copy
        match self.send_long(&request).await? {
            Response::VersionAdded { version, .. } => Ok(version),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete_version(
        &self,
        workspace: &str,
        version: &str,
    ) -> Result<Vec<String>, ClientError> {
        let request = Request::DeleteVersion {
            workspace: workspace.to_string(),
            version: version.to_string(),
        };
        expect_deleted(self.send_long(&request).await?)
    }

    // -- simulators --

    /// Start a simulator; waits through the image build if one is needed
    pub async fn start(&self, workspace: &str, version: &str) -> Result<StartOutcome, ClientError> {
        let request = Request::Start {
            workspace: workspace.to_string(),
            version: version.to_string(),
        };
        match self.send_long(&request).await? {
            Response::Started {
                instance,
                container_id,
                action,
                monitoring,
            } => Ok(StartOutcome {
                instance,
                container_id,
                action,
                monitoring,
            }),
            other => Err(unexpected(other)),
        }
    }

    pub async fn stop(&self, workspace: &str, version: &str) -> Result<(), ClientError> {
        let request = Request::Stop {
            workspace: workspace.to_string(),
            version: version.to_string(),
        };
        self.send_simple(&request).await
    }

    pub async fn simulator_status(
        &self,
        workspace: &str,
        version: &str,
    ) -> Result<SimulatorStatus, ClientError> {
        let request = Request::SimulatorStatus {
            workspace: workspace.to_string(),
            version: version.to_string(),
        };
        match self.send(&request).await? {
            Response::SimulatorStatus {
                instance,
                status,
                state,
                endpoint,
            } => Ok(SimulatorStatus {
                instance,
                status,
                state,
                endpoint,
            }),
            other => Err(unexpected(other)),
        }
    }

    pub async fn kubeconfig(&self, workspace: &str, version: &str) -> Result<String, ClientError> {
        let request = Request::Kubeconfig {
            workspace: workspace.to_string(),
            version: version.to_string(),
        };
        match self.send(&request).await? {
            Response::Kubeconfig { content } => Ok(content),
            other => Err(unexpected(other)),
        }
    }

    pub async fn clean(&self, scope: CleanScope) -> Result<CleanOutcome, ClientError> {
        match self.send_long(&Request::Clean { scope }).await? {
            Response::Cleaned { results } => Ok(CleanOutcome {
                results,
                failure: None,
            }),
            Response::CleanFailed { message, results } => Ok(CleanOutcome {
                results,
                failure: Some(message),
            }),
            other => Err(unexpected(other)),
        }
    }

    pub async fn instances(&self) -> Result<Vec<InstanceEntry>, ClientError> {
        match self.send(&Request::Instances).await? {
            Response::Instances { instances } => Ok(instances),
            other => Err(unexpected(other)),
        }
    }

    /// Run kubectl on the daemon side; returns (stdout, stderr)
    pub async fn kubectl(
        &self,
        workspace: &str,
        args: &[String],
    ) -> Result<(String, String), ClientError> {
        let request = Request::Kubectl {
            workspace: workspace.to_string(),
            args: args.to_vec(),
        };
        match self.send_long(&request).await? {
            Response::Output { stdout, stderr } => Ok((stdout, stderr)),
            other => Err(unexpected(other)),
        }
    }
}

fn expect_workspace(response: Response) -> Result<WorkspaceDetail, ClientError> {
    match response {
        Response::Workspace { workspace } => Ok(workspace),
        other => Err(unexpected(other)),
    }
}

fn expect_deleted(response: Response) -> Result<Vec<String>, ClientError> {
    match response {
        Response::Deleted { warnings } => Ok(warnings),
        other => Err(unexpected(other)),
    }
}

/// Map a response the caller did not ask for to an error
fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

/// Stop the daemon (graceful first, then forceful)
/// Returns true if daemon was stopped, false if it wasn't running
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let files = StateFiles::locate()?;
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            files.remove_pid();
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let graceful = client.shutdown().await.is_ok();

    if let Some(pid) = files.read_pid() {
        if graceful {
            wait_for_exit(pid, timeout_exit()).await;
        }
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    }

    files.remove_pid();
    Ok(true)
}

/// Write a diagnostic message to `~/.local/state/sim/cli.log`.
fn write_cli_log(message: String) {
    use std::io::Write;
    use std::time::SystemTime;

    let log_path = StateFiles::locate()
        .map(|files| files.dir().join("cli.log"))
        .unwrap_or_else(|_| PathBuf::from("/tmp/sim-cli.log"));

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    if let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        let timestamp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let pid = std::process::id();
        let cwd = std::env::current_dir()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|_| "(unknown)".to_string());
        let state_dir = crate::env::state_dir_raw().unwrap_or_else(|| "(not set)".to_string());

        let _ = writeln!(
            file,
            "[ts={}] pid={} cwd={} SIM_STATE_DIR={} {}",
            timestamp, pid, cwd, state_dir, message
        );
    }
}

/// Log a connection error for debugging.
///
/// Writes diagnostic info to `cli.log` in the state directory when the CLI
/// fails to talk to the daemon.
pub fn log_connection_error(error: &ClientError) {
    let socket_path = daemon_socket()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "(unknown)".to_string());
    write_cli_log(format!("socket={} error={}", socket_path, error));
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
