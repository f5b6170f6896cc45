// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use sim_adapters::{DockerAdapter, RuntimeAdapter, TracedRuntime};
use sim_engine::{EngineConfig, Orchestrator};
use sim_storage::{MetadataStore, StoreError};
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::env::state_dir;

/// Runtime adapter the daemon drives in production (wrapped with tracing)
pub type DaemonRuntime = TracedRuntime<DockerAdapter>;

/// Engine with the concrete runtime adapter
pub type DaemonEngine = Orchestrator<DaemonRuntime>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/sim)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the workspace metadata file
    pub store_path: PathBuf,
    /// Engine paths and tunables
    pub engine: EngineConfig,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/sim/` (or `$XDG_STATE_HOME/sim/`).
    pub fn load() -> Result<Self, LifecycleError> {
        let state_dir = state_dir()?;
        let mut config = Self::for_state_dir(state_dir);
        config.engine = EngineConfig::from_env(&config.state_dir);
        Ok(config)
    }

    /// Layout under `state_dir` with default engine tunables.
    pub fn for_state_dir(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            store_path: state_dir.join("data.json"),
            engine: EngineConfig::with_defaults(&state_dir),
            state_dir,
        }
    }
}

/// Daemon state during operation.
///
/// The listener is returned separately from startup to be spawned as a Listener task.
pub struct DaemonState<R> {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Engine shared with the listener
    pub engine: Arc<Orchestrator<R>>,
    /// When daemon started
    pub start_time: Instant,
}

/// Result of daemon startup - includes both the daemon state and the listener.
pub struct StartupResult<R> {
    pub daemon: DaemonState<R>,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
}

impl<R: RuntimeAdapter> DaemonState<R> {
    /// Shutdown the daemon gracefully.
    ///
    /// Containers are left running; readiness monitors for unready ones are
    /// resumed on the next startup.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");
        self.engine.shutdown().await;
        remove_runtime_files(&self.config);
        // The lock itself goes with `lock_file`
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Remove the socket, pid and version files. Missing files are fine.
fn remove_runtime_files(config: &Config) {
    for path in [&config.socket_path, &config.lock_path, &config.version_path] {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove daemon file"),
        }
    }
}

/// Take the exclusive lock on the pid file, then record our pid in it.
///
/// The file is opened without truncation so a failed attempt cannot wipe
/// the running daemon's pid.
fn acquire_lock(path: &Path) -> Result<File, LifecycleError> {
    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)?;
    file.try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    file.set_len(0)?;
    writeln!(file, "{}", std::process::id())?;
    Ok(file)
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon against the local Docker runtime
pub async fn startup(config: &Config) -> Result<StartupResult<DaemonRuntime>, LifecycleError> {
    startup_with(config, TracedRuntime::new(DockerAdapter::new())).await
}

/// Start the daemon with a given runtime adapter
pub async fn startup_with<R: RuntimeAdapter>(
    config: &Config,
    runtime: R,
) -> Result<StartupResult<R>, LifecycleError> {
    let result = startup_inner(config, runtime).await;
    // A held lock means the files belong to the running daemon
    if let Err(e) = &result {
        if !matches!(e, LifecycleError::LockFailed(_)) {
            remove_runtime_files(config);
        }
    }
    result
}

/// Startup steps; runtime files are removed by the caller on failure
async fn startup_inner<R: RuntimeAdapter>(
    config: &Config,
    runtime: R,
) -> Result<StartupResult<R>, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;
    if let Some(parent) = config.socket_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    // Lock first so two daemons never race on anything below
    let lock_file = acquire_lock(&config.lock_path)?;

    std::fs::create_dir_all(&config.engine.workspaces_dir)?;
    std::fs::create_dir_all(&config.engine.build_dir)?;
    std::fs::write(&config.version_path, env!("CARGO_PKG_VERSION"))?;

    // A corrupt metadata file stops startup
    let store = Arc::new(MetadataStore::open(&config.store_path)?);
    let workspaces = store.list_workspaces();
    info!(
        workspaces = workspaces.len(),
        versions = workspaces.iter().map(|w| w.versions.len()).sum::<usize>(),
        path = %config.store_path.display(),
        "loaded workspace metadata"
    );

    // Build workers start here
    let engine = Arc::new(Orchestrator::new(runtime, store, config.engine.clone()));

    // Bind last, once everything else has succeeded
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = match UnixListener::bind(&config.socket_path) {
        Ok(listener) => listener,
        Err(e) => {
            engine.shutdown().await;
            return Err(LifecycleError::BindFailed(config.socket_path.clone(), e));
        }
    };

    info!("Daemon started");

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            engine,
            start_time: Instant::now(),
        },
        listener,
    })
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
