// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Spawning, signalling and inspecting the `simd` process from the CLI.
//!
//! Everything here works from the files `simd` leaves in its state
//! directory; see [`StateFiles`].

use crate::client::ClientError;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// First bytes `simd` writes to its log on every start. Only log lines
/// after the newest marker belong to the current startup attempt.
const STARTUP_MARKER_PREFIX: &str = "--- simd: starting (pid: ";

/// Paths of the files `simd` maintains in a state directory.
pub struct StateFiles {
    dir: PathBuf,
}

impl StateFiles {
    pub fn locate() -> Result<Self, ClientError> {
        Ok(Self::at(crate::env::state_dir()?))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn socket(&self) -> PathBuf {
        self.dir.join("daemon.sock")
    }

    pub fn pid_file(&self) -> PathBuf {
        self.dir.join("daemon.pid")
    }

    pub fn log(&self) -> PathBuf {
        self.dir.join("daemon.log")
    }

    pub fn version_file(&self) -> PathBuf {
        self.dir.join("daemon.version")
    }

    /// Pid recorded by the running (or last) daemon. Unparsable reads as none.
    pub fn read_pid(&self) -> Option<u32> {
        std::fs::read_to_string(self.pid_file())
            .ok()
            .and_then(|content| content.trim().parse().ok())
    }

    pub fn read_version(&self) -> Option<String> {
        std::fs::read_to_string(self.version_file())
            .ok()
            .map(|v| v.trim().to_string())
    }

    pub fn remove_pid(&self) {
        let _ = std::fs::remove_file(self.pid_file());
    }

    /// Remove the socket and pid file left by a daemon that is gone.
    ///
    /// Nothing is touched while the recorded pid is alive. A socket with
    /// no pid file (or an unreadable one) is always stale.
    pub fn remove_stale(&self) {
        if self.read_pid().is_some_and(process_exists) {
            return;
        }
        let _ = std::fs::remove_file(self.socket());
        self.remove_pid();
    }

    /// Errors `simd` logged during its most recent startup attempt.
    pub fn startup_error(&self) -> Option<String> {
        let content = std::fs::read_to_string(self.log()).ok()?;
        parse_startup_error(&content)
    }
}

fn parse_startup_error(log: &str) -> Option<String> {
    let attempt = &log[log.rfind(STARTUP_MARKER_PREFIX)?..];

    let messages: Vec<&str> = attempt
        .lines()
        .filter(|line| line.contains(" ERROR ") || line.contains("Failed to start"))
        .map(|line| line.split_once(": ").map_or(line, |(_, msg)| msg))
        .collect();

    if messages.is_empty() {
        None
    } else {
        Some(messages.join("\n"))
    }
}

#[derive(Clone, Copy)]
enum Signal {
    /// Existence check only
    Probe,
    Term,
    Kill,
}

fn send_signal(signal: Signal, pid: u32) -> bool {
    let flag = match signal {
        Signal::Probe => "-0",
        Signal::Term => "-15",
        Signal::Kill => "-9",
    };
    Command::new("kill")
        .args([flag, &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|s| s.success())
}

pub fn process_exists(pid: u32) -> bool {
    send_signal(Signal::Probe, pid)
}

pub fn force_kill_daemon(pid: u32) -> bool {
    send_signal(Signal::Kill, pid)
}

/// Poll until `pid` is gone. Returns false if it outlived `timeout`.
pub async fn wait_for_exit(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while process_exists(pid) {
        if start.elapsed() >= timeout {
            return false;
        }
        tokio::time::sleep(crate::client::poll_interval()).await;
    }
    true
}

fn wait_for_exit_blocking(pid: u32, timeout: Duration) -> bool {
    let start = Instant::now();
    while process_exists(pid) {
        if start.elapsed() >= timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    true
}

/// SIGTERM, then SIGKILL if the daemon lingers, without an async runtime.
///
/// The version-mismatch restart runs inside synchronous connect code.
pub fn stop_daemon_sync() {
    let Ok(files) = StateFiles::locate() else {
        return;
    };
    if let Some(pid) = files.read_pid() {
        let timeout = crate::client::timeout_exit();
        for signal in [Signal::Term, Signal::Kill] {
            send_signal(signal, pid);
            if wait_for_exit_blocking(pid, timeout) {
                break;
            }
        }
    }
    files.remove_pid();
}

/// Restart a daemon built from another version of this crate.
///
/// Returns true when a restart was triggered.
pub fn stop_if_outdated(files: &StateFiles, expected: &str) -> bool {
    match files.read_version() {
        Some(running) if running != expected => {
            eprintln!(
                "warn: daemon version {} does not match cli version {}, restarting daemon",
                running, expected
            );
            stop_daemon_sync();
            true
        }
        _ => false,
    }
}

pub fn start_daemon_background() -> Result<std::process::Child, ClientError> {
    Command::new(find_simd_binary()?)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::DaemonStartFailed(e.to_string()))
}

/// Locate `simd`: `SIM_DAEMON_BINARY`, then the workspace debug build
/// (debug CLI builds only), then next to this executable, then `$PATH`.
pub fn find_simd_binary() -> Result<PathBuf, ClientError> {
    if let Some(path) = crate::env::daemon_binary() {
        return Ok(PathBuf::from(path));
    }

    let exe = std::env::current_exe().ok();
    let debug_cli = exe
        .as_deref()
        .and_then(Path::to_str)
        .is_some_and(|s| s.contains("target/debug"));

    if debug_cli {
        let dev_build = crate::env::cargo_manifest_dir()
            .map(PathBuf::from)
            .and_then(|manifest| manifest.ancestors().nth(2).map(Path::to_path_buf))
            .map(|root| root.join("target/debug/simd"));
        if let Some(path) = dev_build.filter(|p| p.exists()) {
            return Ok(path);
        }
    }

    if let Some(sibling) = exe
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join("simd"))
        .filter(|p| p.exists())
    {
        return Ok(sibling);
    }

    Ok(PathBuf::from("simd"))
}

pub fn daemon_dir() -> Result<PathBuf, ClientError> {
    crate::env::state_dir()
}

pub fn daemon_socket() -> Result<PathBuf, ClientError> {
    Ok(StateFiles::locate()?.socket())
}

/// A socket file can outlive its daemon; only a successful connect counts.
pub fn probe_socket(socket_path: &Path) -> bool {
    std::os::unix::net::UnixStream::connect(socket_path).is_ok()
}

pub fn read_startup_error() -> Option<String> {
    StateFiles::locate().ok()?.startup_error()
}

/// Replace a generic connect failure with what `simd` logged, if anything.
pub fn wrap_with_startup_error(err: ClientError) -> ClientError {
    if matches!(err, ClientError::DaemonStartFailed(_)) {
        return err;
    }
    read_startup_error().map_or(err, ClientError::DaemonStartFailed)
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
