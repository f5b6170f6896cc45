// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon log file.
//!
//! `daemon.log` is append-only across restarts. Each start writes a marker
//! line first so the CLI can find the output of the current attempt, and
//! startup failures are written synchronously because the tracing writer
//! is non-blocking and the process may exit before it flushes.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;

use crate::lifecycle::LifecycleError;

/// Rotate once the log passes this size.
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated copies kept next to the live log, `.1` newest.
pub const MAX_ROTATIONS: u32 = 3;

/// Full marker: `--- simd: starting (pid: 12345) ---`
pub const STARTUP_MARKER_PREFIX: &str = "--- simd: starting (pid: ";

pub struct DaemonLog {
    path: PathBuf,
}

impl DaemonLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn rotated(&self, n: u32) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    /// Shift the log into `.1` (older copies up by one, the oldest dropped)
    /// once it is over [`MAX_LOG_SIZE`]. Failures leave the log in place.
    pub fn rotate_if_needed(&self) {
        let oversized = std::fs::metadata(&self.path).is_ok_and(|m| m.len() > MAX_LOG_SIZE);
        if !oversized {
            return;
        }

        let _ = std::fs::remove_file(self.rotated(MAX_ROTATIONS));
        for n in (1..MAX_ROTATIONS).rev() {
            let _ = std::fs::rename(self.rotated(n), self.rotated(n + 1));
        }
        let _ = std::fs::rename(&self.path, self.rotated(1));
    }

    fn append(&self) -> std::io::Result<std::fs::File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        OpenOptions::new().create(true).append(true).open(&self.path)
    }

    pub fn mark_startup(&self) -> Result<(), LifecycleError> {
        let mut file = self.append()?;
        writeln!(file, "{}{}) ---", STARTUP_MARKER_PREFIX, std::process::id())?;
        Ok(())
    }

    pub fn record_startup_error(&self, error: &LifecycleError) {
        if let Ok(mut file) = self.append() {
            let _ = writeln!(file, "ERROR Failed to start daemon: {}", error);
        }
    }

    /// Install the global subscriber writing to this file.
    ///
    /// `RUST_LOG` overrides the default `info` filter. Keep the guard alive
    /// for as long as log lines should reach the file.
    pub fn install(&self) -> Result<WorkerGuard, LifecycleError> {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let dir = self.path.parent().ok_or(LifecycleError::NoStateDir)?;
        let file_name = self.path.file_name().ok_or(LifecycleError::NoStateDir)?;
        std::fs::create_dir_all(dir)?;

        let (writer, guard) =
            tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_ansi(false).with_writer(writer))
            .init();

        Ok(guard)
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
