// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulator Daemon (simd)
//!
//! Background process that owns the workspace metadata, the build workers,
//! and the readiness monitors for simulator containers.
//!
//! Architecture:
//! - Listener Task: Spawned task handling socket I/O, one task per connection
//! - Main Task: Waits for a shutdown request or signal, then tears down

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::sync::Arc;

use sim_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use sim_daemon::listener::{ListenCtx, Listener};
use sim_daemon::logging::DaemonLog;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Answer `--help`/`--version` without touching the state directory.
/// Returns false (after printing usage) for anything else.
fn answer_info_flag(arg: &str) -> bool {
    match arg {
        "--version" | "-V" | "-v" => println!("simd {VERSION}"),
        "--help" | "-h" | "help" => {
            println!("simd {VERSION}");
            println!("Simulator daemon: builds, runs, and watches cluster simulators");
            println!();
            println!("Usage: simd [--help | --version]");
            println!();
            println!("Started on demand by `sim`; listens on <state dir>/daemon.sock.");
            println!("Set SIM_STATE_DIR to run an isolated instance.");
        }
        _ => {
            eprintln!("error: unexpected argument '{arg}'");
            eprintln!("Usage: simd [--help | --version]");
            return false;
        }
    }
    true
}

/// Tell whoever launched us which daemon holds the lock.
fn report_already_running(config: &Config) {
    let read = |path: &std::path::Path| {
        std::fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    };
    let pid = read(&config.lock_path);
    let version = read(&config.version_path);

    eprintln!("simd is already running");
    if !pid.is_empty() {
        eprintln!("  pid: {pid}");
    }
    match version.as_str() {
        "" => {}
        v if v == VERSION => eprintln!("  version: {v}"),
        v => eprintln!("  version: {v} (outdated, current: {VERSION})"),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Some(arg) = std::env::args().nth(1) {
        if answer_info_flag(&arg) {
            return Ok(());
        }
        std::process::exit(1);
    }

    let config = Config::load()?;

    // Marker goes in before the subscriber so the CLI can find it
    let log = DaemonLog::new(&config.log_path);
    log.rotate_if_needed();
    log.mark_startup()?;
    let log_guard = log.install()?;

    info!("Starting user-level daemon");

    let StartupResult {
        mut daemon,
        listener: unix_listener,
    } = match lifecycle::startup(&config).await {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            report_already_running(&config);
            std::process::exit(1);
        }
        Err(e) => {
            log.record_startup_error(&e);
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let shutdown_notify = Arc::new(Notify::new());

    let listener = Listener::new(
        unix_listener,
        ListenCtx {
            engine: Arc::clone(&daemon.engine),
            start_time: daemon.start_time,
            shutdown: Arc::clone(&shutdown_notify),
        },
    );
    tokio::spawn(listener.run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(
        "Daemon ready, listening on {}",
        config.socket_path.display()
    );

    // Signal ready for parent process (e.g., systemd, CLI waiting for startup)
    println!("READY");

    // Reattach readiness monitors to simulators that were still booting
    // when the previous daemon stopped; the daemon already accepts connections
    let engine = Arc::clone(&daemon.engine);
    tokio::spawn(async move {
        let resumed = engine.resume_monitors().await;
        info!(resumed, "background monitor recovery complete");
    });

    tokio::select! {
        _ = shutdown_notify.notified() => {
            info!("Shutdown requested via command");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    daemon.shutdown().await?;
    info!("Daemon stopped");
    Ok(())
}
