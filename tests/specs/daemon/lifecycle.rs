//! Daemon lifecycle specs
//!
//! Verify daemon start/stop/status and recovery from a crashed daemon.

use crate::prelude::*;

#[test]
fn status_when_not_running() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["daemon", "status"])
        .passes()
        .stdout_eq("Daemon not running\n");
}

#[test]
fn start_status_stop() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["daemon", "start"])
        .passes()
        .stdout_eq("Daemon started\n");

    sandbox
        .sim()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running")
        .stdout_has("Workspaces: 0")
        .stdout_has("Readiness monitors: 0 active");

    sandbox
        .sim()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_eq("Daemon stopped\n");

    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || !sandbox
            .state_path()
            .join("daemon.sock")
            .exists()),
        "socket should be removed after stop"
    );
}

#[test]
fn second_start_reports_already_running() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["daemon", "start"]).passes();

    sandbox
        .sim()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon already running");
}

#[test]
fn status_json_has_version_and_counters() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    let status = sandbox
        .sim()
        .args(&["daemon", "status", "-o", "json"])
        .passes()
        .json();

    assert_eq!(status["status"], "running");
    assert_eq!(status["workspaces"], 1);
    assert_eq!(status["versions"], 0);
    assert!(status["version"].is_string());
}

#[test]
fn action_command_recovers_after_crash() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    assert!(sandbox.daemon_kill(), "daemon should be killable");
    let pid = sandbox.daemon_pid();
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            pid.is_some_and(|p| {
                !std::process::Command::new("kill")
                    .args(["-0", &p.to_string()])
                    .status()
                    .map(|s| s.success())
                    .unwrap_or(false)
            })
        }),
        "killed daemon should exit"
    );

    // Stale socket and pid file are cleaned up and a fresh daemon starts
    sandbox
        .sim()
        .args(&["workspace", "create", "globex"])
        .passes();

    sandbox
        .sim()
        .args(&["workspace", "list"])
        .passes()
        .stdout_has("acme")
        .stdout_has("globex");
}

#[test]
fn query_command_does_not_start_daemon() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["workspace", "list"])
        .fails()
        .stderr_has("Daemon not running");

    assert!(!sandbox.state_path().join("daemon.sock").exists());
}

#[test]
fn logs_include_startup_marker() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["daemon", "start"]).passes();

    sandbox
        .sim()
        .args(&["daemon", "logs"])
        .passes()
        .stdout_has("--- simd: starting (pid: ");
}

#[test]
fn corrupt_store_surfaces_startup_error() {
    let sandbox = Sandbox::new();
    std::fs::write(sandbox.state_path().join("data.json"), "{ not json").unwrap();

    sandbox
        .sim()
        .args(&["daemon", "start"])
        .fails()
        .stderr_has("Failed to start daemon");
}
