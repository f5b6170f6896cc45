// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tempfile::tempdir;
use yare::parameterized;

use super::*;
use crate::{Cli, Commands};

#[parameterized(
    seconds = { 42, "42s" },
    minutes = { 125, "2m 5s" },
    hours = { 3 * 3600 + 61, "3h 1m 1s" },
)]
fn uptime_formatting(secs: u64, expected: &str) {
    assert_eq!(format_uptime(secs), expected);
}

#[test]
fn status_lines_report_counters() {
    let status = DaemonStatus {
        uptime_secs: 90,
        workspaces: 2,
        versions: 5,
        monitors_active: 1,
    };

    let lines = status_lines(&status, "0.1.0");

    assert_eq!(
        lines,
        vec![
            "Status: running",
            "Version: 0.1.0",
            "Uptime: 1m 30s",
            "Workspaces: 2",
            "Versions: 5",
            "Readiness monitors: 1 active",
        ]
    );
}

#[test]
fn last_lines_respects_limit() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.log");
    std::fs::write(&path, "one\ntwo\nthree\nfour\n").unwrap();

    assert_eq!(read_last_lines(&path, Some(2)).unwrap(), vec!["three", "four"]);
    assert_eq!(read_last_lines(&path, Some(10)).unwrap().len(), 4);
    assert_eq!(read_last_lines(&path, None).unwrap().len(), 4);
}

#[test]
fn logs_limit_and_no_limit_conflict() {
    assert!(Cli::try_parse_from(["sim", "daemon", "logs", "-n", "5", "--no-limit"]).is_err());
}

#[test]
fn start_foreground_parses() {
    let cli = Cli::try_parse_from(["sim", "daemon", "start", "--foreground"]).unwrap();

    assert!(matches!(
        cli.command,
        Some(Commands::Daemon(DaemonArgs {
            command: DaemonCommand::Start { foreground: true }
        }))
    ));
}
