// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use serial_test::serial;
use sim_daemon::{Request, Response};
use tempfile::tempdir;

use super::*;
use crate::test_daemon::FakeDaemon;
use crate::{Cli, Commands};

#[test]
fn kubectl_passes_flags_through() {
    let cli = Cli::try_parse_from(["sim", "kubectl", "acme", "get", "pods", "-A", "-o", "wide"])
        .unwrap();

    let Some(Commands::Kubectl(args)) = cli.command else {
        panic!("expected kubectl");
    };
    assert_eq!(args.workspace, "acme");
    assert_eq!(args.args, vec!["get", "pods", "-A", "-o", "wide"]);
}

#[test]
fn kubectl_without_args_is_rejected() {
    assert!(Cli::try_parse_from(["sim", "kubectl", "acme"]).is_err());
}

#[test]
#[serial]
fn list_shows_dash_for_stopped_endpoint() {
    std::env::set_var("NO_COLOR", "1");
    let instances = vec![
        InstanceEntry {
            name: "acme-v1".to_string(),
            id: "0123456789ab".to_string(),
            state: "running".to_string(),
            status: "Up 3 minutes".to_string(),
            endpoint: Some("https://localhost:32768".to_string()),
        },
        InstanceEntry {
            name: "acme-v2".to_string(),
            id: "ba9876543210".to_string(),
            state: "exited".to_string(),
            status: "Exited (0) 1 hour ago".to_string(),
            endpoint: None,
        },
    ];
    let mut buf = Vec::new();

    render_list(&instances, &mut buf);

    let out = String::from_utf8(buf).unwrap();
    let lines: Vec<&str> = out.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[1].ends_with("https://localhost:32768"), "{out}");
    assert!(lines[2].ends_with(" -"), "{out}");
    std::env::remove_var("NO_COLOR");
}

#[tokio::test]
async fn kubectl_sends_workspace_and_args() {
    let dir = tempdir().unwrap();
    let daemon = FakeDaemon::spawn(
        dir.path(),
        vec![Response::Output {
            stdout: "node Ready\n".to_string(),
            stderr: String::new(),
        }],
    );
    let args = KubectlArgs {
        workspace: "acme".to_string(),
        args: vec!["get".to_string(), "nodes".to_string()],
    };

    kubectl(args, &daemon.client).await.unwrap();

    assert_eq!(
        daemon.requests(),
        vec![Request::Kubectl {
            workspace: "acme".to_string(),
            args: vec!["get".to_string(), "nodes".to_string()],
        }]
    );
}
