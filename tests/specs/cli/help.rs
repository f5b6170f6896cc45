//! CLI help output specs

use crate::prelude::*;

#[test]
fn no_arguments_prints_help() {
    cli()
        .passes()
        .stdout_has("Usage: sim")
        .stdout_has("workspace")
        .stdout_has("kubeconfig");
}

#[test]
fn help_lists_every_command() {
    let result = cli().args(&["--help"]).passes();
    for command in [
        "workspace",
        "version",
        "start",
        "stop",
        "status",
        "kubeconfig",
        "clean",
        "instances",
        "kubectl",
        "daemon",
    ] {
        assert!(
            result.stdout().contains(command),
            "help should mention {command}:\n{}",
            result.stdout()
        );
    }
}

#[test]
fn start_help_documents_wait() {
    cli()
        .args(&["start", "--help"])
        .passes()
        .stdout_has("--wait")
        .stdout_has("--timeout");
}

#[test]
fn version_add_help_lists_kinds() {
    cli()
        .args(&["version", "add", "--help"])
        .passes()
        .stdout_has("support-bundle")
        .stdout_has("runtime");
}
