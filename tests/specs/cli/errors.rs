//! CLI error reporting specs

use crate::prelude::*;

#[test]
fn unknown_subcommand_fails() {
    cli()
        .args(&["frobnicate"])
        .fails()
        .stderr_has("unrecognized subcommand");
}

#[test]
fn status_requires_a_version() {
    cli()
        .args(&["status", "acme"])
        .fails()
        .stderr_has("<VERSION>");
}

#[test]
fn unknown_workspace_is_reported() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["daemon", "start"]).passes();

    sandbox
        .sim()
        .args(&["workspace", "show", "ghost"])
        .fails()
        .stderr_has("Error: workspace not found: ghost");
}

#[test]
fn missing_upload_source_is_reported_locally() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    sandbox
        .sim()
        .args(&["version", "add", "acme", "does-not-exist.tar.gz"])
        .fails()
        .stderr_has("cannot read does-not-exist.tar.gz");
}

#[test]
fn status_of_unknown_version_is_reported() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    sandbox
        .sim()
        .args(&["status", "acme", "v3"])
        .fails()
        .stderr_has("version not found: acme/v3");
}

#[test]
fn kubeconfig_requires_running_daemon() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["kubeconfig", "acme", "v1"])
        .fails()
        .stderr_has("Daemon not running");
}
