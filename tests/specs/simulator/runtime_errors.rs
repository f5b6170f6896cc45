//! Simulator command specs that need no container runtime
//!
//! The sandbox points `SIM_DOCKER_BIN` at a missing binary, so every
//! runtime call fails the same way on every machine.

use crate::prelude::*;

fn with_runtime_version(sandbox: &Sandbox) {
    let kubeconfig = sandbox.file("live.yaml", KUBECONFIG);
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();
    sandbox
        .sim()
        .args(&[
            "version",
            "add",
            "acme",
            kubeconfig.to_str().unwrap(),
            "--kind",
            "runtime",
        ])
        .passes();
}

#[test]
fn start_unknown_workspace_fails() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["start", "ghost", "v1"])
        .fails()
        .stderr_has("workspace not found: ghost");
}

#[test]
fn start_unknown_version_fails() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    sandbox
        .sim()
        .args(&["start", "acme", "v7"])
        .fails()
        .stderr_has("version not found: acme/v7");
}

#[test]
fn runtime_versions_have_no_simulator() {
    let sandbox = Sandbox::new();
    with_runtime_version(&sandbox);

    sandbox
        .sim()
        .args(&["start", "acme", "v1"])
        .fails()
        .stderr_has("there is no simulator to start");
}

#[test]
fn support_bundle_start_without_runtime_fails() {
    let sandbox = Sandbox::new();
    let bundle = sandbox.file("bundle.tar.gz", "not really a tarball");
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();
    sandbox
        .sim()
        .args(&["version", "add", "acme", bundle.to_str().unwrap()])
        .passes()
        .stdout_has("Added support-bundle v1 to workspace acme");

    sandbox
        .sim()
        .args(&["start", "acme", "v1"])
        .fails()
        .stderr_has("runtime unavailable");
}

#[test]
fn instances_without_runtime_fails() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["daemon", "start"]).passes();

    sandbox
        .sim()
        .args(&["instances"])
        .fails()
        .stderr_has("runtime unavailable");
}

#[test]
fn clean_reports_each_failed_instance() {
    let sandbox = Sandbox::new();
    with_runtime_version(&sandbox);

    let result = sandbox.sim().args(&["clean", "acme"]).fails();

    assert!(result.stdout().contains("acme-v1"), "{}", result.stdout());
    assert!(
        result.stderr().contains("clean failed for 1 item(s)"),
        "{}",
        result.stderr()
    );
}

#[test]
fn clean_needs_a_scope() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["clean"])
        .fails()
        .stderr_has("<WORKSPACE>");
}
