//! Workspace and version management specs
//!
//! Verify create/list/show/rename/delete through the CLI and daemon.

use crate::prelude::*;

#[test]
fn create_then_list_shows_workspace() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["workspace", "create", "acme", "--display-name", "Acme Corp"])
        .passes()
        .stdout_eq("Created workspace acme\n");

    sandbox
        .sim()
        .args(&["workspace", "list"])
        .passes()
        .stdout_has("acme")
        .stdout_has("Acme Corp");
}

#[test]
fn list_is_empty_on_fresh_daemon() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["daemon", "start"]).passes();

    sandbox
        .sim()
        .args(&["workspace", "list"])
        .passes()
        .stdout_eq("No workspaces\n");
}

#[test]
fn duplicate_workspace_is_rejected() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    sandbox
        .sim()
        .args(&["workspace", "create", "acme"])
        .fails()
        .stderr_has("workspace already exists: acme");
}

#[test]
fn invalid_workspace_name_is_rejected() {
    let sandbox = Sandbox::new();

    sandbox
        .sim()
        .args(&["workspace", "create", "no spaces"])
        .fails()
        .stderr_has("invalid name");
}

#[test]
fn rename_changes_display_name_only() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    sandbox
        .sim()
        .args(&["workspace", "rename", "acme", "Acme Industries"])
        .passes()
        .stdout_eq("Renamed workspace acme to \"Acme Industries\"\n");

    let show = sandbox
        .sim()
        .args(&["workspace", "show", "acme", "-o", "json"])
        .passes()
        .json();
    assert_eq!(show["name"], "acme");
    assert_eq!(show["display_name"], "Acme Industries");
}

#[test]
fn runtime_version_is_ready_immediately() {
    let sandbox = Sandbox::new();
    let kubeconfig = sandbox.file("live.yaml", KUBECONFIG);
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    let added = sandbox
        .sim()
        .args(&[
            "version",
            "add",
            "acme",
            kubeconfig.to_str().unwrap(),
            "--kind",
            "runtime",
            "-o",
            "json",
        ])
        .passes()
        .json();

    assert_eq!(added["id"], "v1");
    assert_eq!(added["kind"], "runtime");
    assert_eq!(added["ready"], true);
    assert_eq!(added["support_bundle_name"], "live.yaml");
}

#[test]
fn version_ids_are_never_reused() {
    let sandbox = Sandbox::new();
    let kubeconfig = sandbox.file("live.yaml", KUBECONFIG);
    let path = kubeconfig.to_str().unwrap();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();

    let add = || {
        sandbox
            .sim()
            .args(&["version", "add", "acme", path, "--kind", "runtime", "-o", "json"])
            .passes()
            .json()
    };
    assert_eq!(add()["id"], "v1");
    assert_eq!(add()["id"], "v2");

    sandbox
        .sim()
        .args(&["version", "delete", "acme", "v2"])
        .passes()
        .stdout_has("Deleted version acme/v2");

    assert_eq!(add()["id"], "v3");
}

#[test]
fn delete_workspace_removes_it_from_list() {
    let sandbox = Sandbox::new();
    sandbox.sim().args(&["workspace", "create", "acme"]).passes();
    sandbox.sim().args(&["workspace", "create", "globex"]).passes();

    sandbox
        .sim()
        .args(&["workspace", "delete", "acme"])
        .passes()
        .stdout_has("Deleted workspace acme");

    sandbox
        .sim()
        .args(&["workspace", "list"])
        .passes()
        .stdout_has("globex")
        .stdout_lacks("acme");
}

#[test]
fn workspaces_survive_daemon_restart() {
    let sandbox = Sandbox::new();
    sandbox
        .sim()
        .args(&["workspace", "create", "acme", "--display-name", "Acme Corp"])
        .passes();

    sandbox.sim().args(&["daemon", "restart"]).passes();

    sandbox
        .sim()
        .args(&["workspace", "show", "acme"])
        .passes()
        .stdout_has("Display name: Acme Corp");
}
