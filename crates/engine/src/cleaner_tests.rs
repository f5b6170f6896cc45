// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::TestContext;
use sim_adapters::{RuntimeCall, RuntimeError, RuntimeOp};

fn cleaner(ctx: &TestContext) -> Cleaner<sim_adapters::FakeRuntimeAdapter> {
    Cleaner::new(ctx.fake.clone(), Arc::clone(&ctx.store))
}

fn docker_failure(stderr: &str) -> RuntimeError {
    RuntimeError::CommandFailed {
        code: 1,
        stderr: stderr.to_string(),
    }
}

#[tokio::test]
async fn clean_instance_with_nothing_present_succeeds() {
    let ctx = TestContext::new();

    cleaner(&ctx)
        .clean_instance(&InstanceName::new("acme-v1"))
        .await
        .unwrap();

    assert_eq!(ctx.fake.call_count(RuntimeOp::Stop), 1);
    assert_eq!(ctx.fake.call_count(RuntimeOp::Remove), 1);
    assert_eq!(ctx.fake.call_count(RuntimeOp::RemoveImages), 1);
}

#[tokio::test]
async fn clean_instance_stops_then_removes_then_drops_images() {
    let ctx = TestContext::new();
    ctx.fake.add_container("acme-v1", true);
    ctx.fake.add_image("acme-v1");

    cleaner(&ctx)
        .clean_instance(&InstanceName::new("acme-v1"))
        .await
        .unwrap();

    let ops: Vec<RuntimeOp> = ctx.fake.calls().iter().map(RuntimeCall::op).collect();
    assert_eq!(
        ops,
        vec![RuntimeOp::Stop, RuntimeOp::Remove, RuntimeOp::RemoveImages]
    );
    assert!(ctx.fake.container("acme-v1").is_none());
    assert!(!ctx.fake.has_image("acme-v1"));
}

#[tokio::test]
async fn clean_instance_wraps_failure_with_step_and_instance() {
    let ctx = TestContext::new();
    ctx.fake
        .fail(RuntimeOp::Remove, docker_failure("device or resource busy"));

    let err = cleaner(&ctx)
        .clean_instance(&InstanceName::new("acme-v1"))
        .await
        .unwrap_err();

    let message = err.to_string();
    assert!(message.contains("remove containers for acme-v1"), "{message}");
    assert!(message.contains("device or resource busy"), "{message}");
    assert_eq!(ctx.fake.call_count(RuntimeOp::RemoveImages), 0);
}

#[tokio::test]
async fn clean_all_reports_one_result_per_version_in_order() {
    let ctx = TestContext::new();
    for ver in ["v1", "v2", "v3"] {
        ctx.add_bundle_version("acme", ver);
        ctx.fake.add_container(&format!("acme-{ver}"), true);
    }

    let results = cleaner(&ctx).clean_all("acme").await;

    let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["acme-v1", "acme-v2", "acme-v3"]);
    assert!(results.iter().all(CleanResult::is_ok));
    assert!(ctx.fake.containers().is_empty());
    assert_eq!(results[1].workspace.as_deref(), Some("acme"));
    assert_eq!(results[1].version.as_deref(), Some("v2"));
}

#[tokio::test]
async fn clean_all_does_not_abort_siblings() {
    let ctx = TestContext::new();
    for ver in ["v1", "v2", "v3"] {
        ctx.add_bundle_version("acme", ver);
        ctx.fake.add_container(&format!("acme-{ver}"), true);
    }
    ctx.fake
        .fail_for(RuntimeOp::Stop, "acme-v2", docker_failure("daemon hiccup"));

    let results = cleaner(&ctx).clean_all("acme").await;

    assert!(results[0].is_ok());
    assert!(!results[1].is_ok());
    assert!(results[2].is_ok());
    assert!(ctx.fake.container("acme-v1").is_none());
    assert!(ctx.fake.container("acme-v2").is_some());
    assert!(ctx.fake.container("acme-v3").is_none());
}

#[tokio::test]
async fn clean_all_unknown_workspace_is_single_workspace_result() {
    let ctx = TestContext::new();

    let results = cleaner(&ctx).clean_all("ghost").await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, WORKSPACE_KEY);
    assert_eq!(results[0].workspace.as_deref(), Some("ghost"));
    assert!(results[0].error.as_deref().unwrap().contains("ghost"));
    assert!(ctx.fake.calls().is_empty());
}

#[yare::parameterized(
    none_failing = { 4, 0 },
    one_failing  = { 4, 1 },
    all_failing  = { 3, 3 },
)]
fn clean_all_workspaces_counts_failures(total: usize, failing: usize) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let ctx = TestContext::new();
        for n in 0..total {
            let ws = format!("ws{n}");
            ctx.add_bundle_version(&ws, "v1");
            if n < failing {
                ctx.fake.fail_for(
                    RuntimeOp::RemoveImages,
                    &format!("{ws}-v1"),
                    docker_failure("image is in use"),
                );
            }
        }

        let results = cleaner(&ctx).clean_all_workspaces().await;

        assert_eq!(results.len(), total);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), total - failing);
        assert_eq!(format_results(&results).len(), failing);
    });
}

#[test]
fn format_results_lists_failures_only() {
    let results = vec![
        CleanResult {
            id: "acme-v1".to_string(),
            workspace: Some("acme".to_string()),
            version: Some("v1".to_string()),
            error: None,
        },
        CleanResult {
            id: "acme-v2".to_string(),
            workspace: Some("acme".to_string()),
            version: Some("v2".to_string()),
            error: Some("failed to stop acme-v2: boom".to_string()),
        },
    ];

    assert_eq!(
        format_results(&results),
        vec!["acme-v2: failed to stop acme-v2: boom".to_string()]
    );
}

#[test]
fn clean_result_omits_empty_fields_on_the_wire() {
    let result = CleanResult {
        id: WORKSPACE_KEY.to_string(),
        workspace: None,
        version: None,
        error: Some("workspace not found: ghost".to_string()),
    };

    let json = serde_json::to_value(&result).unwrap();

    assert_eq!(
        json,
        serde_json::json!({"id": "workspace", "error": "workspace not found: ghost"})
    );
}
