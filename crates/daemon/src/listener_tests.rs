// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use sim_adapters::{FakeRuntimeAdapter, RuntimeError, RuntimeOp};
use sim_core::{InstanceState, InstanceStatus, VersionKind};
use sim_engine::{CleanScope, EngineConfig, StartAction};
use sim_storage::MetadataStore;
use tempfile::{tempdir, TempDir};

use super::*;

struct Harness {
    dir: TempDir,
    fake: FakeRuntimeAdapter,
    ctx: ListenCtx<FakeRuntimeAdapter>,
}

impl Harness {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        let fake = FakeRuntimeAdapter::new();
        let store = Arc::new(MetadataStore::open(dir.path().join("data.json")).unwrap());
        let engine = Orchestrator::new(
            fake.clone(),
            store,
            EngineConfig::with_defaults(dir.path()),
        );
        Self {
            fake,
            ctx: ListenCtx {
                engine: Arc::new(engine),
                start_time: Instant::now(),
                shutdown: Arc::new(Notify::new()),
            },
            dir,
        }
    }

    async fn send(&self, request: Request) -> Response {
        handle_request(request, &self.ctx).await
    }

    fn upload(&self, name: &str) -> PathBuf {
        let path = self.dir.path().join("uploads").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "bundle").unwrap();
        path
    }

    async fn acme_with_bundle(&self) {
        self.send(Request::CreateWorkspace {
            name: "acme".to_string(),
            display_name: Some("Acme Corp".to_string()),
        })
        .await;
        let response = self
            .send(Request::AddVersion {
                workspace: "acme".to_string(),
                source: self.upload("bundle.tar.gz"),
                kind: VersionKind::SupportBundle,
                name: None,
            })
            .await;
        assert!(matches!(response, Response::VersionAdded { .. }), "{response:?}");
    }
}

fn acme_v1() -> (String, String) {
    ("acme".to_string(), "v1".to_string())
}

#[tokio::test]
async fn ping_and_hello() {
    let h = Harness::new();

    assert_eq!(h.send(Request::Ping).await, Response::Pong);
    assert_eq!(
        h.send(Request::Hello {
            version: "0.0.0".to_string()
        })
        .await,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn create_then_list_workspaces() {
    let h = Harness::new();
    h.acme_with_bundle().await;

    let Response::Workspaces { workspaces } = h.send(Request::ListWorkspaces).await else {
        panic!("expected workspaces");
    };

    assert_eq!(workspaces.len(), 1);
    assert_eq!(workspaces[0].name, "acme");
    assert_eq!(workspaces[0].display_name, "Acme Corp");
    assert_eq!(workspaces[0].version_count, 1);
}

#[tokio::test]
async fn invalid_workspace_name_is_an_error_response() {
    let h = Harness::new();

    let response = h
        .send(Request::CreateWorkspace {
            name: "Not Valid!".to_string(),
            display_name: None,
        })
        .await;

    let Response::Error { message } = response else {
        panic!("expected error, got {response:?}");
    };
    assert!(message.starts_with("invalid name"), "{message}");
}

#[tokio::test]
async fn unknown_workspace_reports_not_found() {
    let h = Harness::new();

    let response = h
        .send(Request::GetWorkspace {
            name: "ghost".to_string(),
        })
        .await;

    assert_eq!(
        response,
        Response::Error {
            message: "workspace not found: ghost".to_string()
        }
    );
}

#[tokio::test]
async fn rename_returns_updated_detail() {
    let h = Harness::new();
    h.acme_with_bundle().await;

    let response = h
        .send(Request::RenameWorkspace {
            name: "acme".to_string(),
            display_name: "Acme Industries".to_string(),
        })
        .await;

    let Response::Workspace { workspace } = response else {
        panic!("expected workspace, got {response:?}");
    };
    assert_eq!(workspace.display_name, "Acme Industries");
    assert_eq!(workspace.versions.len(), 1);
}

#[tokio::test]
async fn start_status_stop_walk() {
    let h = Harness::new();
    h.acme_with_bundle().await;
    let (workspace, version) = acme_v1();

    let started = h
        .send(Request::Start {
            workspace: workspace.clone(),
            version: version.clone(),
        })
        .await;
    let Response::Started {
        instance, action, ..
    } = started
    else {
        panic!("expected started, got {started:?}");
    };
    assert_eq!(instance, "acme-v1");
    assert_eq!(action, StartAction::Created);

    let status = h
        .send(Request::SimulatorStatus {
            workspace: workspace.clone(),
            version: version.clone(),
        })
        .await;
    let Response::SimulatorStatus {
        status,
        state,
        endpoint,
        ..
    } = status
    else {
        panic!("expected status, got {status:?}");
    };
    assert_eq!(
        status,
        InstanceStatus {
            running: true,
            ready: false
        }
    );
    assert_eq!(state, InstanceState::Initializing);
    assert!(endpoint.unwrap().starts_with("https://localhost:"));

    assert_eq!(
        h.send(Request::Stop {
            workspace: workspace.clone(),
            version: version.clone(),
        })
        .await,
        Response::Ok
    );
    let after = h.send(Request::SimulatorStatus { workspace, version }).await;
    let Response::SimulatorStatus {
        state, endpoint, ..
    } = after
    else {
        panic!("expected status, got {after:?}");
    };
    assert_eq!(state, InstanceState::Stopped);
    assert_eq!(endpoint, None);
}

#[tokio::test]
async fn status_for_missing_version_is_error() {
    let h = Harness::new();
    h.acme_with_bundle().await;

    let response = h
        .send(Request::SimulatorStatus {
            workspace: "acme".to_string(),
            version: "v9".to_string(),
        })
        .await;

    assert!(matches!(response, Response::Error { .. }), "{response:?}");
}

#[tokio::test]
async fn partial_clean_returns_results_and_message() {
    let h = Harness::new();
    h.acme_with_bundle().await;
    h.fake.add_container("acme-v1", true);
    h.fake.fail(
        RuntimeOp::Stop,
        RuntimeError::CommandFailed {
            code: 1,
            stderr: "permission denied".to_string(),
        },
    );

    let response = h
        .send(Request::Clean {
            scope: CleanScope::Workspace {
                workspace: "acme".to_string(),
            },
        })
        .await;

    let Response::CleanFailed { message, results } = response else {
        panic!("expected clean failure, got {response:?}");
    };
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "acme-v1");
    assert!(message.contains("permission denied"), "{message}");
}

#[tokio::test]
async fn clean_all_reports_each_instance() {
    let h = Harness::new();
    h.acme_with_bundle().await;
    h.fake.add_container("acme-v1", false);

    let response = h
        .send(Request::Clean {
            scope: CleanScope::All,
        })
        .await;

    let Response::Cleaned { results } = response else {
        panic!("expected cleaned, got {response:?}");
    };
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
    assert!(h.fake.containers().is_empty());
}

#[tokio::test]
async fn delete_version_reports_warnings() {
    let h = Harness::new();
    h.acme_with_bundle().await;
    h.fake.fail(
        RuntimeOp::Stop,
        RuntimeError::Unavailable("docker not running".to_string()),
    );

    let response = h
        .send(Request::DeleteVersion {
            workspace: "acme".to_string(),
            version: "v1".to_string(),
        })
        .await;

    let Response::Deleted { warnings } = response else {
        panic!("expected deleted, got {response:?}");
    };
    assert_eq!(warnings.len(), 1);
}

#[tokio::test]
async fn instances_lists_managed_containers() {
    let h = Harness::new();
    h.acme_with_bundle().await;
    let (workspace, version) = acme_v1();
    h.send(Request::Start { workspace, version }).await;

    let response = h.send(Request::Instances).await;

    let Response::Instances { instances } = response else {
        panic!("expected instances, got {response:?}");
    };
    assert_eq!(instances.len(), 1);
    assert_eq!(instances[0].name, "acme-v1");
    assert_eq!(instances[0].state, "running");
}

#[tokio::test]
async fn kubectl_returns_captured_output() {
    let h = Harness::new();
    h.acme_with_bundle().await;
    let (workspace, version) = acme_v1();
    h.send(Request::Start {
        workspace: workspace.clone(),
        version,
    })
    .await;
    h.fake.set_exec_output("NAME STATUS\nnode Ready\n", "");

    let response = h
        .send(Request::Kubectl {
            workspace,
            args: vec!["get".to_string(), "nodes".to_string()],
        })
        .await;

    assert_eq!(
        response,
        Response::Output {
            stdout: "NAME STATUS\nnode Ready\n".to_string(),
            stderr: String::new(),
        }
    );
}

#[tokio::test]
async fn status_counts_workspaces_and_versions() {
    let h = Harness::new();
    h.acme_with_bundle().await;

    let response = h.send(Request::Status).await;

    let Response::Status {
        workspaces,
        versions,
        monitors_active,
        ..
    } = response
    else {
        panic!("expected status, got {response:?}");
    };
    assert_eq!((workspaces, versions, monitors_active), (1, 1, 0));
}

#[tokio::test]
async fn shutdown_request_notifies_main_task() {
    let h = Harness::new();
    let notified = h.ctx.shutdown.clone();
    let waiter = tokio::spawn(async move { notified.notified().await });

    assert_eq!(h.send(Request::Shutdown).await, Response::ShuttingDown);

    tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
        .await
        .unwrap()
        .unwrap();
}

#[tokio::test]
async fn serves_requests_over_unix_socket() {
    let h = Harness::new();
    let socket_path = h.dir.path().join("daemon.sock");
    let socket = UnixListener::bind(&socket_path).unwrap();
    let listener = Listener::new(
        socket,
        ListenCtx {
            engine: Arc::clone(&h.ctx.engine),
            start_time: h.ctx.start_time,
            shutdown: Arc::clone(&h.ctx.shutdown),
        },
    );
    let task = tokio::spawn(listener.run());

    let stream = UnixStream::connect(&socket_path).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();
    let data = protocol::encode(&Request::Ping).unwrap();
    protocol::write_message(&mut writer, &data).await.unwrap();
    let bytes = protocol::read_message(&mut reader).await.unwrap();

    assert_eq!(protocol::decode::<Response>(&bytes).unwrap(), Response::Pong);
    task.abort();
}
