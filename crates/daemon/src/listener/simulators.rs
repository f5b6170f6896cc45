// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulator lifecycle, cleanup, and cluster access handlers.

use sim_adapters::RuntimeAdapter;
use sim_core::instance_name;
use sim_engine::{CleanScope, EngineError, Orchestrator};
use tracing::warn;

use crate::protocol::{InstanceEntry, Response};

pub(super) async fn handle_start<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    workspace: &str,
    version: &str,
) -> Result<Response, EngineError> {
    let outcome = engine.start(workspace, version).await?;
    Ok(Response::Started {
        instance: outcome.instance,
        container_id: outcome.container_id,
        action: outcome.action,
        monitoring: outcome.monitoring,
    })
}

pub(super) async fn handle_status<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    workspace: &str,
    version: &str,
) -> Result<Response, EngineError> {
    let ws = engine.get_workspace(workspace)?;
    let Some(ver) = ws.version(version) else {
        return Err(EngineError::NotFound(format!(
            "version not found: {workspace}/{version}"
        )));
    };
    let instance = instance_name(&ws.name, &ver.id);
    let status = engine.status(workspace, version).await?;
    let state = engine.state(workspace, version).await?;
    let endpoint = if state.is_running() {
        match engine.endpoint(workspace, version).await {
            Ok(endpoint) => Some(endpoint.to_string()),
            Err(e) => {
                warn!(workspace, version, error = %e, "no endpoint for running simulator");
                None
            }
        }
    } else {
        None
    };
    Ok(Response::SimulatorStatus {
        instance: instance.to_string(),
        status,
        state,
        endpoint,
    })
}

pub(super) async fn handle_kubeconfig<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    workspace: &str,
    version: &str,
) -> Result<Response, EngineError> {
    let bytes = engine.admin_kubeconfig(workspace, version).await?;
    Ok(Response::Kubeconfig {
        content: String::from_utf8_lossy(&bytes).into_owned(),
    })
}

/// Clean always reports per-item results, even when some items failed.
pub(super) async fn handle_clean<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    scope: &CleanScope,
) -> Response {
    match engine.clean(scope).await {
        Ok(results) => Response::Cleaned { results },
        Err(EngineError::PartialCleanup(results)) => Response::CleanFailed {
            message: EngineError::PartialCleanup(results.clone()).to_string(),
            results,
        },
        Err(e) => Response::Error {
            message: e.to_string(),
        },
    }
}

pub(super) async fn handle_instances<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
) -> Result<Response, EngineError> {
    let containers = engine.list_instances().await?;
    Ok(Response::Instances {
        instances: containers.iter().map(InstanceEntry::from).collect(),
    })
}

pub(super) async fn handle_kubectl<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    workspace: &str,
    args: &[String],
) -> Result<Response, EngineError> {
    let output = engine.kubectl(workspace, args).await?;
    Ok(Response::Output {
        stdout: output.stdout,
        stderr: output.stderr,
    })
}
