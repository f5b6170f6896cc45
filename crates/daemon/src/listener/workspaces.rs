// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace and version request handlers.

use std::path::Path;

use sim_adapters::RuntimeAdapter;
use sim_core::VersionKind;
use sim_engine::{EngineError, Orchestrator};

use crate::protocol::{Response, VersionSummary, WorkspaceDetail, WorkspaceSummary};

pub(super) fn handle_create<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    name: &str,
    display_name: Option<&str>,
) -> Result<Response, EngineError> {
    let ws = engine.create_workspace(name, display_name)?;
    Ok(Response::Workspace {
        workspace: WorkspaceDetail::from(&ws),
    })
}

pub(super) fn handle_list<R: RuntimeAdapter>(engine: &Orchestrator<R>) -> Response {
    Response::Workspaces {
        workspaces: engine
            .list_workspaces()
            .iter()
            .map(WorkspaceSummary::from)
            .collect(),
    }
}

pub(super) fn handle_get<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    name: &str,
) -> Result<Response, EngineError> {
    let ws = engine.get_workspace(name)?;
    Ok(Response::Workspace {
        workspace: WorkspaceDetail::from(&ws),
    })
}

pub(super) fn handle_rename<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    name: &str,
    display_name: &str,
) -> Result<Response, EngineError> {
    let ws = engine.rename_workspace(name, display_name)?;
    Ok(Response::Workspace {
        workspace: WorkspaceDetail::from(&ws),
    })
}

pub(super) async fn handle_delete<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    name: &str,
) -> Result<Response, EngineError> {
    let report = engine.delete_workspace(name).await?;
    Ok(Response::Deleted {
        warnings: report.warnings,
    })
}

pub(super) fn handle_add_version<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    workspace: &str,
    source: &Path,
    kind: VersionKind,
    name: Option<&str>,
) -> Result<Response, EngineError> {
    let version = engine.add_version(workspace, source, kind, name)?;
    Ok(Response::VersionAdded {
        workspace: workspace.to_string(),
        version: VersionSummary::from(&version),
    })
}

pub(super) async fn handle_delete_version<R: RuntimeAdapter>(
    engine: &Orchestrator<R>,
    workspace: &str,
    version: &str,
) -> Result<Response, EngineError> {
    let report = engine.delete_version(workspace, version).await?;
    Ok(Response::Deleted {
        warnings: report.warnings,
    })
}
