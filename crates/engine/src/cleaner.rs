// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime cleanup for simulator instances.
//!
//! Cleaning an instance stops it, removes every container carrying its
//! name, and removes every image tagged for it. Workspace-wide and global
//! cleans fan out per version and collect a result for each one; a
//! failing version never aborts its siblings. Resetting the `ready` flag
//! is left to the caller.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use sim_adapters::RuntimeAdapter;
use sim_core::{instance_name, InstanceName, VersionId, WorkspaceName};
use sim_storage::{MetadataStore, Workspace};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Result key used when the workspace itself cannot be loaded.
pub const WORKSPACE_KEY: &str = "workspace";

/// Outcome of cleaning one instance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanResult {
    /// Instance name, or a scope key for lookup failures
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CleanResult {
    fn for_instance(
        workspace: &WorkspaceName,
        version: &VersionId,
        instance: &InstanceName,
        outcome: Result<(), EngineError>,
    ) -> Self {
        Self {
            id: instance.to_string(),
            workspace: Some(workspace.to_string()),
            version: Some(version.to_string()),
            error: outcome.err().map(|e| e.to_string()),
        }
    }

    fn lookup_failure(key: &str, workspace: Option<&str>, error: impl ToString) -> Self {
        Self {
            id: key.to_string(),
            workspace: workspace.map(str::to_string),
            version: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// `"<id>: <error>"` for every failed result, in order.
pub fn format_results(results: &[CleanResult]) -> Vec<String> {
    results
        .iter()
        .filter_map(|r| r.error.as_ref().map(|e| format!("{}: {}", r.id, e)))
        .collect()
}

/// Removes runtime artifacts for instances.
pub struct Cleaner<R> {
    runtime: R,
    store: Arc<MetadataStore>,
}

impl<R: RuntimeAdapter> Cleaner<R> {
    pub fn new(runtime: R, store: Arc<MetadataStore>) -> Self {
        Self { runtime, store }
    }

    /// Stop, remove containers, remove images. Nothing present is success.
    pub async fn clean_instance(&self, instance: &InstanceName) -> Result<(), EngineError> {
        clean_instance(&self.runtime, instance).await
    }

    /// Clean every version of one workspace, in version order.
    pub async fn clean_all(&self, workspace: &str) -> Vec<CleanResult> {
        match self.store.get_workspace(workspace) {
            Ok(ws) => self.clean_versions(vec![ws]).await,
            Err(e) => {
                warn!(workspace, error = %e, "cannot load workspace for clean");
                vec![CleanResult::lookup_failure(WORKSPACE_KEY, Some(workspace), e)]
            }
        }
    }

    /// Clean every version of every workspace.
    pub async fn clean_all_workspaces(&self) -> Vec<CleanResult> {
        self.clean_versions(self.store.list_workspaces()).await
    }

    async fn clean_versions(&self, workspaces: Vec<Workspace>) -> Vec<CleanResult> {
        let targets: Vec<(WorkspaceName, VersionId, InstanceName)> = workspaces
            .iter()
            .flat_map(|ws| {
                ws.versions
                    .iter()
                    .map(|v| (ws.name.clone(), v.id.clone(), instance_name(&ws.name, &v.id)))
            })
            .collect();

        let mut set = JoinSet::new();
        for (idx, (_, _, instance)) in targets.iter().enumerate() {
            let runtime = self.runtime.clone();
            let instance = instance.clone();
            set.spawn(async move { (idx, clean_instance(&runtime, &instance).await) });
        }

        let mut outcomes: Vec<Option<Result<(), EngineError>>> =
            (0..targets.len()).map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                Err(e) => warn!(error = %e, "clean task ended abnormally"),
            }
        }

        let results: Vec<CleanResult> = targets
            .iter()
            .zip(outcomes)
            .map(|((ws, ver, instance), outcome)| {
                let outcome = outcome.unwrap_or_else(|| {
                    Err(EngineError::Conflict(format!("clean of {instance} did not finish")))
                });
                CleanResult::for_instance(ws, ver, instance, outcome)
            })
            .collect();

        let failed = results.iter().filter(|r| !r.is_ok()).count();
        info!(total = results.len(), failed, "clean finished");
        results
    }
}

async fn clean_instance<R: RuntimeAdapter>(
    runtime: &R,
    instance: &InstanceName,
) -> Result<(), EngineError> {
    let name = instance.as_str();
    runtime
        .stop(name)
        .await
        .map_err(|e| EngineError::runtime("stop", name, e))?;
    runtime
        .remove(name)
        .await
        .map_err(|e| EngineError::runtime("remove containers for", name, e))?;
    runtime
        .remove_images(name)
        .await
        .map_err(|e| EngineError::runtime("remove images for", name, e))?;
    debug!(instance = name, "instance cleaned");
    Ok(())
}

#[cfg(test)]
#[path = "cleaner_tests.rs"]
mod tests;
