// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator facade.
//!
//! Wires the catalog, lifecycle manager, cleaner and build pool around one
//! shared runtime adapter and metadata store. Every collaborator-facing
//! operation goes through here, and `shutdown` tears the background work
//! down in a fixed order.

use crate::build_pool::{BuildPoolConfig, BuildWorkerPool};
use crate::catalog::Catalog;
use crate::cleaner::{format_results, CleanResult, Cleaner};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::executor::find_latest_available;
use crate::lifecycle::{Endpoint, InstanceManager, StartOutcome};
use serde::{Deserialize, Serialize};
use sim_adapters::{ContainerSummary, ExecOutput, RuntimeAdapter};
use sim_core::{instance_name, InstanceState, InstanceStatus, VersionId, VersionKind};
use sim_storage::{MetadataStore, Version, Workspace};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a clean request covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scope", rename_all = "snake_case")]
pub enum CleanScope {
    Instance { workspace: String, version: String },
    Workspace { workspace: String },
    All,
}

/// Secondary failures from a delete that still went through
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteReport {
    pub warnings: Vec<String>,
}

pub struct Orchestrator<R> {
    runtime: R,
    store: Arc<MetadataStore>,
    config: EngineConfig,
    catalog: Catalog,
    lifecycle: InstanceManager<R>,
    cleaner: Cleaner<R>,
    pool: Arc<BuildWorkerPool>,
}

impl<R: RuntimeAdapter> Orchestrator<R> {
    /// Build the engine and start its build workers.
    ///
    /// Must be called within a tokio runtime.
    pub fn new(runtime: R, store: Arc<MetadataStore>, config: EngineConfig) -> Self {
        let pool = Arc::new(BuildWorkerPool::start(
            runtime.clone(),
            BuildPoolConfig {
                workers: config.build_workers,
                queue_capacity: config.build_queue,
                build_dir: config.build_dir.clone(),
            },
        ));
        let lifecycle = InstanceManager::new(
            runtime.clone(),
            Arc::clone(&store),
            Arc::clone(&pool),
            config.base_image.clone(),
            config.ready_sentinel.clone(),
        );
        info!(
            workers = pool.worker_count(),
            base_image = %config.base_image,
            "engine started"
        );
        Self {
            catalog: Catalog::new(Arc::clone(&store), config.clone()),
            cleaner: Cleaner::new(runtime.clone(), Arc::clone(&store)),
            runtime,
            store,
            config,
            lifecycle,
            pool,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn lifecycle(&self) -> &InstanceManager<R> {
        &self.lifecycle
    }

    // -- workspaces --

    pub fn create_workspace(
        &self,
        name: &str,
        display_name: Option<&str>,
    ) -> Result<Workspace, EngineError> {
        self.catalog.create_workspace(name, display_name)
    }

    pub fn list_workspaces(&self) -> Vec<Workspace> {
        self.catalog.list_workspaces()
    }

    pub fn get_workspace(&self, name: &str) -> Result<Workspace, EngineError> {
        self.catalog.get_workspace(name)
    }

    pub fn rename_workspace(&self, name: &str, display_name: &str) -> Result<Workspace, EngineError> {
        self.catalog.rename_workspace(name, display_name)
    }

    /// Delete a workspace, its files, and every instance it owns.
    ///
    /// Runtime cleanup is best effort: failures become warnings and the
    /// record is removed anyway.
    pub async fn delete_workspace(&self, name: &str) -> Result<DeleteReport, EngineError> {
        self.catalog.get_workspace(name)?;
        let results = self.cleaner.clean_all(name).await;
        let mut warnings = format_results(&results);
        let (_, more) = self.catalog.delete_workspace(name)?;
        warnings.extend(more);
        Ok(DeleteReport { warnings })
    }

    // -- versions --

    /// Reserve a version ID and directory for an incoming upload.
    pub fn allocate_version(&self, workspace: &str) -> Result<(VersionId, PathBuf), EngineError> {
        self.catalog.allocate_version(workspace)
    }

    /// Record an upload whose content is already in its version directory.
    pub fn register_version(&self, workspace: &str, version: Version) -> Result<(), EngineError> {
        self.catalog.register_version(workspace, version)
    }

    pub fn add_version(
        &self,
        workspace: &str,
        source: &Path,
        kind: VersionKind,
        name: Option<&str>,
    ) -> Result<Version, EngineError> {
        self.catalog.add_version(workspace, source, kind, name)
    }

    /// Delete a version, its files, and its container and image.
    pub async fn delete_version(
        &self,
        workspace: &str,
        version: &str,
    ) -> Result<DeleteReport, EngineError> {
        let ws = self.catalog.get_workspace(workspace)?;
        let Some(ver) = ws.version(version) else {
            return Err(EngineError::NotFound(format!(
                "version not found: {workspace}/{version}"
            )));
        };
        let instance = instance_name(&ws.name, &ver.id);

        let mut warnings = Vec::new();
        if let Err(e) = self.cleaner.clean_instance(&instance).await {
            warn!(instance = %instance, error = %e, "cleanup during version delete failed");
            warnings.push(format!("{instance}: {e}"));
        }
        let (_, more) = self.catalog.remove_version(workspace, version)?;
        warnings.extend(more);
        Ok(DeleteReport { warnings })
    }

    // -- lifecycle --

    pub async fn start(&self, workspace: &str, version: &str) -> Result<StartOutcome, EngineError> {
        self.lifecycle.start(workspace, version).await
    }

    pub async fn stop(&self, workspace: &str, version: &str) -> Result<(), EngineError> {
        self.lifecycle.stop(workspace, version).await
    }

    pub async fn status(&self, workspace: &str, version: &str) -> Result<InstanceStatus, EngineError> {
        self.lifecycle.status(workspace, version).await
    }

    pub async fn state(&self, workspace: &str, version: &str) -> Result<InstanceState, EngineError> {
        self.lifecycle.state(workspace, version).await
    }

    pub async fn endpoint(&self, workspace: &str, version: &str) -> Result<Endpoint, EngineError> {
        self.lifecycle.endpoint(workspace, version).await
    }

    pub async fn admin_kubeconfig(
        &self,
        workspace: &str,
        version: &str,
    ) -> Result<Vec<u8>, EngineError> {
        self.lifecycle.admin_kubeconfig(workspace, version).await
    }

    /// Resume readiness monitors for running, not-yet-ready simulators.
    ///
    /// Returns how many monitors were spawned.
    pub async fn resume_monitors(&self) -> usize {
        let mut resumed = 0;
        for ws in self.store.list_workspaces() {
            for ver in &ws.versions {
                match self
                    .lifecycle
                    .resume_monitor(ws.name.as_str(), ver.id.as_str())
                    .await
                {
                    Ok(true) => resumed += 1,
                    Ok(false) => {}
                    Err(e) => warn!(
                        workspace = %ws.name,
                        version = %ver.id,
                        error = %e,
                        "cannot resume readiness monitor"
                    ),
                }
            }
        }
        if resumed > 0 {
            info!(resumed, "readiness monitors resumed");
        }
        resumed
    }

    // -- cleanup --

    /// Clean runtime artifacts in `scope` and reset `ready` for each
    /// instance that was cleaned.
    ///
    /// Any failed item turns the whole call into
    /// [`EngineError::PartialCleanup`]; successful items stay cleaned.
    pub async fn clean(&self, scope: &CleanScope) -> Result<Vec<CleanResult>, EngineError> {
        let results = match scope {
            CleanScope::Instance { workspace, version } => {
                let ws = self.catalog.get_workspace(workspace)?;
                let Some(ver) = ws.version(version) else {
                    return Err(EngineError::NotFound(format!(
                        "version not found: {workspace}/{version}"
                    )));
                };
                let instance = instance_name(&ws.name, &ver.id);
                let outcome = self.cleaner.clean_instance(&instance).await;
                vec![CleanResult {
                    id: instance.to_string(),
                    workspace: Some(ws.name.to_string()),
                    version: Some(ver.id.to_string()),
                    error: outcome.err().map(|e| e.to_string()),
                }]
            }
            CleanScope::Workspace { workspace } => {
                self.catalog.get_workspace(workspace)?;
                self.cleaner.clean_all(workspace).await
            }
            CleanScope::All => self.cleaner.clean_all_workspaces().await,
        };

        for result in results.iter().filter(|r| r.is_ok()) {
            if let (Some(ws), Some(ver)) = (&result.workspace, &result.version) {
                self.reset_ready(ws, ver);
            }
        }

        if results.iter().any(|r| !r.is_ok()) {
            return Err(EngineError::PartialCleanup(results));
        }
        Ok(results)
    }

    fn reset_ready(&self, workspace: &str, version: &str) {
        match self.store.set_version_ready(workspace, version, false) {
            Ok(changed) => debug!(workspace, version, changed, "ready flag reset"),
            Err(e) if e.is_not_found() => debug!(workspace, version, "version gone, nothing to reset"),
            Err(e) => warn!(workspace, version, error = %e, "failed to reset ready flag"),
        }
    }

    // -- queries --

    /// Every container carrying the managed label.
    pub async fn list_instances(&self) -> Result<Vec<ContainerSummary>, EngineError> {
        self.runtime
            .list_managed()
            .await
            .map_err(|e| EngineError::runtime("list", "managed containers", e))
    }

    /// Run kubectl against the newest usable cluster of a workspace.
    pub async fn kubectl(&self, workspace: &str, args: &[String]) -> Result<ExecOutput, EngineError> {
        let ws = self.catalog.get_workspace(workspace)?;
        let executor = find_latest_available(&self.runtime, &ws).await?;
        debug!(workspace, target = %executor.describe(), "running kubectl");
        executor.kubectl(args).await
    }

    /// Stop accepting builds, let admitted builds finish, cancel monitors.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
        self.lifecycle.monitors().shutdown().await;
        info!("engine stopped");
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
