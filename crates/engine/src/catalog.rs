// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Workspace and version bookkeeping.
//!
//! The catalog owns the records and the on-disk content of versions. It
//! never talks to the container runtime; cascading cleanup of runtime
//! artifacts is the orchestrator's job.

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::files;
use sim_core::{VersionId, VersionKind, WorkspaceName};
use sim_storage::{MetadataStore, StoreError, Version, Workspace};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

pub struct Catalog {
    store: Arc<MetadataStore>,
    config: EngineConfig,
}

impl Catalog {
    pub fn new(store: Arc<MetadataStore>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Create a workspace. The display name defaults to the name.
    pub fn create_workspace(
        &self,
        raw_name: &str,
        display_name: Option<&str>,
    ) -> Result<Workspace, EngineError> {
        let name = WorkspaceName::parse(raw_name)?;
        let mut workspace = Workspace::new(name);
        if let Some(display) = display_name.map(str::trim).filter(|d| !d.is_empty()) {
            workspace.display_name = display.to_string();
        }
        self.store.create_workspace(workspace.clone())?;
        info!(workspace = %workspace.name, "workspace created");
        Ok(workspace)
    }

    pub fn list_workspaces(&self) -> Vec<Workspace> {
        self.store.list_workspaces()
    }

    pub fn get_workspace(&self, name: &str) -> Result<Workspace, EngineError> {
        Ok(self.store.get_workspace(name)?)
    }

    /// Change the display name. The workspace name itself never changes.
    pub fn rename_workspace(&self, name: &str, display_name: &str) -> Result<Workspace, EngineError> {
        let new_display = display_name.trim();
        if new_display.is_empty() {
            return Err(EngineError::InvalidRequest(
                "display name cannot be empty".to_string(),
            ));
        }
        let workspace = self.store.update_with(name, |ws| {
            ws.display_name = new_display.to_string();
            Ok::<_, EngineError>(ws.clone())
        })?;
        info!(workspace = name, display_name = %new_display, "workspace renamed");
        Ok(workspace)
    }

    /// Remove the record and, best effort, the workspace directory.
    ///
    /// Returns the removed record and any secondary failures.
    pub fn delete_workspace(&self, name: &str) -> Result<(Workspace, Vec<String>), EngineError> {
        let removed = self.store.delete_workspace(name)?;
        let mut warnings = Vec::new();
        let dir = self.config.workspace_dir(name);
        if let Err(e) = files::remove_dir_if_exists(&dir) {
            warn!(workspace = name, error = %e, "failed to remove workspace directory");
            warnings.push(format!("remove {}: {}", dir.display(), e));
        }
        info!(workspace = name, "workspace deleted");
        Ok((removed, warnings))
    }

    /// Reserve the next version ID and create its content directory.
    ///
    /// A reserved ID is consumed even if the version is never registered.
    pub fn allocate_version(&self, workspace: &str) -> Result<(VersionId, PathBuf), EngineError> {
        let id = self.store.update_with(workspace, |ws| {
            Ok::<_, StoreError>(ws.allocate_version_id())
        })?;
        let dir = self.config.version_dir(workspace, id.as_str());
        std::fs::create_dir_all(&dir)?;
        Ok((id, dir))
    }

    /// Record a version whose content is already in place.
    pub fn register_version(&self, workspace: &str, version: Version) -> Result<(), EngineError> {
        self.store.update_with(workspace, |ws| {
            if ws.version(version.id.as_str()).is_some() {
                return Err(EngineError::Conflict(format!(
                    "version already exists: {}/{}",
                    workspace, version.id
                )));
            }
            ws.versions.push(version.clone());
            Ok(())
        })?;
        info!(workspace, version = %version.id, kind = %version.kind, "version registered");
        Ok(())
    }

    /// Copy `source` into a freshly allocated version and register it.
    ///
    /// Support bundles may be a file or a directory; runtime versions take
    /// a kubeconfig file. The content lands at `<version dir>/<file name>`.
    pub fn add_version(
        &self,
        workspace: &str,
        source: &Path,
        kind: VersionKind,
        name: Option<&str>,
    ) -> Result<Version, EngineError> {
        let file_name = source.file_name().ok_or_else(|| {
            EngineError::InvalidRequest(format!("no file name in {}", source.display()))
        })?;
        let meta = std::fs::metadata(source).map_err(|e| {
            EngineError::InvalidRequest(format!("cannot read {}: {}", source.display(), e))
        })?;
        if kind == VersionKind::Runtime && !meta.is_file() {
            return Err(EngineError::InvalidRequest(format!(
                "runtime version needs a kubeconfig file, got {}",
                source.display()
            )));
        }
        // Fail before consuming an ID
        self.store.get_workspace(workspace)?;

        let (id, dir) = self.allocate_version(workspace)?;
        let target = dir.join(file_name);
        if let Err(e) = files::copy_path(source, &target) {
            self.discard_dir(&dir);
            return Err(e.into());
        }

        let mut version = match kind {
            VersionKind::SupportBundle => Version::support_bundle(id, dir.clone(), target),
            VersionKind::Runtime => Version::runtime(id, dir.clone(), target),
        };
        if let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) {
            version = version.with_name(name);
        }
        if let Err(e) = self.register_version(workspace, version.clone()) {
            self.discard_dir(&dir);
            return Err(e);
        }
        Ok(version)
    }

    /// Remove a version record and, best effort, its directory.
    pub fn remove_version(
        &self,
        workspace: &str,
        version: &str,
    ) -> Result<(Version, Vec<String>), EngineError> {
        let removed = self.store.update_with(workspace, |ws| {
            ws.remove_version(version)
                .ok_or_else(|| StoreError::VersionNotFound {
                    workspace: workspace.to_string(),
                    version: version.to_string(),
                })
        })?;
        let mut warnings = Vec::new();
        let dir = if removed.path.as_os_str().is_empty() {
            self.config.version_dir(workspace, version)
        } else {
            removed.path.clone()
        };
        if let Err(e) = files::remove_dir_if_exists(&dir) {
            warn!(workspace, version, error = %e, "failed to remove version directory");
            warnings.push(format!("remove {}: {}", dir.display(), e));
        }
        info!(workspace, version, "version deleted");
        Ok((removed, warnings))
    }

    fn discard_dir(&self, dir: &Path) {
        if let Err(e) = files::remove_dir_if_exists(dir) {
            warn!(dir = %dir.display(), error = %e, "failed to discard version directory");
        }
    }
}

#[cfg(test)]
#[path = "catalog_tests.rs"]
mod tests;
