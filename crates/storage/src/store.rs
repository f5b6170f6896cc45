// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-file metadata store.
//!
//! All workspaces live in one in-memory map mirrored to a single JSON
//! document. Every mutation rewrites the whole document atomically
//! (write `.tmp`, fsync, rename) while holding the write lock, so the
//! file never lags behind or races ahead of memory.

use parking_lot::RwLock;
use sim_core::WorkspaceName;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::state::Workspace;

/// Errors from metadata store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("workspace not found: {0}")]
    WorkspaceNotFound(String),

    #[error("version not found: {workspace}/{version}")]
    VersionNotFound { workspace: String, version: String },

    #[error("workspace already exists: {0}")]
    Conflict(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt metadata file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::WorkspaceNotFound(_) | StoreError::VersionNotFound { .. }
        )
    }
}

type WorkspaceMap = BTreeMap<WorkspaceName, Workspace>;

/// Persistent map of workspace name to workspace record.
pub struct MetadataStore {
    path: PathBuf,
    data: RwLock<WorkspaceMap>,
}

impl MetadataStore {
    /// Open the store at `path`, loading existing records if the file exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut data: WorkspaceMap = if path.exists() {
            let bytes = fs::read(&path)?;
            serde_json::from_slice(&bytes).map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?
        } else {
            BTreeMap::new()
        };
        for ws in data.values_mut() {
            ws.normalize_counter();
        }

        info!(path = %path.display(), workspaces = data.len(), "metadata store opened");
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert a new workspace. Fails with `Conflict` if the name is taken.
    pub fn create_workspace(&self, workspace: Workspace) -> Result<(), StoreError> {
        let mut data = self.data.write();
        if data.contains_key(workspace.name.as_str()) {
            return Err(StoreError::Conflict(workspace.name.to_string()));
        }
        let name = workspace.name.clone();
        data.insert(name.clone(), workspace);
        if let Err(e) = self.persist(&data) {
            data.remove(name.as_str());
            return Err(e);
        }
        debug!(workspace = %name, "workspace created");
        Ok(())
    }

    /// All workspaces, ordered by name.
    pub fn list_workspaces(&self) -> Vec<Workspace> {
        self.data.read().values().cloned().collect()
    }

    pub fn get_workspace(&self, name: &str) -> Result<Workspace, StoreError> {
        self.data
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::WorkspaceNotFound(name.to_string()))
    }

    /// Replace a workspace record wholesale. Fails if it does not exist.
    pub fn update_workspace(&self, workspace: Workspace) -> Result<(), StoreError> {
        let mut data = self.data.write();
        let Some(slot) = data.get_mut(workspace.name.as_str()) else {
            return Err(StoreError::WorkspaceNotFound(workspace.name.to_string()));
        };
        let previous = std::mem::replace(slot, workspace);
        if let Err(e) = self.persist(&data) {
            data.insert(previous.name.clone(), previous);
            return Err(e);
        }
        Ok(())
    }

    /// Remove a workspace, returning the removed record.
    pub fn delete_workspace(&self, name: &str) -> Result<Workspace, StoreError> {
        let mut data = self.data.write();
        let removed = data
            .remove(name)
            .ok_or_else(|| StoreError::WorkspaceNotFound(name.to_string()))?;
        if let Err(e) = self.persist(&data) {
            data.insert(removed.name.clone(), removed);
            return Err(e);
        }
        debug!(workspace = name, "workspace deleted");
        Ok(removed)
    }

    /// Read-modify-write one workspace under the write lock.
    ///
    /// The closure works on a copy; nothing is stored if it returns an
    /// error or if persisting fails.
    pub fn update_with<T, E, F>(&self, name: &str, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Workspace) -> Result<T, E>,
        E: From<StoreError>,
    {
        let mut data = self.data.write();
        let current = data
            .get(name)
            .ok_or_else(|| StoreError::WorkspaceNotFound(name.to_string()))?;
        let mut updated = current.clone();
        let value = f(&mut updated)?;

        let previous = data.insert(updated.name.clone(), updated);
        if let Err(e) = self.persist(&data) {
            if let Some(previous) = previous {
                data.insert(previous.name.clone(), previous);
            }
            return Err(e.into());
        }
        Ok(value)
    }

    /// Set a version's `ready` flag. Returns whether the flag changed.
    pub fn set_version_ready(
        &self,
        workspace: &str,
        version: &str,
        ready: bool,
    ) -> Result<bool, StoreError> {
        {
            let data = self.data.read();
            let ws = data
                .get(workspace)
                .ok_or_else(|| StoreError::WorkspaceNotFound(workspace.to_string()))?;
            match ws.version(version) {
                Some(v) if v.ready == ready => return Ok(false),
                Some(_) => {}
                None => {
                    return Err(StoreError::VersionNotFound {
                        workspace: workspace.to_string(),
                        version: version.to_string(),
                    })
                }
            }
        }

        self.update_with(workspace, |ws| {
            let v = ws
                .version_mut(version)
                .ok_or_else(|| StoreError::VersionNotFound {
                    workspace: workspace.to_string(),
                    version: version.to_string(),
                })?;
            let changed = v.ready != ready;
            v.ready = ready;
            Ok::<_, StoreError>(changed)
        })
    }

    /// Write the full map atomically. Caller holds the write lock.
    fn persist(&self, data: &WorkspaceMap) -> Result<(), StoreError> {
        let tmp_path = self.path.with_extension("tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, data)?;
            let file = writer.into_inner().map_err(|e| e.into_error())?;
            file.sync_all()?;
        }
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
