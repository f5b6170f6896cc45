// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted workspace and version records.
//!
//! Field names are camelCase so the document stays readable by tools that
//! consume the `data.json` layout directly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sim_core::{VersionId, VersionKind, WorkspaceName};
use std::path::{Path, PathBuf};

/// A named group of versions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub name: WorkspaceName,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub versions: Vec<Version>,
    /// Next version sequence number. Only ever increases, so IDs of deleted
    /// versions are never handed out again.
    #[serde(default)]
    pub next_version: u64,
}

impl Workspace {
    pub fn new(name: WorkspaceName) -> Self {
        Self {
            display_name: name.to_string(),
            name,
            created_at: Utc::now(),
            versions: Vec::new(),
            next_version: 1,
        }
    }

    pub fn version(&self, id: &str) -> Option<&Version> {
        self.versions.iter().find(|v| v.id == id)
    }

    pub fn version_mut(&mut self, id: &str) -> Option<&mut Version> {
        self.versions.iter_mut().find(|v| v.id == id)
    }

    /// Reserve the next version ID.
    pub fn allocate_version_id(&mut self) -> VersionId {
        self.normalize_counter();
        let id = VersionId::from_seq(self.next_version);
        self.next_version += 1;
        id
    }

    /// Remove a version record, returning it if present.
    pub fn remove_version(&mut self, id: &str) -> Option<Version> {
        let idx = self.versions.iter().position(|v| v.id == id)?;
        Some(self.versions.remove(idx))
    }

    /// Raise the counter above every existing version suffix.
    ///
    /// Records written without a counter start at zero; this keeps
    /// allocation monotonic for them too.
    pub(crate) fn normalize_counter(&mut self) {
        let floor = self
            .versions
            .iter()
            .filter_map(|v| v.id.seq())
            .max()
            .map_or(1, |max| max + 1);
        self.next_version = self.next_version.max(floor);
    }
}

/// One uploaded bundle or kubeconfig within a workspace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: VersionId,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: VersionKind,
    pub created_at: DateTime<Utc>,
    /// Directory holding the version's extracted content.
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub bundle_path: Option<PathBuf>,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub kubeconfig_path: Option<PathBuf>,
    #[serde(default)]
    pub support_bundle_name: String,
    pub ready: bool,
}

impl Version {
    /// A support-bundle version; not ready until its simulator reports in.
    pub fn support_bundle(id: VersionId, path: PathBuf, bundle_path: PathBuf) -> Self {
        let support_bundle_name = bundle_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name: id.to_string(),
            id,
            kind: VersionKind::SupportBundle,
            created_at: Utc::now(),
            path,
            bundle_path: Some(bundle_path),
            kubeconfig_path: None,
            support_bundle_name,
            ready: VersionKind::SupportBundle.initially_ready(),
        }
    }

    /// A live-cluster version backed by a kubeconfig; ready immediately.
    pub fn runtime(id: VersionId, path: PathBuf, kubeconfig_path: PathBuf) -> Self {
        Self {
            name: id.to_string(),
            id,
            kind: VersionKind::Runtime,
            created_at: Utc::now(),
            path,
            bundle_path: None,
            kubeconfig_path: Some(kubeconfig_path),
            support_bundle_name: String::new(),
            ready: VersionKind::Runtime.initially_ready(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The source path that matters for this version's kind.
    pub fn source_path(&self) -> Option<&Path> {
        match self.kind {
            VersionKind::SupportBundle => self.bundle_path.as_deref(),
            VersionKind::Runtime => self.kubeconfig_path.as_deref(),
        }
    }
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()).map(PathBuf::from))
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
