// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration

use crate::env;
use std::path::{Path, PathBuf};

/// Paths and tunables for one engine instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Per-workspace version content: `<workspaces_dir>/<workspace>/<version>/`
    pub workspaces_dir: PathBuf,
    /// Scratch space for per-request build contexts
    pub build_dir: PathBuf,
    pub base_image: String,
    pub ready_sentinel: String,
    pub build_workers: usize,
    pub build_queue: usize,
}

impl EngineConfig {
    /// Lay out engine paths under `state_dir`, tunables from the environment.
    pub fn from_env(state_dir: &Path) -> Self {
        Self {
            workspaces_dir: state_dir.join("workspaces"),
            build_dir: state_dir.join("build"),
            base_image: env::base_image(),
            ready_sentinel: env::ready_sentinel(),
            build_workers: env::build_workers(),
            build_queue: env::build_queue(),
        }
    }

    /// Defaults under `state_dir`, ignoring the environment.
    pub fn with_defaults(state_dir: &Path) -> Self {
        Self {
            workspaces_dir: state_dir.join("workspaces"),
            build_dir: state_dir.join("build"),
            base_image: env::DEFAULT_BASE_IMAGE.to_string(),
            ready_sentinel: env::DEFAULT_READY_SENTINEL.to_string(),
            build_workers: env::DEFAULT_BUILD_WORKERS,
            build_queue: env::DEFAULT_BUILD_QUEUE,
        }
    }

    pub fn workspace_dir(&self, workspace: &str) -> PathBuf {
        self.workspaces_dir.join(workspace)
    }

    pub fn version_dir(&self, workspace: &str, version: &str) -> PathBuf {
        self.workspace_dir(workspace).join(version)
    }
}
