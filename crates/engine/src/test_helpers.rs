// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::build_pool::{BuildPoolConfig, BuildWorkerPool};
use crate::config::EngineConfig;
use crate::lifecycle::InstanceManager;
use crate::orchestrator::Orchestrator;
use sim_adapters::FakeRuntimeAdapter;
use sim_core::{VersionId, WorkspaceName};
use sim_storage::{MetadataStore, StoreError, Version, Workspace};
use std::sync::Arc;
use std::time::Duration;
use tempfile::{tempdir, TempDir};

pub(crate) const SENTINEL: &str = "All resources loaded successfully";

/// Temp state dir, store, and fake runtime shared by engine tests.
pub(crate) struct TestContext {
    pub dir: TempDir,
    pub fake: FakeRuntimeAdapter,
    pub store: Arc<MetadataStore>,
    pub config: EngineConfig,
}

impl TestContext {
    pub fn new() -> Self {
        let dir = tempdir().unwrap();
        let store = Arc::new(MetadataStore::open(dir.path().join("data.json")).unwrap());
        let mut config = EngineConfig::with_defaults(dir.path());
        config.ready_sentinel = SENTINEL.to_string();
        Self {
            dir,
            fake: FakeRuntimeAdapter::new(),
            store,
            config,
        }
    }

    fn ensure_workspace(&self, ws: &str) {
        if self.store.get_workspace(ws).is_err() {
            self.store
                .create_workspace(Workspace::new(WorkspaceName::new(ws)))
                .unwrap();
        }
    }

    fn push_version(&self, ws: &str, version: Version) {
        self.ensure_workspace(ws);
        self.store
            .update_with(ws, |w| {
                if let Some(seq) = version.id.seq() {
                    w.next_version = w.next_version.max(seq + 1);
                }
                w.versions.push(version);
                Ok::<_, StoreError>(())
            })
            .unwrap();
    }

    /// Register a support-bundle version with a bundle file on disk.
    pub fn add_bundle_version(&self, ws: &str, ver: &str) -> Version {
        let dir = self.config.version_dir(ws, ver);
        std::fs::create_dir_all(&dir).unwrap();
        let bundle = dir.join("bundle.zip");
        std::fs::write(&bundle, b"bundle").unwrap();
        let version = Version::support_bundle(VersionId::new(ver), dir, bundle);
        self.push_version(ws, version.clone());
        version
    }

    /// Register a runtime version with a kubeconfig on disk.
    pub fn add_runtime_version(&self, ws: &str, ver: &str) -> Version {
        let dir = self.config.version_dir(ws, ver);
        std::fs::create_dir_all(&dir).unwrap();
        let kubeconfig = dir.join("kubeconfig");
        std::fs::write(&kubeconfig, b"apiVersion: v1\n").unwrap();
        let version = Version::runtime(VersionId::new(ver), dir, kubeconfig);
        self.push_version(ws, version.clone());
        version
    }

    pub fn pool(&self) -> Arc<BuildWorkerPool> {
        Arc::new(BuildWorkerPool::start(
            self.fake.clone(),
            BuildPoolConfig {
                workers: self.config.build_workers,
                queue_capacity: self.config.build_queue,
                build_dir: self.config.build_dir.clone(),
            },
        ))
    }

    pub fn manager(&self) -> InstanceManager<FakeRuntimeAdapter> {
        InstanceManager::new(
            self.fake.clone(),
            Arc::clone(&self.store),
            self.pool(),
            self.config.base_image.clone(),
            self.config.ready_sentinel.clone(),
        )
    }

    pub fn orchestrator(&self) -> Orchestrator<FakeRuntimeAdapter> {
        Orchestrator::new(self.fake.clone(), Arc::clone(&self.store), self.config.clone())
    }

    pub fn ready(&self, ws: &str, ver: &str) -> bool {
        self.store
            .get_workspace(ws)
            .unwrap()
            .version(ver)
            .unwrap()
            .ready
    }

    pub fn set_ready(&self, ws: &str, ver: &str, ready: bool) {
        self.store.set_version_ready(ws, ver, ready).unwrap();
    }
}

/// Poll `cond` until it holds, failing the test after two seconds.
pub(crate) async fn wait_until(what: &str, cond: impl Fn() -> bool) {
    for _ in 0..400 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
