// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Simulator instance lifecycle: start, stop, status.
//!
//! `start` decides per instance whether to reuse a running container,
//! restart a stopped one, or build and create a fresh one. Readiness is
//! never awaited; a monitor is (re)spawned while the version is not ready.

use crate::build_pool::BuildWorkerPool;
use crate::error::EngineError;
use crate::readiness::{MonitorRegistry, ReadinessMonitor, ReadinessTarget};
use serde::{Deserialize, Serialize};
use sim_adapters::{ContainerSpec, ContainerSummary, RuntimeAdapter, RuntimeError};
use sim_core::{
    image_tag, instance_name, InstanceName, InstanceState, InstanceStatus, VersionKind,
    BUNDLE_LABEL, IMAGE_PREFIX, SIMULATOR_API_PORT,
};
use sim_storage::{MetadataStore, Version, Workspace};
use std::sync::Arc;
use tracing::info;

/// Kubeconfig the simulator writes inside its container.
pub const ADMIN_KUBECONFIG_PATH: &str = "/root/.sim/admin.kubeconfig";

/// Command the simulator container runs.
pub fn simulator_command() -> Vec<String> {
    ["support-bundle-kit", "simulator", "reset", "--bundle-path", "/bundle"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// What `start` had to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartAction {
    AlreadyRunning,
    Restarted,
    Created,
}

/// Result of a successful start
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOutcome {
    pub instance: String,
    pub container_id: String,
    pub action: StartAction,
    /// Whether a new readiness monitor was spawned
    pub monitoring: bool,
}

/// Where the simulator API can be reached from the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "https://{}:{}", self.host, self.port)
    }
}

/// Drives simulator instances against the container runtime.
pub struct InstanceManager<R> {
    runtime: R,
    store: Arc<MetadataStore>,
    pool: Arc<BuildWorkerPool>,
    monitor: ReadinessMonitor<R>,
    monitors: MonitorRegistry,
    base_image: String,
}

impl<R: RuntimeAdapter> InstanceManager<R> {
    pub fn new(
        runtime: R,
        store: Arc<MetadataStore>,
        pool: Arc<BuildWorkerPool>,
        base_image: impl Into<String>,
        sentinel: impl Into<String>,
    ) -> Self {
        let monitor = ReadinessMonitor::new(runtime.clone(), Arc::clone(&store), sentinel);
        Self {
            runtime,
            store,
            pool,
            monitor,
            monitors: MonitorRegistry::new(),
            base_image: base_image.into(),
        }
    }

    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }

    /// Start the simulator for a support-bundle version.
    ///
    /// Returns once the container is running; blocks on the image build
    /// when no container exists yet.
    pub async fn start(&self, workspace: &str, version: &str) -> Result<StartOutcome, EngineError> {
        let (ws, ver) = self.lookup(workspace, version)?;
        if ver.kind == VersionKind::Runtime {
            return Err(EngineError::InvalidRequest(format!(
                "version {} of {} is a runtime cluster, there is no simulator to start",
                ver.id, ws.name
            )));
        }
        let instance = instance_name(&ws.name, &ver.id);

        let containers = self
            .runtime
            .find_containers(instance.as_str(), true)
            .await
            .map_err(|e| EngineError::runtime("inspect", instance.as_str(), e))?;

        let (action, container_id) = if let Some(running) = containers.iter().find(|c| c.is_running()) {
            (StartAction::AlreadyRunning, running.id.clone())
        } else if let Some(stopped) = containers.first() {
            self.runtime
                .start(&stopped.id)
                .await
                .map_err(|e| EngineError::runtime("start", instance.as_str(), e))?;
            (StartAction::Restarted, stopped.id.clone())
        } else {
            let id = self.build_and_create(&instance, &ver).await?;
            (StartAction::Created, id)
        };

        let monitoring = !ver.ready
            && self.monitors.ensure(
                &self.monitor,
                ReadinessTarget {
                    workspace: ws.name.clone(),
                    version: ver.id.clone(),
                    instance: instance.clone(),
                },
            );

        info!(instance = %instance, ?action, monitoring, "simulator started");
        Ok(StartOutcome {
            instance: instance.to_string(),
            container_id,
            action,
            monitoring,
        })
    }

    async fn build_and_create(
        &self,
        instance: &InstanceName,
        version: &Version,
    ) -> Result<String, EngineError> {
        let bundle = version.bundle_path.clone().ok_or_else(|| {
            EngineError::InvalidRequest(format!("version {} has no bundle", version.id))
        })?;

        self.pool
            .submit(instance, &bundle, &self.base_image)
            .await?;

        let spec = ContainerSpec {
            name: instance.to_string(),
            image: image_tag(instance),
            command: simulator_command(),
            exposed_port: SIMULATOR_API_PORT,
            labels: vec![
                (BUNDLE_LABEL.to_string(), bundle.display().to_string()),
                (IMAGE_PREFIX.to_string(), instance.to_string()),
            ],
        };
        self.runtime
            .create_and_start(&spec)
            .await
            .map_err(|e| EngineError::runtime("create", instance.as_str(), e))
    }

    /// Re-attach a readiness monitor to an instance that is already running.
    ///
    /// Used after a daemon restart. Returns whether a monitor was spawned.
    pub async fn resume_monitor(&self, workspace: &str, version: &str) -> Result<bool, EngineError> {
        let (ws, ver) = self.lookup(workspace, version)?;
        if ver.ready || ver.kind == VersionKind::Runtime {
            return Ok(false);
        }
        let instance = instance_name(&ws.name, &ver.id);
        let running = self
            .runtime
            .find_containers(instance.as_str(), false)
            .await
            .map_err(|e| EngineError::runtime("inspect", instance.as_str(), e))?;
        if running.is_empty() {
            return Ok(false);
        }
        Ok(self.monitors.ensure(
            &self.monitor,
            ReadinessTarget {
                workspace: ws.name.clone(),
                version: ver.id.clone(),
                instance,
            },
        ))
    }

    /// Stop the running container. The container, image and ready flag stay.
    pub async fn stop(&self, workspace: &str, version: &str) -> Result<(), EngineError> {
        let (ws, ver) = self.lookup(workspace, version)?;
        let instance = instance_name(&ws.name, &ver.id);
        self.runtime
            .stop(instance.as_str())
            .await
            .map_err(|e| EngineError::runtime("stop", instance.as_str(), e))?;
        info!(instance = %instance, "simulator stopped");
        Ok(())
    }

    /// `running` from the runtime, `ready` from the store.
    pub async fn status(&self, workspace: &str, version: &str) -> Result<InstanceStatus, EngineError> {
        let (ws, ver) = self.lookup(workspace, version)?;
        let instance = instance_name(&ws.name, &ver.id);
        let running = self
            .runtime
            .find_containers(instance.as_str(), false)
            .await
            .map_err(|e| EngineError::runtime("inspect", instance.as_str(), e))?;
        Ok(InstanceStatus {
            running: !running.is_empty(),
            ready: ver.ready,
        })
    }

    /// Lifecycle position derived from runtime objects and the ready flag.
    pub async fn state(&self, workspace: &str, version: &str) -> Result<InstanceState, EngineError> {
        let (ws, ver) = self.lookup(workspace, version)?;
        let instance = instance_name(&ws.name, &ver.id);
        let containers = self
            .runtime
            .find_containers(instance.as_str(), true)
            .await
            .map_err(|e| EngineError::runtime("inspect", instance.as_str(), e))?;
        let images = self
            .runtime
            .find_images(instance.as_str())
            .await
            .map_err(|e| EngineError::runtime("inspect images of", instance.as_str(), e))?;

        let container = if containers.is_empty() {
            None
        } else {
            Some(containers.iter().any(ContainerSummary::is_running))
        };
        Ok(InstanceState::derive(!images.is_empty(), container, ver.ready))
    }

    /// Host address of the simulator API server.
    pub async fn endpoint(&self, workspace: &str, version: &str) -> Result<Endpoint, EngineError> {
        let (ws, ver) = self.lookup(workspace, version)?;
        let instance = instance_name(&ws.name, &ver.id);
        let container = self.only_running(&instance).await?;
        let Some(mapping) = container
            .ports
            .iter()
            .find(|p| p.container_port == SIMULATOR_API_PORT && p.host_port != 0)
        else {
            return Err(EngineError::NotFound(format!(
                "no published API port for {instance}"
            )));
        };
        let host = match mapping.host_ip.as_str() {
            "" | "0.0.0.0" | "::" => "localhost".to_string(),
            ip => ip.to_string(),
        };
        Ok(Endpoint {
            host,
            port: mapping.host_port,
        })
    }

    /// Raw admin kubeconfig written by the simulator.
    pub async fn admin_kubeconfig(&self, workspace: &str, version: &str) -> Result<Vec<u8>, EngineError> {
        let (ws, ver) = self.lookup(workspace, version)?;
        let instance = instance_name(&ws.name, &ver.id);
        self.runtime
            .read_file(instance.as_str(), ADMIN_KUBECONFIG_PATH)
            .await
            .map_err(|e| match e {
                RuntimeError::NotFound(_) => EngineError::NotFound(e.to_string()),
                other => EngineError::runtime("read kubeconfig from", instance.as_str(), other),
            })
    }

    async fn only_running(&self, instance: &InstanceName) -> Result<ContainerSummary, EngineError> {
        let mut running = self
            .runtime
            .find_containers(instance.as_str(), false)
            .await
            .map_err(|e| EngineError::runtime("inspect", instance.as_str(), e))?;
        match running.len() {
            0 => Err(EngineError::NotFound(format!(
                "no running simulator for {instance}"
            ))),
            1 => Ok(running.remove(0)),
            count => Err(EngineError::Conflict(format!(
                "expected one running container for {instance}, found {count}"
            ))),
        }
    }

    fn lookup(&self, workspace: &str, version: &str) -> Result<(Workspace, Version), EngineError> {
        let ws = self.store.get_workspace(workspace)?;
        let ver = ws.version(version).cloned().ok_or_else(|| {
            EngineError::NotFound(format!("version not found: {workspace}/{version}"))
        })?;
        Ok((ws, ver))
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
